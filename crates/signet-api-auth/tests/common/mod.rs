//! Common test utilities for signet-api-auth integration tests.

use async_trait::async_trait;
use signet_api_auth::{AuthCollaborators, AuthState, ExternalProvider};
use signet_auth::{
    AntiForgery, AuthenticateResult, ClaimsIdentity, ConsentViewModel, ErrorViewModel,
    ExternalIdentity, LoggedOutViewModel, LoginViewModel, LogoutViewModel, MessageCookies,
    MessageProtector, SessionCookie, SignInMessage, UserService, ViewService,
};
use signet_core::{
    AuthEvent, Client, ClientStore, EventSink, EventsOptions, Flow, PassthroughLocalization,
    ServerOptions, StoreError,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initialize logging for tests (once), honoring `RUST_LOG`.
#[allow(dead_code)]
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Cookie protection master key. TEST ONLY.
pub const MASTER_KEY: [u8; 32] = [42u8; 32];

/// Anti-forgery secret, independent of the master key. TEST ONLY.
pub const ANTI_FORGERY_SECRET: &[u8; 32] = b"test-anti-forgery-secret-32-byte";

/// Password the scripted user service accepts.
pub const GOOD_PASSWORD: &str = "correct horse";

/// In-memory client registry.
pub struct InMemoryClients(pub Vec<Client>);

#[async_trait]
impl ClientStore for InMemoryClients {
    async fn find_enabled(&self, client_id: &str) -> Result<Option<Client>, StoreError> {
        Ok(self
            .0
            .iter()
            .find(|c| c.client_id == client_id && c.enabled)
            .cloned())
    }
}

/// Scripted user service: local logins succeed with [`GOOD_PASSWORD`],
/// external logins pop pre-seeded results, pre-authentication returns a
/// fixed result when seeded.
#[derive(Default)]
pub struct ScriptedUsers {
    /// Result returned for a successful local credential check.
    pub local_result: Mutex<Option<AuthenticateResult>>,
    /// Results popped per external authentication call.
    pub external_results: Mutex<VecDeque<AuthenticateResult>>,
    /// Number of external authentication calls observed.
    pub external_calls: AtomicUsize,
    /// Result returned from the pre-authentication hook.
    pub pre_result: Mutex<Option<AuthenticateResult>>,
    /// Subjects passed to sign-out.
    pub signed_out: Mutex<Vec<String>>,
}

#[async_trait]
impl UserService for ScriptedUsers {
    async fn pre_authenticate(
        &self,
        _message: &SignInMessage,
    ) -> Result<Option<AuthenticateResult>, StoreError> {
        Ok(self.pre_result.lock().unwrap().clone())
    }

    async fn authenticate_local(
        &self,
        _username: &str,
        password: &str,
        _message: &SignInMessage,
    ) -> Result<Option<AuthenticateResult>, StoreError> {
        if password != GOOD_PASSWORD {
            return Ok(None);
        }
        Ok(self.local_result.lock().unwrap().clone())
    }

    async fn authenticate_external(
        &self,
        _external: &ExternalIdentity,
        _message: &SignInMessage,
    ) -> Result<Option<AuthenticateResult>, StoreError> {
        self.external_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.external_results.lock().unwrap().pop_front())
    }

    async fn sign_out(&self, subject: &ClaimsIdentity) -> Result<(), StoreError> {
        self.signed_out
            .lock()
            .unwrap()
            .push(subject.subject().unwrap_or_default().to_string());
        Ok(())
    }
}

/// View service that renders models as labeled JSON for assertions.
pub struct StubViews;

#[async_trait]
impl ViewService for StubViews {
    async fn login(&self, model: &LoginViewModel) -> Result<String, StoreError> {
        Ok(format!("login:{}", serde_json::to_string(model).unwrap()))
    }

    async fn consent(&self, model: &ConsentViewModel) -> Result<String, StoreError> {
        Ok(format!("consent:{}", serde_json::to_string(model).unwrap()))
    }

    async fn error(&self, model: &ErrorViewModel) -> Result<String, StoreError> {
        Ok(format!("error:{}", serde_json::to_string(model).unwrap()))
    }

    async fn logout(&self, model: &LogoutViewModel) -> Result<String, StoreError> {
        Ok(format!("logout:{}", serde_json::to_string(model).unwrap()))
    }

    async fn logged_out(&self, model: &LoggedOutViewModel) -> Result<String, StoreError> {
        Ok(format!(
            "logged_out:{}",
            serde_json::to_string(model).unwrap()
        ))
    }
}

/// Event sink capturing everything raised.
#[derive(Default)]
pub struct CaptureEvents(pub Mutex<Vec<AuthEvent>>);

impl EventSink for CaptureEvents {
    fn raise(&self, event: &AuthEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

impl CaptureEvents {
    /// Serialized tags of the captured events, in order.
    pub fn tags(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|e| {
                serde_json::to_value(e).unwrap()["type"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }
}

/// The registered client behind the test flows.
pub fn test_client() -> Client {
    Client {
        client_id: "c1".into(),
        client_name: "Test App".into(),
        enabled: true,
        flow: Flow::AuthorizationCode,
        allowed_scopes: vec!["openid".into(), "profile".into()],
        redirect_uris: vec!["https://app/cb".into()],
        post_logout_redirect_uris: vec!["https://app/bye".into()],
        logout_uri: None,
        require_consent: false,
        allow_remember_consent: true,
        identity_provider_restrictions: vec![],
        enable_local_login: true,
    }
}

/// Server options for tests: fixed origin, all events raised, two
/// front-channel logout frames.
pub fn test_options() -> ServerOptions {
    let mut options = ServerOptions::default();
    options.site_name = "Signet Test".into();
    options.public_origin = "https://id.test".into();
    options.events = EventsOptions {
        raise_success_events: true,
        raise_failure_events: true,
    };
    options.protocol_logout_urls = vec![
        "https://app/signout-frame".into(),
        "https://other/signout-frame".into(),
    ];
    options
}

/// Configured external providers.
pub fn test_providers() -> Vec<ExternalProvider> {
    vec![ExternalProvider {
        name: "google".into(),
        display_name: "Google".into(),
        authorize_endpoint: "https://accounts.google.test/authorize".into(),
    }]
}

/// Assembled endpoint state plus handles on the scripted collaborators.
pub struct TestHarness {
    pub state: AuthState,
    pub users: Arc<ScriptedUsers>,
    pub events: Arc<CaptureEvents>,
    pub messages: MessageCookies,
    pub anti_forgery: AntiForgery,
    pub session: SessionCookie,
}

impl TestHarness {
    /// Build the harness with the given options.
    pub fn new(options: ServerOptions) -> Self {
        init_test_logging();
        let users = Arc::new(ScriptedUsers::default());
        let events = Arc::new(CaptureEvents::default());
        let max_age = options.authentication.sign_in_message_max_age_secs;
        let state = AuthState::new(
            Arc::new(options),
            AuthCollaborators {
                users: users.clone(),
                clients: Arc::new(InMemoryClients(vec![test_client()])),
                views: Arc::new(StubViews),
                localization: Arc::new(PassthroughLocalization),
                events: events.clone(),
            },
            test_providers(),
            &MASTER_KEY,
            *ANTI_FORGERY_SECRET,
        );
        Self {
            state,
            users,
            events,
            messages: MessageCookies::new(
                Arc::new(MessageProtector::new(&MASTER_KEY)),
                max_age,
                true,
            ),
            anti_forgery: AntiForgery::new(*ANTI_FORGERY_SECRET),
            session: SessionCookie::new(true),
        }
    }

    /// A sign-in message for the test client pointing back at authorize.
    pub fn signin_message(&self) -> SignInMessage {
        let mut message =
            SignInMessage::new("https://id.test/connect/authorize?client_id=c1&scope=openid");
        message.client_id = Some("c1".into());
        message
    }

    /// Seed a sign-in message cookie into `jar` under `id`.
    pub fn seed_signin(&self, jar: &mut BTreeMap<String, String>, id: &str, message: &SignInMessage) {
        let header = self.messages.write_signin(id, message).unwrap();
        apply_cookies(jar, &[header]);
    }

    /// Seed a session cookie and return a matching anti-forgery token
    /// pair for form fields.
    pub fn seed_session(&self, jar: &mut BTreeMap<String, String>) -> (String, String) {
        let (session_id, header) = self.session.issue();
        apply_cookies(jar, &[header]);
        let token = self.anti_forgery.generate(&session_id);
        (token.token, token.signature)
    }
}

/// Apply `Set-Cookie` values to a request cookie jar the way a browser
/// would.
pub fn apply_cookies(jar: &mut BTreeMap<String, String>, set_cookies: &[String]) {
    for header in set_cookies {
        let pair = header.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            if header.contains("Max-Age=0") {
                jar.remove(name);
            } else {
                jar.insert(name.to_string(), value.to_string());
            }
        }
    }
}

/// A full sign-in identity for the scripted user service.
pub fn full_identity() -> ClaimsIdentity {
    use signet_auth::{claim_types, schemes, Claim};
    ClaimsIdentity::with_claims(
        schemes::PRIMARY,
        vec![
            Claim::new(claim_types::SUBJECT, "user-1"),
            Claim::new(claim_types::NAME, "Alice"),
        ],
    )
}
