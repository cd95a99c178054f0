//! Common test utilities for signet-api-oauth integration tests.

use async_trait::async_trait;
use signet_api_oauth::{OAuthCollaborators, OAuthState};
use signet_auth::{
    AntiForgery, ConsentViewModel, ErrorViewModel, LoggedOutViewModel, LoginViewModel,
    LogoutViewModel, SessionCookie, ViewService,
};
use signet_core::{
    AuthEvent, AuthorizationCode, AuthorizationCodeStore, Client, ClientStore, Consent,
    ConsentStore, EventSink, EventsOptions, Flow, PassthroughLocalization, ServerOptions,
    StoreError, TokenFactory, TokenRequest,
};
use std::collections::BTreeMap;
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

/// In-memory consent store.
#[derive(Default)]
pub struct InMemoryConsents(Mutex<BTreeMap<(String, String), Consent>>);

#[async_trait]
impl ConsentStore for InMemoryConsents {
    async fn load(&self, subject: &str, client_id: &str) -> Result<Option<Consent>, StoreError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .get(&(subject.to_string(), client_id.to_string()))
            .cloned())
    }

    async fn save(&self, consent: Consent) -> Result<(), StoreError> {
        self.0.lock().unwrap().insert(
            (consent.subject.clone(), consent.client_id.clone()),
            consent,
        );
        Ok(())
    }

    async fn revoke(&self, subject: &str, client_id: &str) -> Result<(), StoreError> {
        self.0
            .lock()
            .unwrap()
            .remove(&(subject.to_string(), client_id.to_string()));
        Ok(())
    }
}

/// In-memory single-use code store.
#[derive(Default)]
pub struct InMemoryCodes(Mutex<BTreeMap<String, AuthorizationCode>>);

#[async_trait]
impl AuthorizationCodeStore for InMemoryCodes {
    async fn store(&self, code: &str, record: AuthorizationCode) -> Result<(), StoreError> {
        self.0.lock().unwrap().insert(code.to_string(), record);
        Ok(())
    }

    async fn consume(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        Ok(self.0.lock().unwrap().remove(code))
    }
}

/// Deterministic token factory.
pub struct StaticTokens;

#[async_trait]
impl TokenFactory for StaticTokens {
    async fn create_access_token(
        &self,
        request: &TokenRequest,
    ) -> Result<(String, i64), StoreError> {
        Ok((format!("access-{}", request.subject), 3600))
    }

    async fn create_identity_token(&self, request: &TokenRequest) -> Result<String, StoreError> {
        Ok(format!("identity-{}", request.subject))
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

/// A code-flow client with no consent requirement.
pub fn code_client() -> Client {
    Client {
        client_id: "c1".into(),
        client_name: "Test App".into(),
        enabled: true,
        flow: Flow::AuthorizationCode,
        allowed_scopes: vec!["openid".into(), "profile".into()],
        redirect_uris: vec!["https://app/cb".into()],
        post_logout_redirect_uris: vec!["https://app/bye".into()],
        logout_uri: Some("https://app/signout-frame".into()),
        require_consent: false,
        allow_remember_consent: true,
        identity_provider_restrictions: vec![],
        enable_local_login: true,
    }
}

/// A code-flow client that requires consent.
pub fn consent_client() -> Client {
    Client {
        client_id: "c2".into(),
        client_name: "Consent App".into(),
        require_consent: true,
        ..code_client()
    }
}

/// Server options for tests: fixed origin, all events raised.
pub fn test_options() -> ServerOptions {
    let mut options = ServerOptions::default();
    options.site_name = "Signet Test".into();
    options.public_origin = "https://id.test".into();
    options.events = EventsOptions {
        raise_success_events: true,
        raise_failure_events: true,
    };
    options
}

/// Assembled endpoint state plus handles on the in-memory stores.
pub struct TestHarness {
    pub state: OAuthState,
    pub codes: Arc<InMemoryCodes>,
    pub consents: Arc<InMemoryConsents>,
    pub events: Arc<CaptureEvents>,
    pub anti_forgery: AntiForgery,
    pub session: SessionCookie,
}

impl TestHarness {
    /// Build the harness with the given clients and options.
    pub fn new(clients: Vec<Client>, options: ServerOptions) -> Self {
        init_test_logging();
        let codes = Arc::new(InMemoryCodes::default());
        let consents = Arc::new(InMemoryConsents::default());
        let events = Arc::new(CaptureEvents::default());
        let state = OAuthState::new(
            Arc::new(options),
            OAuthCollaborators {
                clients: Arc::new(InMemoryClients(clients)),
                consents: consents.clone(),
                codes: codes.clone(),
                tokens: Arc::new(StaticTokens),
                views: Arc::new(StubViews),
                localization: Arc::new(PassthroughLocalization),
                events: events.clone(),
            },
            &MASTER_KEY,
            *ANTI_FORGERY_SECRET,
        );
        Self {
            state,
            codes,
            consents,
            events,
            anti_forgery: AntiForgery::new(*ANTI_FORGERY_SECRET),
            session: SessionCookie::new(true),
        }
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
