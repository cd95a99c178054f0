//! Collaborator contracts.
//!
//! Every external system the authorization core depends on is expressed
//! as a trait with `Send + Sync` bounds. Hosts inject implementations;
//! tests use the in-memory versions from the test harnesses.

use crate::client::Client;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolves registered clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Find an enabled client by id. Disabled clients are reported as
    /// absent.
    async fn find_enabled(&self, client_id: &str) -> Result<Option<Client>, StoreError>;

    /// Whether `provider` may be used to sign in for `client_id`.
    /// Unknown clients allow nothing.
    async fn is_valid_identity_provider(
        &self,
        client_id: &str,
        provider: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .find_enabled(client_id)
            .await?
            .is_some_and(|c| c.allows_identity_provider(provider)))
    }

    /// The IdP restriction list for `client_id`; empty means unrestricted.
    async fn identity_provider_restrictions(
        &self,
        client_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .find_enabled(client_id)
            .await?
            .map(|c| c.identity_provider_restrictions)
            .unwrap_or_default())
    }
}

/// A single-use authorization code record.
///
/// Stored under the opaque code value; the token endpoint consumes it
/// atomically (delete-on-read).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect URI the code is bound to.
    pub redirect_uri: String,
    /// Subject identifier of the authenticated user.
    pub subject: String,
    /// Nonce echoed into the identity token, when requested.
    pub nonce: Option<String>,
    /// Scopes granted by the user.
    pub scopes: Vec<String>,
    /// Authentication time of the session that produced the code.
    pub auth_time: Option<i64>,
    /// PKCE code challenge, when supplied.
    pub code_challenge: Option<String>,
    /// PKCE code challenge method, when supplied.
    pub code_challenge_method: Option<String>,
    /// Whether `openid` was among the granted scopes.
    pub is_open_id: bool,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

/// Stores authorization codes for the token endpoint to consume.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Persist a code record under its opaque value.
    async fn store(&self, code: &str, record: AuthorizationCode) -> Result<(), StoreError>;

    /// Atomically remove and return the record for `code`. A second call
    /// with the same code returns `None`.
    async fn consume(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError>;
}

/// A remembered consent decision for a (subject, client) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consent {
    /// Subject identifier.
    pub subject: String,
    /// Client identifier.
    pub client_id: String,
    /// Scopes the user previously granted.
    pub scopes: Vec<String>,
    /// When the decision was recorded.
    pub updated_at: DateTime<Utc>,
}

impl Consent {
    /// Whether this remembered decision covers every requested scope.
    pub fn covers<'a>(&self, requested: impl IntoIterator<Item = &'a str>) -> bool {
        requested
            .into_iter()
            .all(|s| self.scopes.iter().any(|g| g == s))
    }
}

/// Stores remembered consent decisions.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Load the remembered decision for (subject, client), if any.
    async fn load(&self, subject: &str, client_id: &str) -> Result<Option<Consent>, StoreError>;

    /// Persist a decision, replacing any previous one.
    async fn save(&self, consent: Consent) -> Result<(), StoreError>;

    /// Forget the decision for (subject, client).
    async fn revoke(&self, subject: &str, client_id: &str) -> Result<(), StoreError>;
}

/// Inputs for minting tokens in implicit and hybrid flows.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Client the token is issued to.
    pub client_id: String,
    /// Subject identifier of the authenticated user.
    pub subject: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Nonce to embed in the identity token.
    pub nonce: Option<String>,
    /// Authentication time of the session.
    pub auth_time: Option<i64>,
    /// Access token to bind into the identity token's `at_hash`, when
    /// both are issued.
    pub access_token: Option<String>,
}

/// Mints and signs tokens. Key material and signing live outside the
/// authorization core.
#[async_trait]
pub trait TokenFactory: Send + Sync {
    /// Create an access token; returns the token and its lifetime in
    /// seconds.
    async fn create_access_token(&self, request: &TokenRequest)
        -> Result<(String, i64), StoreError>;

    /// Create a signed identity token.
    async fn create_identity_token(&self, request: &TokenRequest) -> Result<String, StoreError>;
}

/// Localized message lookup. A missing key is returned verbatim so
/// message keys double as fallbacks.
pub trait LocalizationService: Send + Sync {
    /// Resolve a message key to display text.
    fn get_message(&self, key: &str) -> String;
}

/// Localization that returns every key unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughLocalization;

impl LocalizationService for PassthroughLocalization {
    fn get_message(&self, key: &str) -> String {
        key.to_string()
    }
}
