//! User service contract.
//!
//! Account lookup, credential verification, and external-account mapping
//! live outside the core. The user service speaks in terms of claims
//! identities and sign-in messages; the controllers translate its
//! results into cookies and redirects.

use crate::claims::ClaimsIdentity;
use crate::messages::SignInMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signet_core::StoreError;

/// An identity asserted by an external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider name, e.g. `google`.
    pub provider: String,
    /// User id scoped to the provider.
    pub provider_id: String,
    /// Claims asserted by the provider, as (type, value) pairs.
    pub claims: Vec<(String, String)>,
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticateResult {
    /// A complete sign-in; the identity becomes the primary session.
    FullSignIn(ClaimsIdentity),
    /// An interrupted sign-in. The user must visit `redirect_path` (a
    /// relative `~/…` path) before the session can be completed.
    PartialSignIn {
        /// Identity to carry in the partial cookie.
        identity: ClaimsIdentity,
        /// Relative path (`~/register` style) to collect the missing data.
        redirect_path: String,
    },
    /// The attempt failed with a user-displayable message key.
    Error(String),
}

impl AuthenticateResult {
    /// Whether this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Host-provided user authentication service.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Hook invoked before the login page renders. Returning a non-error
    /// result performs a silent sign-in (auto SSO) and skips the page.
    async fn pre_authenticate(
        &self,
        message: &SignInMessage,
    ) -> Result<Option<AuthenticateResult>, StoreError>;

    /// Verify local credentials.
    async fn authenticate_local(
        &self,
        username: &str,
        password: &str,
        message: &SignInMessage,
    ) -> Result<Option<AuthenticateResult>, StoreError>;

    /// Map an external identity to a local account, or begin partial
    /// sign-in when more data is needed.
    async fn authenticate_external(
        &self,
        external: &ExternalIdentity,
        message: &SignInMessage,
    ) -> Result<Option<AuthenticateResult>, StoreError>;

    /// Notification that `subject` signed out.
    async fn sign_out(&self, subject: &ClaimsIdentity) -> Result<(), StoreError>;
}
