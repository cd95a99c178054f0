//! Registered client model.

use serde::{Deserialize, Serialize};

/// OAuth 2.0 / OIDC flow a client is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Authorization code flow (`response_type=code`).
    AuthorizationCode,
    /// Implicit flow (`token` and/or `id_token`).
    Implicit,
    /// Hybrid flow (`code` combined with `token`/`id_token`).
    Hybrid,
}

/// A registered client as resolved from the client store.
///
/// The authorization core treats this as an immutable snapshot for the
/// duration of a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    pub client_id: String,
    /// Display name shown on consent and logout pages.
    pub client_name: String,
    /// Disabled clients fail validation as if unknown.
    pub enabled: bool,
    /// The flow this client is registered for.
    pub flow: Flow,
    /// Scopes the client may request.
    pub allowed_scopes: Vec<String>,
    /// Registered redirect URIs; requests must match exactly.
    pub redirect_uris: Vec<String>,
    /// Registered post-logout redirect URIs; requests must match exactly.
    pub post_logout_redirect_uris: Vec<String>,
    /// Front-channel signout URI loaded in an iframe on the logged-out page.
    pub logout_uri: Option<String>,
    /// Whether the consent screen is shown for this client.
    pub require_consent: bool,
    /// Whether a user's consent decision may be remembered.
    pub allow_remember_consent: bool,
    /// External identity providers this client may use. Empty means all
    /// configured providers are allowed.
    pub identity_provider_restrictions: Vec<String>,
    /// Whether username/password login is allowed for this client.
    pub enable_local_login: bool,
}

impl Client {
    /// Whether `provider` may be used to sign in for this client.
    pub fn allows_identity_provider(&self, provider: &str) -> bool {
        self.identity_provider_restrictions.is_empty()
            || self
                .identity_provider_restrictions
                .iter()
                .any(|p| p == provider)
    }

    /// Whether every requested scope is within the client's allowed set.
    pub fn allows_scopes<'a>(&self, requested: impl IntoIterator<Item = &'a str>) -> bool {
        requested
            .into_iter()
            .all(|s| self.allowed_scopes.iter().any(|a| a == s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client {
            client_id: "c1".into(),
            client_name: "Test Client".into(),
            enabled: true,
            flow: Flow::AuthorizationCode,
            allowed_scopes: vec!["openid".into(), "profile".into()],
            redirect_uris: vec!["https://app/cb".into()],
            post_logout_redirect_uris: vec![],
            logout_uri: None,
            require_consent: false,
            allow_remember_consent: true,
            identity_provider_restrictions: vec![],
            enable_local_login: true,
        }
    }

    #[test]
    fn empty_idp_restrictions_allow_everything() {
        assert!(client().allows_identity_provider("google"));
    }

    #[test]
    fn idp_restrictions_are_enforced() {
        let mut c = client();
        c.identity_provider_restrictions = vec!["corp-saml".into()];
        assert!(c.allows_identity_provider("corp-saml"));
        assert!(!c.allows_identity_provider("google"));
    }

    #[test]
    fn scope_subset_check() {
        let c = client();
        assert!(c.allows_scopes(["openid"]));
        assert!(c.allows_scopes(["openid", "profile"]));
        assert!(!c.allows_scopes(["openid", "api:write"]));
    }
}
