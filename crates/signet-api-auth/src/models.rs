//! Forms and configuration models for the interactive flows.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A configured external identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalProvider {
    /// Provider name used in URLs and IdP restriction lists.
    pub name: String,
    /// Display name for the login page button.
    pub display_name: String,
    /// The provider's authorization endpoint to redirect the challenge
    /// to.
    pub authorize_endpoint: String,
}

/// Local login form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Remember-me checkbox; absent when the user made no choice.
    #[serde(default)]
    pub remember_me: Option<String>,
    /// Anti-forgery token from the hidden field.
    #[serde(default)]
    pub anti_forgery_token: Option<String>,
    /// Anti-forgery signature from the hidden field.
    #[serde(default)]
    pub anti_forgery_sig: Option<String>,
}

impl LoginForm {
    /// The user's remember-me choice as a tri-state.
    pub fn remember_me_choice(&self) -> Option<bool> {
        match self.remember_me.as_deref() {
            Some("true") | Some("on") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }
}

/// Logout confirmation form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LogoutForm {
    /// Anti-forgery token from the hidden field.
    #[serde(default)]
    pub anti_forgery_token: Option<String>,
    /// Anti-forgery signature from the hidden field.
    #[serde(default)]
    pub anti_forgery_sig: Option<String>,
}

/// Round-trip properties of an external provider challenge, sealed in a
/// short-lived cookie so the sign-in id survives the redirect through
/// the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProperties {
    /// Sign-in flow being continued.
    pub signin_id: String,
    /// Provider being challenged.
    pub provider: String,
    /// Nonce echoed back in the callback `state` parameter.
    pub nonce: String,
    /// Unix time the challenge started.
    pub created: i64,
}

impl ChallengeProperties {
    /// A fresh challenge for `provider` continuing `signin_id`.
    pub fn new(signin_id: impl Into<String>, provider: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            signin_id: signin_id.into(),
            provider: provider.into(),
            nonce: nonce.into(),
            created: Utc::now().timestamp(),
        }
    }

    /// Whether the challenge is older than `max_age_secs`.
    pub fn is_expired(&self, max_age_secs: i64) -> bool {
        let age = Utc::now().timestamp() - self.created;
        age < 0 || age > max_age_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_me_tri_state() {
        let mut form = LoginForm {
            username: "a".into(),
            password: "b".into(),
            remember_me: None,
            anti_forgery_token: None,
            anti_forgery_sig: None,
        };
        assert_eq!(form.remember_me_choice(), None);
        form.remember_me = Some("true".into());
        assert_eq!(form.remember_me_choice(), Some(true));
        form.remember_me = Some("on".into());
        assert_eq!(form.remember_me_choice(), Some(true));
        form.remember_me = Some("false".into());
        assert_eq!(form.remember_me_choice(), Some(false));
    }

    #[test]
    fn challenge_expiry() {
        let mut props = ChallengeProperties::new("s1", "google", "n1");
        assert!(!props.is_expired(300));
        props.created -= 600;
        assert!(props.is_expired(300));
    }
}
