//! Sign-in and sign-out message envelopes.
//!
//! A message describes an in-progress flow and travels in a sealed
//! cookie keyed by a random id, so distinct flows in the same browser
//! never alias each other.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Context of an authorize flow that was interrupted for login.
///
/// `return_url` is the absolute authorize URL with all original query
/// parameters preserved; redirecting there resumes the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInMessage {
    /// Absolute URL to continue at after sign-in.
    pub return_url: String,
    /// Client that initiated the flow, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Identity provider requested via acr values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idp: Option<String>,
    /// Remaining acr hints after idp/tenant extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acr_values: Vec<String>,
    /// Tenant hint requested via acr values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    /// Username hint from the authorize request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,
    /// Display mode hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,
    /// Requested UI locales.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_locales: Option<String>,
    /// Unix time the message was created.
    pub created: i64,
}

impl SignInMessage {
    /// A fresh message pointing back at `return_url`.
    pub fn new(return_url: impl Into<String>) -> Self {
        Self {
            return_url: return_url.into(),
            client_id: None,
            idp: None,
            acr_values: Vec::new(),
            tenant: None,
            login_hint: None,
            display_mode: None,
            ui_locales: None,
            created: Utc::now().timestamp(),
        }
    }

    /// Whether the message is older than `max_age`.
    pub fn is_expired(&self, max_age: Duration) -> bool {
        let age = Utc::now().timestamp() - self.created;
        age < 0 || age > max_age.num_seconds()
    }
}

/// Context of an RP-initiated logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOutMessage {
    /// Client that initiated the logout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Where the client asked to be redirected after logout. Must be
    /// validated against the client's registered URIs before use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<String>,
    /// Opaque client state echoed on the post-logout redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Unix time the message was created.
    pub created: i64,
}

impl SignOutMessage {
    /// A fresh sign-out message for `client_id`.
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client_id,
            post_logout_redirect_uri: None,
            state: None,
            created: Utc::now().timestamp(),
        }
    }
}
