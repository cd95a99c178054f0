//! Consent submission models.

use serde::Deserialize;
use utoipa::ToSchema;

/// Raw consent form as posted by the browser.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConsentForm {
    /// `yes` to grant, anything else denies.
    pub button: String,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scopes: Option<String>,
    /// Whether to remember this decision.
    #[serde(default)]
    pub remember_consent: Option<bool>,
    /// Anti-forgery token from the hidden field.
    #[serde(default)]
    pub anti_forgery_token: Option<String>,
    /// Anti-forgery signature from the hidden field.
    #[serde(default)]
    pub anti_forgery_sig: Option<String>,
}

/// A parsed consent decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConsent {
    /// Whether the user granted access.
    pub granted: bool,
    /// Scopes the user selected.
    pub scopes: Vec<String>,
    /// Whether to persist the decision.
    pub remember_consent: bool,
}

impl From<&ConsentForm> for UserConsent {
    fn from(form: &ConsentForm) -> Self {
        Self {
            granted: form.button == "yes",
            scopes: form
                .scopes
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            remember_consent: form.remember_consent.unwrap_or(false),
        }
    }
}
