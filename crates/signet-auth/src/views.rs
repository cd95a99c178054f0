//! View models and the view service contract.
//!
//! Rendering is external; the controllers hand over fully-populated
//! view models and receive HTML. Every model carries the site name and
//! only display-safe, localized strings.

use crate::antiforgery::AntiForgeryToken;
use async_trait::async_trait;
use serde::Serialize;
use signet_core::{LoginPageLink, StoreError};

/// Login page model.
#[derive(Debug, Clone, Serialize)]
pub struct LoginViewModel {
    /// Site name for the page chrome.
    pub site_name: String,
    /// Sign-in flow id; posted back with the credentials.
    pub signin_id: String,
    /// Hidden anti-forgery fields.
    pub anti_forgery: AntiForgeryToken,
    /// Whether the username/password form is shown.
    pub show_login_form: bool,
    /// Whether the remember-me checkbox is shown.
    pub allow_remember_me: bool,
    /// Prefilled username (login hint or remembered username).
    pub username: Option<String>,
    /// Localized error to display, if the previous attempt failed.
    pub error_message: Option<String>,
    /// External providers the user may pick, already filtered by the
    /// client's restrictions.
    pub external_providers: Vec<ExternalProviderLink>,
    /// Additional configured links.
    pub links: Vec<LoginPageLink>,
}

/// One external provider button on the login page.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalProviderLink {
    /// Provider name used in the challenge URL.
    pub provider: String,
    /// Display text.
    pub display_name: String,
    /// Challenge URL for this provider and sign-in flow.
    pub href: String,
}

/// Consent page model.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentViewModel {
    /// Site name for the page chrome.
    pub site_name: String,
    /// Client display name.
    pub client_name: String,
    /// Hidden anti-forgery fields.
    pub anti_forgery: AntiForgeryToken,
    /// Identity scopes being requested.
    pub identity_scopes: Vec<String>,
    /// Resource scopes being requested.
    pub resource_scopes: Vec<String>,
    /// Whether the remember-consent checkbox is shown.
    pub allow_remember_consent: bool,
    /// Localized validation error from a previous submission.
    pub error_message: Option<String>,
    /// URL the consent form posts back to (carries the original query).
    pub post_url: String,
}

/// Error page model.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorViewModel {
    /// Site name for the page chrome.
    pub site_name: String,
    /// Localized error message. Never contains client-supplied data.
    pub error_message: String,
}

/// Logout confirmation prompt model.
#[derive(Debug, Clone, Serialize)]
pub struct LogoutViewModel {
    /// Site name for the page chrome.
    pub site_name: String,
    /// Client display name when the logout was client-initiated.
    pub client_name: Option<String>,
    /// Hidden anti-forgery fields.
    pub anti_forgery: AntiForgeryToken,
    /// URL the confirmation form posts to (preserves the signout id).
    pub post_url: String,
}

/// Logged-out page model.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedOutViewModel {
    /// Site name for the page chrome.
    pub site_name: String,
    /// Front-channel signout URLs to load in hidden iframes.
    pub iframe_urls: Vec<String>,
    /// Validated client redirect to offer after logout.
    pub redirect_url: Option<String>,
    /// Display name of the client being returned to.
    pub client_name: Option<String>,
}

/// Host-provided view renderer.
#[async_trait]
pub trait ViewService: Send + Sync {
    /// Render the login page.
    async fn login(&self, model: &LoginViewModel) -> Result<String, StoreError>;
    /// Render the consent page.
    async fn consent(&self, model: &ConsentViewModel) -> Result<String, StoreError>;
    /// Render the error page.
    async fn error(&self, model: &ErrorViewModel) -> Result<String, StoreError>;
    /// Render the logout confirmation prompt.
    async fn logout(&self, model: &LogoutViewModel) -> Result<String, StoreError>;
    /// Render the logged-out page.
    async fn logged_out(&self, model: &LoggedOutViewModel) -> Result<String, StoreError>;
}
