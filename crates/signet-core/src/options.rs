//! Server options snapshot.
//!
//! Deserialized once at startup and shared as a read-only `Arc` across
//! request handlers. Durations are expressed in seconds to keep the
//! configuration format flat.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the authorization server core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Site name rendered on login, consent, and error pages.
    pub site_name: String,
    /// Public origin of this server, e.g. `https://id.example.com`.
    /// Used to build absolute return and resume URLs.
    pub public_origin: String,
    /// Endpoint toggles.
    pub endpoints: EndpointOptions,
    /// Interactive authentication behavior.
    pub authentication: AuthenticationOptions,
    /// Event raising gates.
    pub events: EventsOptions,
    /// Front-channel signout URLs loaded as iframes on the logged-out page.
    pub protocol_logout_urls: Vec<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            site_name: "Signet".to_string(),
            public_origin: "https://localhost:44333".to_string(),
            endpoints: EndpointOptions::default(),
            authentication: AuthenticationOptions::default(),
            events: EventsOptions::default(),
            protocol_logout_urls: Vec::new(),
        }
    }
}

/// Which endpoints are served. A disabled endpoint returns 404.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointOptions {
    /// Serve `GET /connect/authorize`.
    pub enable_authorize_endpoint: bool,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            enable_authorize_endpoint: true,
        }
    }
}

/// Interactive login/logout behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthenticationOptions {
    /// Serve the username/password form. When false, `POST /login`
    /// returns 405.
    pub enable_local_login: bool,
    /// Show the logout confirmation prompt. Client-initiated signout
    /// skips the prompt regardless.
    pub enable_sign_out_prompt: bool,
    /// Maximum age of a sign-in message cookie, in seconds.
    pub sign_in_message_max_age_secs: i64,
    /// Additional links rendered on the login page.
    pub login_page_links: Vec<LoginPageLink>,
    /// Authentication cookie behavior.
    pub cookie: CookieOptions,
}

impl Default for AuthenticationOptions {
    fn default() -> Self {
        Self {
            enable_local_login: true,
            enable_sign_out_prompt: true,
            sign_in_message_max_age_secs: 300,
            login_page_links: Vec::new(),
            cookie: CookieOptions::default(),
        }
    }
}

/// A link rendered beneath the login form. Serialized into the login
/// view model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPageLink {
    /// Link text.
    pub text: String,
    /// Link target.
    pub href: String,
}

/// Authentication cookie persistence policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Offer the remember-me checkbox and the last-username hint.
    pub allow_remember_me: bool,
    /// Server default when the user expressed no remember-me choice.
    pub is_persistent: bool,
    /// Lifetime of a persistent remember-me cookie, in seconds.
    pub remember_me_duration_secs: i64,
    /// Lifetime of a persistent cookie issued by the server default, in
    /// seconds.
    pub expire_time_to_live_secs: i64,
    /// Emit the `Secure` attribute on all cookies.
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            allow_remember_me: true,
            is_persistent: false,
            remember_me_duration_secs: 30 * 24 * 60 * 60,
            expire_time_to_live_secs: 10 * 60 * 60,
            secure: true,
        }
    }
}

/// Gates for raising events to the event sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsOptions {
    /// Raise success events.
    pub raise_success_events: bool,
    /// Raise failure events.
    pub raise_failure_events: bool,
}

impl Default for EventsOptions {
    fn default() -> Self {
        Self {
            raise_success_events: false,
            raise_failure_events: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let opts = ServerOptions::default();
        assert!(opts.endpoints.enable_authorize_endpoint);
        assert!(opts.authentication.enable_local_login);
        assert_eq!(opts.authentication.sign_in_message_max_age_secs, 300);
        assert!(!opts.events.raise_success_events);
        assert!(opts.events.raise_failure_events);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let opts: ServerOptions = serde_json::from_str(
            r#"{"site_name":"Acme ID","authentication":{"enable_local_login":false}}"#,
        )
        .unwrap();
        assert_eq!(opts.site_name, "Acme ID");
        assert!(!opts.authentication.enable_local_login);
        assert!(opts.authentication.enable_sign_out_prompt);
    }
}
