//! Authentication endpoint router and shared state.

use crate::controller::AuthenticationController;
use crate::handlers::{
    callback_handler, external_handler, login_get_handler, login_post_handler, logout_get_handler,
    logout_post_handler, resume_handler,
};
use crate::models::ExternalProvider;
use axum::{
    routing::{get, post},
    Router,
};
use signet_auth::{
    AntiForgery, AuthCookieIssuer, LastUsernameCookie, MessageCookies, MessageProtector,
    SessionCookie, UserService, ViewService,
};
use signet_core::{ClientStore, EventService, EventSink, LocalizationService, ServerOptions};
use std::sync::Arc;

/// Shared state for the authentication routes.
#[derive(Clone)]
pub struct AuthState {
    /// The login/logout flow controller.
    pub controller: Arc<AuthenticationController>,
    /// Reads the primary authentication cookie.
    pub cookie_issuer: AuthCookieIssuer,
}

/// Collaborators required to assemble the authentication endpoints.
pub struct AuthCollaborators {
    /// Account lookup and credential verification.
    pub users: Arc<dyn UserService>,
    /// Registered client resolution.
    pub clients: Arc<dyn ClientStore>,
    /// View rendering.
    pub views: Arc<dyn ViewService>,
    /// Localized messages.
    pub localization: Arc<dyn LocalizationService>,
    /// Event destination.
    pub events: Arc<dyn EventSink>,
}

impl AuthState {
    /// Assemble the endpoint state.
    ///
    /// `master_key` must match the key used by the authorize endpoint so
    /// the two surfaces can read each other's cookies;
    /// `anti_forgery_secret` must be independent of it.
    pub fn new(
        options: Arc<ServerOptions>,
        collaborators: AuthCollaborators,
        providers: Vec<ExternalProvider>,
        master_key: &[u8; 32],
        anti_forgery_secret: impl Into<Vec<u8>>,
    ) -> Self {
        let protector = Arc::new(MessageProtector::new(master_key));
        let secure = options.authentication.cookie.secure;
        let messages = MessageCookies::new(
            protector.clone(),
            options.authentication.sign_in_message_max_age_secs,
            secure,
        );
        let cookie_issuer =
            AuthCookieIssuer::new(protector.clone(), options.authentication.cookie.clone());
        let last_username =
            LastUsernameCookie::new(secure, options.authentication.cookie.allow_remember_me);

        let controller = AuthenticationController::new(
            options.clone(),
            collaborators.users,
            collaborators.clients,
            collaborators.views,
            collaborators.localization,
            EventService::new(collaborators.events, options.events.clone()),
            providers,
            protector,
            messages,
            cookie_issuer.clone(),
            SessionCookie::new(secure),
            last_username,
            AntiForgery::new(anti_forgery_secret),
        );

        Self {
            controller: Arc::new(controller),
            cookie_issuer,
        }
    }
}

/// Build the authentication router.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/login", get(login_get_handler).post(login_post_handler))
        .route("/external", get(external_handler))
        .route("/callback", get(callback_handler))
        .route("/resume", get(resume_handler))
        .route(
            "/logout",
            get(logout_get_handler).post(logout_post_handler),
        )
        .with_state(state)
}
