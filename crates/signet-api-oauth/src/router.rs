//! Authorize endpoint router and shared state.

use crate::controller::AuthorizeController;
use crate::handlers::{authorize_handler, consent_handler, switch_handler};
use crate::services::{InteractionGenerator, RequestValidator, ResponseGenerator};
use axum::{
    routing::{get, post},
    Router,
};
use signet_auth::{
    AntiForgery, AuthCookieIssuer, MessageCookies, MessageProtector, SessionCookie, ViewService,
};
use signet_core::{
    AuthorizationCodeStore, ClientStore, ConsentStore, EventService, EventSink,
    LocalizationService, ServerOptions, TokenFactory,
};
use std::sync::Arc;

/// Shared state for the authorize endpoint routes.
#[derive(Clone)]
pub struct OAuthState {
    /// The authorize state machine.
    pub controller: Arc<AuthorizeController>,
    /// Reads the primary authentication cookie.
    pub cookie_issuer: AuthCookieIssuer,
}

/// Collaborators required to assemble the authorize endpoint.
pub struct OAuthCollaborators {
    /// Registered client resolution.
    pub clients: Arc<dyn ClientStore>,
    /// Remembered consent decisions.
    pub consents: Arc<dyn ConsentStore>,
    /// Authorization code persistence.
    pub codes: Arc<dyn AuthorizationCodeStore>,
    /// Token minting for implicit and hybrid flows.
    pub tokens: Arc<dyn TokenFactory>,
    /// View rendering.
    pub views: Arc<dyn ViewService>,
    /// Localized messages.
    pub localization: Arc<dyn LocalizationService>,
    /// Event destination.
    pub events: Arc<dyn EventSink>,
}

impl OAuthState {
    /// Assemble the endpoint state.
    ///
    /// `master_key` protects cookie payloads; `anti_forgery_secret` must
    /// be independent of it.
    pub fn new(
        options: Arc<ServerOptions>,
        collaborators: OAuthCollaborators,
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
            AuthCookieIssuer::new(protector, options.authentication.cookie.clone());

        let controller = AuthorizeController::new(
            options.clone(),
            RequestValidator::new(collaborators.clients),
            InteractionGenerator::new(options.clone(), collaborators.consents),
            ResponseGenerator::new(collaborators.codes, collaborators.tokens),
            collaborators.views,
            collaborators.localization,
            EventService::new(collaborators.events, options.events.clone()),
            messages,
            SessionCookie::new(secure),
            AntiForgery::new(anti_forgery_secret),
        );

        Self {
            controller: Arc::new(controller),
            cookie_issuer,
        }
    }
}

/// Build the authorize endpoint router.
pub fn router(state: OAuthState) -> Router {
    Router::new()
        .route("/connect/authorize", get(authorize_handler))
        .route("/connect/consent", post(consent_handler))
        .route("/connect/switch", get(switch_handler))
        .with_state(state)
}
