//! Logout handlers.

use crate::error::EndpointError;
use crate::models::LogoutForm;
use crate::router::AuthState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Form,
};
use serde::Deserialize;
use signet_auth::{HandlerOutcome, RequestContext};

/// Query parameters for the logout routes.
#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    /// Sign-out message id, when the logout was client-initiated.
    pub id: Option<String>,
}

/// Logout prompt. Skipped for unauthenticated users, client-initiated
/// signout, or when the prompt is disabled.
#[utoipa::path(
    get,
    path = "/logout",
    params(("id" = Option<String>, Query, description = "Sign-out message id")),
    responses((status = 200, description = "Logout prompt or logged-out page")),
    tag = "Authentication"
)]
pub async fn logout_get_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<LogoutQuery>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.logout_get(&ctx, query.id).await
}

/// Execute logout: clears all session cookies, notifies the user
/// service, and renders the logged-out page with front-channel signout
/// frames.
#[utoipa::path(
    post,
    path = "/logout",
    params(("id" = Option<String>, Query, description = "Sign-out message id")),
    request_body = LogoutForm,
    responses(
        (status = 200, description = "Logged-out page"),
        (status = 400, description = "Anti-forgery validation failed"),
    ),
    tag = "Authentication"
)]
pub async fn logout_post_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<LogoutQuery>,
    Form(form): Form<LogoutForm>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.logout_post(&ctx, query.id, form).await
}
