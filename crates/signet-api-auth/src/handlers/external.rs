//! External identity provider challenge, callback, and partial-login
//! resume handlers.

use crate::error::EndpointError;
use crate::router::AuthState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use signet_auth::{HandlerOutcome, RequestContext};

/// Query parameters for the external challenge route.
#[derive(Debug, Deserialize)]
pub struct ExternalQuery {
    /// Sign-in flow id.
    pub signin: Option<String>,
    /// Provider to challenge.
    pub provider: Option<String>,
}

/// Query parameters for the external callback route.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// State nonce issued with the challenge.
    pub state: Option<String>,
}

/// Query parameters for the resume route.
#[derive(Debug, Deserialize)]
pub struct ResumeQuery {
    /// Resume id from the partial-login return URL.
    pub resume: Option<String>,
}

/// Challenge an external provider for the given sign-in flow.
#[utoipa::path(
    get,
    path = "/external",
    params(
        ("signin" = Option<String>, Query, description = "Sign-in flow id"),
        ("provider" = Option<String>, Query, description = "External provider name"),
    ),
    responses(
        (status = 302, description = "Redirect to the provider"),
        (status = 200, description = "Error page"),
    ),
    tag = "Authentication"
)]
pub async fn external_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<ExternalQuery>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state
        .controller
        .external_challenge(&ctx, query.signin, query.provider)
        .await
}

/// Process the provider response and continue the sign-in flow.
#[utoipa::path(
    get,
    path = "/callback",
    params(("state" = Option<String>, Query, description = "Challenge state nonce")),
    responses(
        (status = 302, description = "Signed in, partial redirect, or return to authorize"),
        (status = 200, description = "Error page"),
    ),
    tag = "Authentication"
)]
pub async fn callback_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.external_callback(&ctx, query.state).await
}

/// Resume a partial sign-in after the missing user data was collected.
#[utoipa::path(
    get,
    path = "/resume",
    params(("resume" = Option<String>, Query, description = "Resume id")),
    responses(
        (status = 302, description = "Promoted to a full session"),
        (status = 200, description = "Error page"),
    ),
    tag = "Authentication"
)]
pub async fn resume_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<ResumeQuery>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.resume(&ctx, query.resume).await
}
