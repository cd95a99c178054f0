//! Authorize endpoint handlers.
//!
//! The handlers are thin: they assemble the request context from
//! headers, hand off to [`crate::AuthorizeController`], and let the outcome
//! convert itself into a response.

use crate::error::EndpointError;
use crate::models::ConsentForm;
use crate::router::OAuthState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Form,
};
use signet_auth::{HandlerOutcome, RequestContext};
use std::collections::BTreeMap;

/// Authorization endpoint. Runs the state machine and emits a login
/// redirect, the consent view, an error page, or the authorize
/// response.
#[utoipa::path(
    get,
    path = "/connect/authorize",
    responses(
        (status = 302, description = "Authorize response or login redirect"),
        (status = 200, description = "Consent view, error view, or form-post response"),
        (status = 404, description = "Endpoint disabled"),
    ),
    tag = "Authorize"
)]
pub async fn authorize_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.authorize(&ctx, params, None).await
}

/// Consent submission. The original authorize query rides on the URL;
/// the form body carries the decision and the anti-forgery fields.
#[utoipa::path(
    post,
    path = "/connect/consent",
    request_body = ConsentForm,
    responses(
        (status = 302, description = "Authorize response"),
        (status = 200, description = "Consent view re-rendered with a validation message"),
        (status = 400, description = "Anti-forgery validation failed"),
    ),
    tag = "Authorize"
)]
pub async fn consent_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
    Form(form): Form<ConsentForm>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.consent(&ctx, params, form).await
}

/// Switch-user endpoint: re-enters the authorize flow with
/// `prompt=login` forced, discarding the current session for this
/// request only.
#[utoipa::path(
    get,
    path = "/connect/switch",
    responses((status = 302, description = "Login redirect")),
    tag = "Authorize"
)]
pub async fn switch_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.switch_user(&ctx, params).await
}
