//! Interactive login handlers.

use crate::error::EndpointError;
use crate::models::LoginForm;
use crate::router::AuthState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Form,
};
use serde::Deserialize;
use signet_auth::{HandlerOutcome, RequestContext};

/// Query parameters for the login routes.
#[derive(Debug, Deserialize)]
pub struct SigninQuery {
    /// Sign-in flow id minted by the authorize endpoint.
    pub signin: Option<String>,
}

/// Login page. Performs the silent-SSO pre-authentication hook, then
/// either redirects to an external provider or renders the local form.
#[utoipa::path(
    get,
    path = "/login",
    params(("signin" = Option<String>, Query, description = "Sign-in flow id")),
    responses(
        (status = 200, description = "Login page or error page"),
        (status = 302, description = "Silent sign-in or external provider redirect"),
    ),
    tag = "Authentication"
)]
pub async fn login_get_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<SigninQuery>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.login_get(&ctx, query.signin).await
}

/// Local credential submission.
#[utoipa::path(
    post,
    path = "/login",
    params(("signin" = Option<String>, Query, description = "Sign-in flow id")),
    request_body = LoginForm,
    responses(
        (status = 302, description = "Signed in; returning to the authorize flow"),
        (status = 200, description = "Login page re-rendered with an error"),
        (status = 400, description = "Anti-forgery validation failed"),
        (status = 405, description = "Local login disabled"),
    ),
    tag = "Authentication"
)]
pub async fn login_post_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<SigninQuery>,
    Form(form): Form<LoginForm>,
) -> Result<HandlerOutcome, EndpointError> {
    let ctx = RequestContext::from_headers(&headers, &state.cookie_issuer);
    state.controller.login_post(&ctx, query.signin, form).await
}
