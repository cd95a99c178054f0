//! Endpoint-level failures that escape the login/logout controllers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use signet_auth::EnvelopeError;
use signet_core::StoreError;
use thiserror::Error;

/// Infrastructure failure while emitting an outcome.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The view service failed to render.
    #[error("view rendering failed: {0}")]
    View(#[from] StoreError),
    /// A cookie payload could not be sealed.
    #[error("cookie protection failed: {0}")]
    Protection(#[from] EnvelopeError),
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "authentication endpoint infrastructure failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "server_error").into_response()
    }
}
