//! Endpoint-level failures that escape the state machine.
//!
//! The state machine itself never propagates errors across phase
//! boundaries; this type covers the two infrastructure cases left over
//! at the edge: the view renderer failing and cookie sealing failing.

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
        tracing::error!(error = %self, "authorize endpoint infrastructure failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "server_error").into_response()
    }
}
