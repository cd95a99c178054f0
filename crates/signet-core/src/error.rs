//! Error taxonomy for the authorization endpoint.
//!
//! Errors raised while processing an authorize request fall into two
//! classes with very different emission rules: `ErrorType::User` errors
//! must never be redirected to the client (the redirect target itself is
//! untrusted) and are rendered as an error page, while `ErrorType::Client`
//! errors are returned to the client as a protocol error redirect with the
//! `state` parameter echoed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth 2.0 protocol error codes (RFC 6749 section 4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolError {
    /// The request is missing a required parameter or is malformed.
    InvalidRequest,
    /// The client is not authorized to use this flow.
    UnauthorizedClient,
    /// The resource owner denied the request.
    AccessDenied,
    /// The authorization server does not support the response type.
    UnsupportedResponseType,
    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,
    /// The authorization server encountered an unexpected condition.
    ServerError,
    /// The authorization server is temporarily unavailable.
    TemporarilyUnavailable,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        };
        write!(f, "{s}")
    }
}

/// How an authorize error may be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Unsafe to redirect: unknown client or unvalidated redirect URI.
    /// Rendered as an error page, never a 3xx to the client.
    User,
    /// Safe to redirect to the validated redirect URI with the protocol
    /// error code and the echoed `state`.
    Client,
}

/// An error produced by one of the authorize state-machine phases.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{error}{}", description.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct AuthError {
    /// Emission class (render vs redirect).
    pub error_type: ErrorType,
    /// Protocol error code.
    pub error: ProtocolError,
    /// Human-readable description. Not rendered to end users when a
    /// localized mapping exists.
    pub description: Option<String>,
}

impl AuthError {
    /// An error that must be rendered to the user, never redirected.
    pub fn user(error: ProtocolError, description: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::User,
            error,
            description: Some(description.into()),
        }
    }

    /// An error that is safe to return to the client via redirect.
    pub fn client(error: ProtocolError, description: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Client,
            error,
            description: Some(description.into()),
        }
    }

    /// Internal invariant violation surfaced as `server_error`.
    pub fn server(description: impl Into<String>) -> Self {
        Self::client(ProtocolError::ServerError, description)
    }
}

/// Failure raised by an external collaborator (store, user service, view
/// renderer). Always treated as an infrastructure error: logged, recorded
/// as a failure event, and rendered as the generic error view.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The collaborator could not be reached or failed internally.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    /// A payload could not be serialized or deserialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
