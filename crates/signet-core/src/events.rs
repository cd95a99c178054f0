//! Typed authentication and authorization events.
//!
//! Components raise events through [`EventService`], which applies the
//! configured success/failure gates and forwards to the host-provided
//! [`EventSink`]. The sink never calls back into the core.

use crate::options::EventsOptions;
use serde::Serialize;
use std::sync::Arc;

/// Endpoint an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `GET /connect/authorize`.
    Authorize,
}

/// Events raised by the authorization core.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// An endpoint reached its success terminus.
    EndpointSuccess {
        endpoint: Endpoint,
        client_id: Option<String>,
        subject: Option<String>,
    },
    /// An endpoint reached a failure terminus.
    EndpointFailure {
        endpoint: Endpoint,
        reason: String,
    },
    /// Username/password sign-in succeeded.
    LocalLoginSuccess {
        username: String,
        subject: String,
        signin_id: String,
    },
    /// Username/password sign-in failed.
    LocalLoginFailure {
        username: String,
        reason: String,
    },
    /// External provider sign-in succeeded.
    ExternalLoginSuccess {
        provider: String,
        subject: String,
    },
    /// External provider sign-in failed.
    ExternalLoginFailure {
        provider: String,
        reason: String,
    },
    /// A partial sign-in was issued pending further user interaction.
    PartialLogin {
        subject: Option<String>,
        resume_path: String,
    },
    /// The user signed out.
    Logout {
        subject: Option<String>,
    },
}

impl AuthEvent {
    /// Whether this event is gated by `raise_success_events` (true) or
    /// `raise_failure_events` (false).
    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            Self::EndpointFailure { .. }
                | Self::LocalLoginFailure { .. }
                | Self::ExternalLoginFailure { .. }
        )
    }
}

/// Host-provided event destination.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Implementations must not call back into the
    /// authorization core.
    fn raise(&self, event: &AuthEvent);
}

/// A sink that drops everything. Useful as a default and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn raise(&self, _event: &AuthEvent) {}
}

/// Applies the configured gates before forwarding to the sink.
#[derive(Clone)]
pub struct EventService {
    sink: Arc<dyn EventSink>,
    options: EventsOptions,
}

impl EventService {
    /// Create a gated event service.
    pub fn new(sink: Arc<dyn EventSink>, options: EventsOptions) -> Self {
        Self { sink, options }
    }

    /// Raise an event if its class is enabled.
    pub fn raise(&self, event: AuthEvent) {
        let enabled = if event.is_success() {
            self.options.raise_success_events
        } else {
            self.options.raise_failure_events
        };
        if enabled {
            self.sink.raise(&event);
        }
    }
}
