//! HTTP handlers for the authorize endpoint.

pub mod authorize;

pub use authorize::{authorize_handler, consent_handler, switch_handler};
