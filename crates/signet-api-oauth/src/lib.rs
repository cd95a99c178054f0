//! # signet-api-oauth
//!
//! The OAuth 2.0 / OIDC authorize endpoint: request validation, the
//! login/consent interaction state machine, response generation, and the
//! HTTP surface (`/connect/authorize`, `/connect/consent`,
//! `/connect/switch`).

pub mod controller;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use controller::AuthorizeController;
pub use error::EndpointError;
pub use router::{router, OAuthCollaborators, OAuthState};
