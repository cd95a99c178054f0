//! # signet-api-auth
//!
//! The interactive authentication flows for Signet: local and external
//! login, the external provider challenge/callback round trip,
//! partial-login resumption, and logout with front-channel signout.

pub mod controller;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;

pub use controller::AuthenticationController;
pub use error::EndpointError;
pub use models::{ExternalProvider, LoginForm, LogoutForm};
pub use router::{router, AuthCollaborators, AuthState};
