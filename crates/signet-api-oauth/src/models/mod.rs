//! Request, response, and consent models for the authorize endpoint.

pub mod authorize;
pub mod consent;

pub use authorize::{
    AuthorizeResponse, ResponseMode, ResponseType, ValidatedRequest, IDENTITY_SCOPES,
};
pub use consent::{ConsentForm, UserConsent};
