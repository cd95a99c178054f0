//! # signet-auth
//!
//! Authentication plumbing for Signet: the claims model, the AEAD cookie
//! envelope, sign-in/sign-out message cookies, authentication-cookie
//! issuance with remember-me semantics, anti-forgery tokens, and the
//! handler outcome type the API crates translate into HTTP responses.

pub mod antiforgery;
pub mod claims;
pub mod cookies;
pub mod envelope;
pub mod messages;
pub mod outcome;
pub mod signin;
pub mod user;
pub mod views;

pub use antiforgery::{AntiForgery, AntiForgeryToken};
pub use claims::{claim_types, Claim, ClaimsIdentity, LOCAL_IDENTITY_PROVIDER, LOCAL_ISSUER};
pub use cookies::{LastUsernameCookie, MessageCookies, SessionCookie};
pub use envelope::{EnvelopeError, MessageProtector};
pub use messages::{SignInMessage, SignOutMessage};
pub use outcome::{HandlerAction, HandlerOutcome, RequestContext};
pub use signin::{schemes, AuthCookieIssuer};
pub use user::{AuthenticateResult, ExternalIdentity, UserService};
pub use views::{
    ConsentViewModel, ErrorViewModel, ExternalProviderLink, LoggedOutViewModel, LoginViewModel,
    LogoutViewModel, ViewService,
};
