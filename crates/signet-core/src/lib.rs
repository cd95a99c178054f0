//! # signet-core
//!
//! Core types shared by every Signet crate: the error taxonomy for the
//! authorization endpoint, the client model, the server options snapshot,
//! typed auth events, and the collaborator contracts (client store, code
//! store, consent store, token factory, localization).
//!
//! This crate deliberately contains no HTTP or persistence code. Every
//! external system the authorization core talks to is expressed as a
//! trait here and injected by the host.

pub mod client;
pub mod error;
pub mod events;
pub mod options;
pub mod stores;

pub use client::{Client, Flow};
pub use error::{AuthError, ErrorType, ProtocolError, StoreError};
pub use events::{AuthEvent, Endpoint, EventService, EventSink, NullEventSink};
pub use options::{
    AuthenticationOptions, CookieOptions, EndpointOptions, EventsOptions, LoginPageLink,
    ServerOptions,
};
pub use stores::{
    AuthorizationCode, AuthorizationCodeStore, ClientStore, Consent, ConsentStore,
    LocalizationService, PassthroughLocalization, TokenFactory, TokenRequest,
};
