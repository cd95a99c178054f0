//! HTTP handlers for the interactive authentication flows.

pub mod external;
pub mod login;
pub mod logout;

pub use external::{callback_handler, external_handler, resume_handler};
pub use login::{login_get_handler, login_post_handler};
pub use logout::{logout_get_handler, logout_post_handler};
