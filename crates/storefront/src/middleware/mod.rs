//! Request middleware: session layer and shopper identity extraction.

pub mod auth;
pub mod session;

pub use auth::{MaybeShopper, RequireShopper};
pub use session::create_session_layer;
