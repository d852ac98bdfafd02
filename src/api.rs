//! Typed helpers for the backend endpoints the session layer depends on.

pub mod auth;
pub mod emergency;

pub use auth::*;
pub use emergency::*;
