//! Session credential models: redacted secrets, storage keys, and the access/refresh pair.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
