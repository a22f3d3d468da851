//! Bearer credentials, redacted secrets, and token expiry inspection.

pub mod credential;
pub mod inspector;
pub mod secret;

pub use credential::*;
pub use inspector::*;
pub use secret::*;
