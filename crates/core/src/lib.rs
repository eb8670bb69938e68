//! Functional core for the Acme dashboard.
//!
//! Pure types, validation and traits. I/O lives in `acme_auth`.

#[cfg(feature = "auth")]
pub mod auth;
pub mod serde;
#[cfg(feature = "auth")]
pub mod storage;
