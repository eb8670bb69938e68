//! Credential sign-in: the user store gateway implementations and the
//! authenticator that sits on top of them.
//!
//! Provides `CredentialRepository` implementations for:
//! - In-memory (always available)
//! - SQLite (with `sqlite` feature)

mod authenticator;
mod inmemory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use authenticator::CredentialAuthenticator;
pub use inmemory::InMemoryCredentialStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCredentialStore;
