//! Authentication for the Acme dashboard.
//!
//! This crate provides:
//! - Email/password sign-in and sign-up backed by a credential store
//! - OAuth sign-in with GitHub, Google, Twitter (X) and Facebook
//! - Session storage (in-memory, SQLite or Redis via feature flags)
//! - The authentication facade that maps outcomes to user-facing messages
//! - Axum routes and extractors

mod config;
mod credentials;
mod error;
mod extractors;
mod facade;
mod handlers;
mod issuer;
mod providers;
mod registry;
mod sessions;
mod signup;
mod state;

pub use config::{AuthConfig, ProviderConfig, DEFAULT_REDIRECT};
#[cfg(feature = "sqlite")]
pub use credentials::SqliteCredentialStore;
pub use credentials::{CredentialAuthenticator, InMemoryCredentialStore};
pub use error::AuthError;
pub use extractors::{CurrentUser, OptionalUser};
pub use facade::{
    AttemptState, Authenticator, CredentialsForm, OAuthStart, Transition,
    INVALID_CREDENTIALS_MESSAGE, OAUTH_FAILED_MESSAGE, SOMETHING_WENT_WRONG_MESSAGE,
};
pub use handlers::auth_routes;
pub use issuer::{SessionGrant, SessionIssuer};
pub use providers::{GoogleProvider, MockProvider, OAuthProvider};
pub use registry::ProviderRegistry;
pub use sessions::InMemorySessionStore;
#[cfg(feature = "redis")]
pub use sessions::RedisSessionStore;
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionStore;
pub use signup::{
    SignupErrors, SignupForm, SignupResult, DATABASE_ERROR_MESSAGE, EMAIL_TAKEN_MESSAGE,
    MISSING_FIELDS_MESSAGE,
};
pub use state::AuthState;
