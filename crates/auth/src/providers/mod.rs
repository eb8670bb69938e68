//! OAuth provider implementations.
//!
//! This module contains implementations of `OAuthProviderClient` for:
//! - Google (OpenID Connect discovery)
//! - GitHub, Twitter (X) and Facebook (plain OAuth 2.0 + profile endpoint)
//! - A mock provider for tests and local development

mod google;
mod mock;
mod oauth;

pub use google::GoogleProvider;
pub use mock::MockProvider;
pub use oauth::OAuthProvider;
