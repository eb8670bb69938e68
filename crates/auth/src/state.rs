//! Application state for auth.

use std::sync::Arc;

use acme_core::auth::SessionRepository;
use acme_core::storage::CredentialRepository;
use axum::extract::FromRef;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::facade::Authenticator;
use crate::registry::ProviderRegistry;

/// Shared state for auth handlers.
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Authenticator,
    pub config: AuthConfig,
}

impl AuthState {
    /// Creates the state with a client for every provider enabled in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if provider initialization fails (e.g., OIDC discovery).
    pub async fn new(
        users: Arc<dyn CredentialRepository>,
        sessions: Arc<dyn SessionRepository>,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let providers = ProviderRegistry::from_config(&config).await?;
        Ok(Self::with_providers(users, sessions, providers, config))
    }

    /// Creates the state around an already built provider registry.
    pub fn with_providers(
        users: Arc<dyn CredentialRepository>,
        sessions: Arc<dyn SessionRepository>,
        providers: ProviderRegistry,
        config: AuthConfig,
    ) -> Self {
        let authenticator = Authenticator::new(users, sessions, providers, &config);
        Self {
            authenticator,
            config,
        }
    }
}

/// Allows AuthState to be extracted from a parent state.
impl<S> FromRef<S> for AuthState
where
    S: AsRef<AuthState>,
{
    fn from_ref(state: &S) -> Self {
        state.as_ref().clone()
    }
}
