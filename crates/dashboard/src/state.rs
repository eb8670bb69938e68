//! Shared application state.

use acme_auth::AuthState;

/// Shared application state.
///
/// Wraps the auth state so auth extractors work on dashboard routes.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
}

impl AppState {
    pub fn new(auth: AuthState) -> Self {
        Self { auth }
    }

    /// In-memory stores and no OAuth providers.
    #[cfg(test)]
    pub fn in_memory(
        config: acme_auth::AuthConfig,
    ) -> (Self, std::sync::Arc<acme_auth::InMemoryCredentialStore>) {
        use std::sync::Arc;

        use acme_auth::{InMemoryCredentialStore, InMemorySessionStore, ProviderRegistry};

        let users = Arc::new(InMemoryCredentialStore::new());
        let auth = AuthState::with_providers(
            users.clone(),
            Arc::new(InMemorySessionStore::new()),
            ProviderRegistry::default(),
            config,
        );
        (Self::new(auth), users)
    }
}

impl AsRef<AuthState> for AppState {
    fn as_ref(&self) -> &AuthState {
        &self.auth
    }
}
