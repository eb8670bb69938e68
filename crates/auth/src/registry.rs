//! Registry of the configured OAuth providers.

use std::sync::Arc;

use acme_core::auth::{OAuthProviderClient, ProviderDescriptor, ProviderKind};
use url::Url;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::providers::{GoogleProvider, MockProvider, OAuthProvider};

/// Fixed, ordered set of OAuth providers built once at startup.
///
/// Never contains the credentials provider and never contains two entries
/// with the same id. There is no mutation API.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    descriptors: Arc<[ProviderDescriptor]>,
    clients: Arc<[Arc<dyn OAuthProviderClient>]>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptors.iter()).finish()
    }
}

impl ProviderRegistry {
    /// Builds a registry from provider clients.
    ///
    /// Entries keep the static provider order. Clients reporting the
    /// credentials provider are dropped, and only the first client of each
    /// kind is kept.
    pub fn new(clients: impl IntoIterator<Item = Arc<dyn OAuthProviderClient>>) -> Self {
        let mut clients: Vec<Arc<dyn OAuthProviderClient>> = clients.into_iter().collect();
        let mut descriptors = Vec::new();
        let mut registered = Vec::new();

        for kind in ProviderKind::ALL {
            if kind.is_credentials() {
                continue;
            }

            let mut matching = clients.iter().filter(|c| c.provider() == kind);
            if let Some(client) = matching.next() {
                if matching.next().is_some() {
                    tracing::warn!(provider = %kind, "duplicate provider client ignored");
                }
                descriptors.push(kind.descriptor());
                registered.push(client.clone());
            }
        }

        clients.retain(|c| c.provider().is_credentials());
        if !clients.is_empty() {
            tracing::warn!("credentials provider cannot be registered as an OAuth provider");
        }

        Self {
            descriptors: descriptors.into(),
            clients: registered.into(),
        }
    }

    /// Creates the clients for every provider enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider client cannot be initialized (e.g.
    /// Google discovery fails).
    pub async fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let mut clients: Vec<Arc<dyn OAuthProviderClient>> = Vec::new();

        for kind in ProviderKind::ALL {
            let Some(provider_config) = config.provider(kind) else {
                continue;
            };

            let client: Arc<dyn OAuthProviderClient> = match kind {
                ProviderKind::Google => Arc::new(GoogleProvider::discover(provider_config).await?),
                _ => Arc::new(OAuthProvider::new(kind, provider_config)?),
            };

            tracing::info!(provider = %kind, "OAuth provider enabled");
            clients.push(client);
        }

        Ok(Self::new(clients))
    }

    /// Mock clients for every provider enabled in `config`, all pointing at
    /// the mock IdP at `idp_url`.
    pub fn mock(config: &AuthConfig, idp_url: &Url) -> Result<Self, AuthError> {
        let mut clients: Vec<Arc<dyn OAuthProviderClient>> = Vec::new();

        for kind in ProviderKind::ALL {
            if config.provider(kind).is_some() {
                clients.push(Arc::new(MockProvider::new(
                    kind,
                    idp_url.clone(),
                    config.callback_url(kind)?,
                )));
            }
        }

        Ok(Self::new(clients))
    }

    /// Public list of providers, in display order.
    pub fn list_providers(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Looks up a provider client by its routing key.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotConfigured` for unknown or disabled ids.
    pub fn get(&self, id: &str) -> Result<&dyn OAuthProviderClient, AuthError> {
        self.descriptors
            .iter()
            .position(|d| d.id == id)
            .map(|i| self.clients[i].as_ref())
            .ok_or_else(|| AuthError::ProviderNotConfigured(id.to_string()))
    }

    /// Looks up a provider client by kind.
    pub fn get_kind(&self, kind: ProviderKind) -> Result<&dyn OAuthProviderClient, AuthError> {
        self.clients
            .iter()
            .find(|c| c.provider() == kind)
            .map(|c| c.as_ref())
            .ok_or_else(|| AuthError::ProviderNotConfigured(kind.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn mock(kind: ProviderKind) -> Arc<dyn OAuthProviderClient> {
        Arc::new(MockProvider::new(
            kind,
            Url::parse("http://localhost:3001").unwrap(),
            Url::parse("http://localhost:3000/auth/callback").unwrap(),
        ))
    }

    fn ids(registry: &ProviderRegistry) -> Vec<String> {
        registry
            .list_providers()
            .iter()
            .map(|d| d.id.clone())
            .collect()
    }

    #[test]
    fn test_list_keeps_static_order() {
        let registry = ProviderRegistry::new([
            mock(ProviderKind::Facebook),
            mock(ProviderKind::GitHub),
            mock(ProviderKind::Twitter),
            mock(ProviderKind::Google),
        ]);

        assert_eq!(ids(&registry), ["github", "google", "twitter", "facebook"]);
        assert_eq!(registry.list_providers()[0].name, "GitHub");
    }

    #[test]
    fn test_credentials_provider_is_excluded() {
        let registry = ProviderRegistry::new([
            mock(ProviderKind::Credentials),
            mock(ProviderKind::GitHub),
        ]);

        assert_eq!(ids(&registry), ["github"]);
        assert!(registry.get("credentials").is_err());
    }

    #[test]
    fn test_duplicate_ids_are_collapsed() {
        let registry = ProviderRegistry::new([
            mock(ProviderKind::Google),
            mock(ProviderKind::Google),
            mock(ProviderKind::GitHub),
        ]);

        let ids = ids(&registry);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(ids, ["github", "google"]);
    }

    #[test]
    fn test_get_dispatches_by_id() {
        let registry =
            ProviderRegistry::new([mock(ProviderKind::GitHub), mock(ProviderKind::Twitter)]);

        assert_eq!(
            registry.get("twitter").unwrap().provider(),
            ProviderKind::Twitter
        );
        assert!(matches!(
            registry.get("apple"),
            Err(AuthError::ProviderNotConfigured(id)) if id == "apple"
        ));
    }

    #[test]
    fn test_mock_registry_follows_config() {
        let config = AuthConfig::from_lookup(|key| match key {
            "GITHUB_CLIENT_ID" | "GITHUB_CLIENT_SECRET" => Some("x".to_string()),
            "FACEBOOK_CLIENT_ID" | "FACEBOOK_CLIENT_SECRET" => Some("y".to_string()),
            _ => None,
        })
        .unwrap();

        let registry =
            ProviderRegistry::mock(&config, &Url::parse("http://localhost:3001").unwrap())
                .unwrap();

        assert_eq!(ids(&registry), ["github", "facebook"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new(Vec::new());
        assert!(registry.is_empty());
        assert!(registry.list_providers().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_builds_plain_oauth_clients() {
        let config = AuthConfig::from_lookup(|key| match key {
            "TWITTER_CLIENT_ID" | "TWITTER_CLIENT_SECRET" => Some("x".to_string()),
            _ => None,
        })
        .unwrap();

        let registry = ProviderRegistry::from_config(&config).await.unwrap();
        assert_eq!(ids(&registry), ["twitter"]);
    }
}
