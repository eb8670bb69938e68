//! In-memory session storage for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use acme_core::auth::{
    is_flow_expired, is_session_expired, AuthFlowState, Result, Session, SessionId,
    SessionRepository,
};

/// In-memory session store for development and testing.
///
/// Stores sessions and auth flow state in HashMaps wrapped in `Arc<RwLock<_>>`.
/// Expired entries are pruned on insert. Data is not persisted and will be
/// lost when the store is dropped.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    auth_flows: Arc<RwLock<HashMap<String, AuthFlowState>>>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// Creates a new empty in-memory session store.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            auth_flows: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !is_session_expired(s, now));
        sessions.insert(session.id.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id.as_str()).cloned())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id.as_str());
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.user_id() != user_id);
        Ok(())
    }

    async fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()> {
        let now = Utc::now();
        let mut flows = self.auth_flows.write().await;
        flows.retain(|_, f| !is_flow_expired(f, now));
        flows.insert(state.to_string(), flow.clone());
        Ok(())
    }

    async fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        let mut flows = self.auth_flows.write().await;
        Ok(flows.remove(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acme_core::auth::{Identity, ProviderKind};

    fn create_test_session(id: &str, user_id: &str) -> Session {
        Session {
            id: SessionId::new(id.to_string()),
            identity: Identity {
                user_id: user_id.to_string(),
                email: Some("user@nextmail.com".to_string()),
                name: Some("User".to_string()),
                provider: ProviderKind::Credentials,
            },
            redirect_to: "/dashboard".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(24),
        }
    }

    fn create_test_auth_flow(verifier: &str, provider: ProviderKind) -> AuthFlowState {
        AuthFlowState {
            pkce_verifier: verifier.to_string(),
            provider,
            created_at: Utc::now(),
            return_to: None,
        }
    }

    #[tokio::test]
    async fn test_session_create_and_get() {
        let store = InMemorySessionStore::new();
        let session = create_test_session("session-1", "user-123");

        store.create_session(&session).await.unwrap();

        let retrieved = store
            .get_session(&SessionId::new("session-1".to_string()))
            .await
            .unwrap();
        assert_eq!(retrieved, Some(session));
    }

    #[tokio::test]
    async fn test_session_get_nonexistent() {
        let store = InMemorySessionStore::new();

        let result = store
            .get_session(&SessionId::new("nonexistent".to_string()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_session_delete() {
        let store = InMemorySessionStore::new();
        let session = create_test_session("session-1", "user-123");

        store.create_session(&session).await.unwrap();
        store.delete_session(&session.id).await.unwrap();

        assert!(store.get_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_sessions() {
        let store = InMemorySessionStore::new();

        let session1 = create_test_session("session-1", "user-123");
        let session2 = create_test_session("session-2", "user-123");
        let session3 = create_test_session("session-3", "user-456");

        store.create_session(&session1).await.unwrap();
        store.create_session(&session2).await.unwrap();
        store.create_session(&session3).await.unwrap();

        store.delete_user_sessions("user-123").await.unwrap();

        assert!(store.get_session(&session1.id).await.unwrap().is_none());
        assert!(store.get_session(&session2.id).await.unwrap().is_none());
        assert!(store.get_session(&session3.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_auth_flow_is_taken_once() {
        let store = InMemorySessionStore::new();
        let flow = create_test_auth_flow("test-verifier", ProviderKind::GitHub);

        store.store_auth_flow("state-abc", &flow).await.unwrap();

        let retrieved = store.take_auth_flow("state-abc").await.unwrap().unwrap();
        assert_eq!(retrieved.pkce_verifier, "test-verifier");
        assert_eq!(retrieved.provider, ProviderKind::GitHub);

        assert!(store.take_auth_flow("state-abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auth_flow_overwrite() {
        let store = InMemorySessionStore::new();

        let flow1 = create_test_auth_flow("verifier-1", ProviderKind::Google);
        let flow2 = create_test_auth_flow("verifier-2", ProviderKind::Facebook);

        store.store_auth_flow("same-state", &flow1).await.unwrap();
        store.store_auth_flow("same-state", &flow2).await.unwrap();

        let retrieved = store.take_auth_flow("same-state").await.unwrap().unwrap();
        assert_eq!(retrieved.pkce_verifier, "verifier-2");
        assert_eq!(retrieved.provider, ProviderKind::Facebook);
    }

    #[tokio::test]
    async fn test_stale_auth_flows_are_pruned_on_insert() {
        let store = InMemorySessionStore::new();
        let mut stale = create_test_auth_flow("old", ProviderKind::GitHub);
        stale.created_at = Utc::now() - chrono::Duration::days(30);
        store.store_auth_flow("stale", &stale).await.unwrap();

        let fresh = create_test_auth_flow("new", ProviderKind::GitHub);
        store.store_auth_flow("fresh", &fresh).await.unwrap();

        let flows = store.auth_flows.read().await;
        assert_eq!(flows.len(), 1);
        assert!(flows.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_expired_sessions_are_pruned_on_insert() {
        let store = InMemorySessionStore::new();
        let mut expired = create_test_session("session-old", "user-123");
        expired.expires_at = Utc::now() - chrono::Duration::hours(1);
        store.create_session(&expired).await.unwrap();

        let live = create_test_session("session-new", "user-123");
        store.create_session(&live).await.unwrap();

        assert!(store.get_session(&expired.id).await.unwrap().is_none());
        assert!(store.get_session(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = InMemorySessionStore::new();
        let clone = store.clone();

        let session = create_test_session("session-1", "user-123");
        store.create_session(&session).await.unwrap();

        assert!(clone.get_session(&session.id).await.unwrap().is_some());
    }
}
