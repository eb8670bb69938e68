//! In-memory credential storage for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use acme_core::auth::CredentialRecord;
use acme_core::storage::{CredentialRepository, RepositoryError, Result};

/// In-memory credential store keyed by lowercased email.
///
/// Data is not persisted and will be lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl InMemoryCredentialStore {
    /// Creates a new empty credential store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialStore {
    async fn find_credential_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&email.trim().to_lowercase()).cloned())
    }

    async fn create_credential(&self, record: &CredentialRecord) -> Result<()> {
        let key = record.email.trim().to_lowercase();
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "CredentialRecord",
                id: key,
            });
        }
        records.insert(key, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_is_case_insensitive() {
        let store = InMemoryCredentialStore::new();
        let record = CredentialRecord::new("User", "user@nextmail.com", "hash");
        store.create_credential(&record).await.unwrap();

        let found = store
            .find_credential_by_email("User@NextMail.com")
            .await
            .unwrap();
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn test_find_nonexistent() {
        let store = InMemoryCredentialStore::new();
        let found = store
            .find_credential_by_email("nobody@nextmail.com")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_email_fails() {
        let store = InMemoryCredentialStore::new();
        let first = CredentialRecord::new("User", "user@nextmail.com", "hash-1");
        let second = CredentialRecord::new("Other", "USER@nextmail.com", "hash-2");

        store.create_credential(&first).await.unwrap();
        let result = store.create_credential(&second).await;

        assert!(matches!(result, Err(RepositoryError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = InMemoryCredentialStore::new();
        let clone = store.clone();

        let record = CredentialRecord::new("User", "user@nextmail.com", "hash");
        store.create_credential(&record).await.unwrap();

        assert!(clone
            .find_credential_by_email("user@nextmail.com")
            .await
            .unwrap()
            .is_some());
    }
}
