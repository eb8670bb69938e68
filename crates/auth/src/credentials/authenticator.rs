//! Email/password authentication.

use std::sync::Arc;

use acme_core::auth::{
    is_valid_password, normalize_email, verify_password, AuthOutcome, CredentialRecord,
};
use acme_core::storage::CredentialRepository;

/// Looks up a credential record and verifies the password against its hash.
///
/// Never produces user-facing strings and never logs the password.
#[derive(Clone)]
pub struct CredentialAuthenticator {
    users: Arc<dyn CredentialRepository>,
}

impl CredentialAuthenticator {
    pub fn new(users: Arc<dyn CredentialRepository>) -> Self {
        Self { users }
    }

    /// Authenticate an email/password pair.
    ///
    /// Malformed input is rejected before the store is touched. A store
    /// failure is a `ProviderError`, never `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthOutcome {
        let Some(email) = normalize_email(email) else {
            tracing::debug!("rejecting malformed email");
            return AuthOutcome::InvalidCredentials;
        };

        if !is_valid_password(password) {
            tracing::debug!(%email, "rejecting password below minimum length");
            return AuthOutcome::InvalidCredentials;
        }

        let record = match self.users.find_credential_by_email(&email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(%email, "invalid credentials");
                return AuthOutcome::InvalidCredentials;
            }
            Err(e) => {
                tracing::error!(%email, error = %e, "failed to fetch credential record");
                return AuthOutcome::ProviderError(e.to_string());
            }
        };

        match verify_blocking(password, &record).await {
            Ok(true) => {
                tracing::info!(%email, user_id = %record.id, "credentials verified");
                AuthOutcome::Success(record.identity())
            }
            Ok(false) => {
                tracing::info!(%email, "invalid credentials");
                AuthOutcome::InvalidCredentials
            }
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                AuthOutcome::ProviderError(e.to_string())
            }
        }
    }
}

/// Runs bcrypt on the blocking pool.
async fn verify_blocking(
    password: &str,
    record: &CredentialRecord,
) -> Result<bool, tokio::task::JoinError> {
    let password = password.to_string();
    let password_hash = record.password_hash.clone();
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InMemoryCredentialStore;
    use acme_core::auth::{hash_password, ProviderKind};
    use acme_core::storage::{RepositoryError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts lookups and can simulate an outage.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryCredentialStore,
        lookups: AtomicUsize,
        down: bool,
    }

    #[async_trait]
    impl CredentialRepository for CountingStore {
        async fn find_credential_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(RepositoryError::ConnectionFailed("connection refused".into()));
            }
            self.inner.find_credential_by_email(email).await
        }

        async fn create_credential(&self, record: &CredentialRecord) -> Result<()> {
            self.inner.create_credential(record).await
        }
    }

    async fn store_with_user(email: &str, password: &str) -> Arc<CountingStore> {
        let store = CountingStore::default();
        let record = CredentialRecord::new("Test User", email, hash_password(password).unwrap());
        store.create_credential(&record).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_correct_credentials_succeed() {
        let store = store_with_user("test@123.com", "123456").await;
        let authenticator = CredentialAuthenticator::new(store);

        match authenticator.authenticate("test@123.com", "123456").await {
            AuthOutcome::Success(identity) => {
                assert_eq!(identity.email.as_deref(), Some("test@123.com"));
                assert_eq!(identity.name.as_deref(), Some("Test User"));
                assert_eq!(identity.provider, ProviderKind::Credentials);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_email_matches_case_insensitively() {
        let store = store_with_user("test@123.com", "123456").await;
        let authenticator = CredentialAuthenticator::new(store);

        let outcome = authenticator.authenticate("TEST@123.COM", "123456").await;
        assert!(matches!(outcome, AuthOutcome::Success(_)));
    }

    #[tokio::test]
    async fn test_password_comparison_is_exact() {
        let store = store_with_user("test@123.com", "Secret1").await;
        let authenticator = CredentialAuthenticator::new(store);

        for attempt in ["secret1", "Secret1 ", "Secret", "Secret12", "SECRET1"] {
            assert_eq!(
                authenticator.authenticate("test@123.com", attempt).await,
                AuthOutcome::InvalidCredentials,
                "attempt {:?} should be rejected",
                attempt
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let store = store_with_user("test@123.com", "123456").await;
        let authenticator = CredentialAuthenticator::new(store);

        for email in ["nobody@123.com", "test@124.com", "tes@123.com"] {
            assert_eq!(
                authenticator.authenticate(email, "123456").await,
                AuthOutcome::InvalidCredentials
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_input_skips_store() {
        let store = store_with_user("test@123.com", "123456").await;
        let authenticator = CredentialAuthenticator::new(store.clone());

        assert_eq!(
            authenticator.authenticate("not-an-email", "123456").await,
            AuthOutcome::InvalidCredentials
        );
        assert_eq!(
            authenticator.authenticate("test@123.com", "12345").await,
            AuthOutcome::InvalidCredentials
        );
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_provider_error() {
        let store = Arc::new(CountingStore {
            down: true,
            ..Default::default()
        });
        let authenticator = CredentialAuthenticator::new(store);

        let outcome = authenticator.authenticate("test@123.com", "123456").await;
        assert!(matches!(outcome, AuthOutcome::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_repeated_failures_do_not_lock_out() {
        let store = store_with_user("test@123.com", "123456").await;
        let authenticator = CredentialAuthenticator::new(store);

        for _ in 0..5 {
            assert_eq!(
                authenticator.authenticate("test@123.com", "wrong-password").await,
                AuthOutcome::InvalidCredentials
            );
        }
        assert!(matches!(
            authenticator.authenticate("test@123.com", "123456").await,
            AuthOutcome::Success(_)
        ));
    }
}
