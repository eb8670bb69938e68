use async_trait::async_trait;

use crate::auth::CredentialRecord;

use super::Result;

/// Gateway to the credential records held by the datastore.
///
/// Implementations must match emails case-insensitively.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Gets a credential record by email address.
    async fn find_credential_by_email(&self, email: &str) -> Result<Option<CredentialRecord>>;

    /// Creates a new credential record. Fails with `AlreadyExists` when the
    /// email is taken.
    async fn create_credential(&self, record: &CredentialRecord) -> Result<()>;
}
