//! Demo account seeding.

use acme_core::auth::{hash_password, CredentialRecord};
use acme_core::storage::{CredentialRepository, RepositoryError};
use anyhow::Result;

pub const DEMO_NAME: &str = "User";
pub const DEMO_EMAIL: &str = "user@nextmail.com";
pub const DEMO_PASSWORD: &str = "123456";

/// Create the demo credential record unless it already exists.
pub async fn seed_demo_user(users: &dyn CredentialRepository) -> Result<()> {
    let record = CredentialRecord::new(DEMO_NAME, DEMO_EMAIL, hash_password(DEMO_PASSWORD)?);

    match users.create_credential(&record).await {
        Ok(()) => {
            tracing::info!(email = DEMO_EMAIL, "demo user created");
            Ok(())
        }
        Err(RepositoryError::AlreadyExists { .. }) => {
            tracing::debug!(email = DEMO_EMAIL, "demo user already present");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
