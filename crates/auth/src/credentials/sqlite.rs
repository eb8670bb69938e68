//! SQLite credential storage implementation.

use acme_core::auth::CredentialRecord;
use acme_core::storage::{CredentialRepository, RepositoryError, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

/// SQLite-backed credential storage (`users` table).
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    /// Creates a new SQLite credential store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

fn map_sqlx_error(error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::ConnectionFailed(error.to_string())
        }
        other => RepositoryError::QueryFailed(other.to_string()),
    }
}

#[async_trait]
impl CredentialRepository for SqliteCredentialStore {
    async fn find_credential_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT id, name, email, password FROM users WHERE email = ? COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some((id, name, email, password_hash)) => Ok(Some(CredentialRecord {
                id: Uuid::parse_str(&id)
                    .map_err(|e| RepositoryError::InvalidData(format!("users.id: {}", e)))?,
                email,
                name,
                password_hash,
            })),
            None => Ok(None),
        }
    }

    async fn create_credential(&self, record: &CredentialRecord) -> Result<()> {
        let email = record.email.trim().to_lowercase();

        sqlx::query("INSERT INTO users (id, name, email, password) VALUES (?, ?, ?, ?)")
            .bind(record.id.to_string())
            .bind(&record.name)
            .bind(&email)
            .bind(&record.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let unique_violation = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if unique_violation {
                    RepositoryError::AlreadyExists {
                        entity_type: "CredentialRecord",
                        id: email.clone(),
                    }
                } else {
                    map_sqlx_error(e)
                }
            })?;

        Ok(())
    }
}
