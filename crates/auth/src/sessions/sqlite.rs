//! SQLite session storage implementation.

use acme_core::auth::{
    AuthError, AuthFlowState, Identity, ProviderKind, Result, Session, SessionId,
    SessionRepository, AUTH_FLOW_TTL_SECS,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::SqlitePool;

type SessionRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
    String,
);

type FlowRow = (String, String, String, Option<String>);

/// SQLite-backed session storage.
///
/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that expiry
/// pruning can compare them as text.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Creates a new SQLite session store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                email TEXT,
                name TEXT,
                provider TEXT NOT NULL,
                redirect_to TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

            CREATE TABLE IF NOT EXISTS auth_flows (
                state TEXT PRIMARY KEY,
                pkce_verifier TEXT NOT NULL,
                provider TEXT NOT NULL,
                created_at TEXT NOT NULL,
                return_to TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn storage_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(e.to_string())
}

fn parse_provider(id: &str) -> Result<ProviderKind> {
    ProviderKind::from_id(id).ok_or_else(|| AuthError::Storage(format!("Unknown provider: {}", id)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(storage_error)
}

fn session_from_row(row: SessionRow) -> Result<Session> {
    let (id, user_id, email, name, provider, redirect_to, created_at, expires_at) = row;

    Ok(Session {
        id: SessionId::new(id),
        identity: Identity {
            user_id,
            email,
            name,
            provider: parse_provider(&provider)?,
        },
        redirect_to,
        created_at: parse_timestamp(&created_at)?,
        expires_at: parse_timestamp(&expires_at)?,
    })
}

fn flow_from_row(row: FlowRow) -> Result<AuthFlowState> {
    let (pkce_verifier, provider, created_at, return_to) = row;

    Ok(AuthFlowState {
        pkce_verifier,
        provider: parse_provider(&provider)?,
        created_at: parse_timestamp(&created_at)?,
        return_to,
    })
}

#[async_trait]
impl SessionRepository for SqliteSessionStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, email, name, provider, redirect_to, created_at, expires_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(&session.identity.user_id)
        .bind(&session.identity.email)
        .bind(&session.identity.name)
        .bind(session.identity.provider.id())
        .bind(&session.redirect_to)
        .bind(timestamp(session.created_at))
        .bind(timestamp(session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, email, name, provider, redirect_to, created_at, expires_at FROM sessions WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(session_from_row).transpose()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()> {
        sqlx::query("DELETE FROM auth_flows WHERE created_at <= ?")
            .bind(timestamp(Utc::now() - Duration::seconds(AUTH_FLOW_TTL_SECS)))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        sqlx::query(
            "INSERT OR REPLACE INTO auth_flows (state, pkce_verifier, provider, created_at, return_to) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(state)
        .bind(&flow.pkce_verifier)
        .bind(flow.provider.id())
        .bind(timestamp(flow.created_at))
        .bind(&flow.return_to)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        // SELECT and DELETE in one transaction so a state can't be replayed
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = sqlx::query_as::<_, FlowRow>(
            "SELECT pkce_verifier, provider, created_at, return_to FROM auth_flows WHERE state = ?",
        )
        .bind(state)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        if row.is_some() {
            sqlx::query("DELETE FROM auth_flows WHERE state = ?")
                .bind(state)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;

        row.map(flow_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteSessionStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteSessionStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn test_session(id: &str, user_id: &str) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(id.to_string()),
            identity: Identity {
                user_id: user_id.to_string(),
                email: None,
                name: Some("Octocat".to_string()),
                provider: ProviderKind::GitHub,
            },
            redirect_to: "/dashboard/invoices".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let store = test_store().await;
        let session = test_session("session-1", "github:1");
        store.create_session(&session).await.unwrap();

        let loaded = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.identity, session.identity);
        assert_eq!(loaded.redirect_to, "/dashboard/invoices");
        assert_eq!(loaded.expires_at.timestamp(), session.expires_at.timestamp());
    }

    #[tokio::test]
    async fn test_delete_user_sessions_keeps_others() {
        let store = test_store().await;
        let mine = test_session("session-1", "github:1");
        let theirs = test_session("session-2", "github:2");
        store.create_session(&mine).await.unwrap();
        store.create_session(&theirs).await.unwrap();

        store.delete_user_sessions("github:1").await.unwrap();

        assert!(store.get_session(&mine.id).await.unwrap().is_none());
        assert!(store.get_session(&theirs.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_auth_flow_is_taken_once() {
        let store = test_store().await;
        let flow = AuthFlowState {
            pkce_verifier: "verifier".to_string(),
            provider: ProviderKind::Twitter,
            created_at: Utc::now(),
            return_to: Some("/dashboard/customers".to_string()),
        };
        store.store_auth_flow("state-1", &flow).await.unwrap();

        let taken = store.take_auth_flow("state-1").await.unwrap().unwrap();
        assert_eq!(taken.provider, ProviderKind::Twitter);
        assert_eq!(taken.return_to.as_deref(), Some("/dashboard/customers"));
        assert!(store.take_auth_flow("state-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_rows_are_pruned_on_insert() {
        let store = test_store().await;

        let mut expired = test_session("session-old", "github:1");
        expired.created_at = Utc::now() - Duration::days(8);
        expired.expires_at = Utc::now() - Duration::days(1);
        store.create_session(&expired).await.unwrap();
        store
            .create_session(&test_session("session-new", "github:1"))
            .await
            .unwrap();

        let stale = AuthFlowState {
            pkce_verifier: "old".to_string(),
            provider: ProviderKind::GitHub,
            created_at: Utc::now() - Duration::days(30),
            return_to: None,
        };
        store.store_auth_flow("stale", &stale).await.unwrap();
        let fresh = AuthFlowState {
            created_at: Utc::now(),
            ..stale.clone()
        };
        store.store_auth_flow("fresh", &fresh).await.unwrap();

        let (sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let (flows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_flows")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(sessions, 1);
        assert_eq!(flows, 1);
        assert!(store.take_auth_flow("fresh").await.unwrap().is_some());
    }
}
