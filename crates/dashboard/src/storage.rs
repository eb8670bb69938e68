//! Storage backend wiring.
//!
//! - default: in-memory credentials and sessions
//! - `sqlite`: credentials and sessions in SQLite
//! - `redis`: sessions in Redis (credentials stay in SQLite or memory)

use std::sync::Arc;

use acme_core::auth::SessionRepository;
use acme_core::storage::CredentialRepository;
use anyhow::Result;
use clap::Args;

#[cfg(not(feature = "sqlite"))]
use acme_auth::InMemoryCredentialStore;
#[cfg(not(any(feature = "sqlite", feature = "redis")))]
use acme_auth::InMemorySessionStore;
#[cfg(feature = "redis")]
use acme_auth::RedisSessionStore;
#[cfg(feature = "sqlite")]
use acme_auth::SqliteCredentialStore;
#[cfg(all(feature = "sqlite", not(feature = "redis")))]
use acme_auth::SqliteSessionStore;

/// Storage options, present according to the enabled features.
#[derive(Args, Debug)]
pub struct StorageArgs {
    /// SQLite database URL
    #[cfg(feature = "sqlite")]
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://acme.db?mode=rwc")]
    pub database_url: String,

    /// Redis connection URL for sessions
    #[cfg(feature = "redis")]
    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    pub redis_url: String,
}

pub struct Stores {
    pub users: Arc<dyn CredentialRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

#[cfg(feature = "sqlite")]
pub async fn open(args: &StorageArgs) -> Result<Stores> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&args.database_url)
        .await?;

    let users = SqliteCredentialStore::new(pool.clone());
    users.migrate().await?;
    tracing::info!(database_url = %args.database_url, "using SQLite credential store");

    #[cfg(feature = "redis")]
    let sessions = redis_sessions(&args.redis_url).await?;

    #[cfg(not(feature = "redis"))]
    let sessions: Arc<dyn SessionRepository> = {
        let store = SqliteSessionStore::new(pool);
        store.migrate().await?;
        Arc::new(store)
    };

    Ok(Stores {
        users: Arc::new(users),
        sessions,
    })
}

#[cfg(not(feature = "sqlite"))]
#[cfg_attr(not(feature = "redis"), allow(unused_variables))]
pub async fn open(args: &StorageArgs) -> Result<Stores> {
    tracing::warn!("using in-memory credential store, accounts are lost on restart");

    #[cfg(feature = "redis")]
    let sessions = redis_sessions(&args.redis_url).await?;

    #[cfg(not(feature = "redis"))]
    let sessions: Arc<dyn SessionRepository> = Arc::new(InMemorySessionStore::new());

    Ok(Stores {
        users: Arc::new(InMemoryCredentialStore::new()),
        sessions,
    })
}

#[cfg(feature = "redis")]
async fn redis_sessions(url: &str) -> Result<Arc<dyn SessionRepository>> {
    use fred::prelude::{Builder, Config};

    let config = Config::from_url(url)?;
    let pool = Builder::from_config(config).build_pool(4)?;
    pool.init().await?;

    tracing::info!(redis_url = %url, "using Redis session store");
    Ok(Arc::new(RedisSessionStore::new(pool)))
}
