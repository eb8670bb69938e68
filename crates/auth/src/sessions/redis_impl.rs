//! Redis session storage.
//!
//! Key layout:
//! - `acme:session:{id}` - JSON session, expiring together with the session
//! - `acme:user_sessions:{user_id}` - set of session ids, for sign-out everywhere
//! - `acme:auth_flow:{state}` - JSON pending OAuth flow, expiring after
//!   [`AUTH_FLOW_TTL_SECS`]

use acme_core::auth::{
    is_flow_expired, AuthError, AuthFlowState, Result, Session, SessionId, SessionRepository,
    AUTH_FLOW_TTL_SECS,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fred::prelude::*;
use serde::{de::DeserializeOwned, Serialize};

const KEY_PREFIX: &str = "acme";

fn session_key(id: &SessionId) -> String {
    format!("{KEY_PREFIX}:session:{id}")
}

fn user_sessions_key(user_id: &str) -> String {
    format!("{KEY_PREFIX}:user_sessions:{user_id}")
}

fn flow_key(state: &str) -> String {
    format!("{KEY_PREFIX}:auth_flow:{state}")
}

/// Seconds until `session` expires, `None` once it has.
fn remaining_secs(session: &Session, now: DateTime<Utc>) -> Option<i64> {
    let secs = (session.expires_at - now).num_seconds();
    (secs > 0).then_some(secs)
}

fn storage_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(storage_error)
}

fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(storage_error)
}

/// Decode a stored flow, `None` once it is past its TTL.
fn live_flow(json: &str, now: DateTime<Utc>) -> Result<Option<AuthFlowState>> {
    let flow: AuthFlowState = decode(json)?;
    if is_flow_expired(&flow, now) {
        tracing::debug!(provider = %flow.provider, "ignoring stale OAuth flow");
        return Ok(None);
    }
    Ok(Some(flow))
}

/// Redis-backed session storage.
pub struct RedisSessionStore {
    pool: Pool,
}

impl RedisSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for RedisSessionStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let Some(ttl_secs) = remaining_secs(session, Utc::now()) else {
            tracing::debug!(user_id = %session.user_id(), "not storing an already expired session");
            return Ok(());
        };

        self.pool
            .set::<(), _, _>(
                session_key(&session.id),
                encode(session)?,
                Some(Expiration::EX(ttl_secs)),
                None,
                false,
            )
            .await
            .map_err(storage_error)?;

        self.pool
            .sadd::<(), _, _>(user_sessions_key(session.user_id()), session.id.as_str())
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let value: Option<String> = self
            .pool
            .get(session_key(id))
            .await
            .map_err(storage_error)?;

        value.as_deref().map(decode::<Session>).transpose()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let value: Option<String> = self
            .pool
            .getdel(session_key(id))
            .await
            .map_err(storage_error)?;

        let Some(json) = value else {
            return Ok(());
        };

        let session: Session = decode(&json)?;
        self.pool
            .srem::<(), _, _>(user_sessions_key(session.user_id()), id.as_str())
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        let user_key = user_sessions_key(user_id);

        let ids: Vec<String> = self
            .pool
            .smembers(&user_key)
            .await
            .map_err(storage_error)?;

        let mut keys: Vec<String> = ids
            .into_iter()
            .map(|id| session_key(&SessionId::new(id)))
            .collect();
        keys.push(user_key);

        self.pool.del::<(), _>(keys).await.map_err(storage_error)?;

        Ok(())
    }

    async fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()> {
        self.pool
            .set::<(), _, _>(
                flow_key(state),
                encode(flow)?,
                Some(Expiration::EX(AUTH_FLOW_TTL_SECS)),
                None,
                false,
            )
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        let value: Option<String> = self
            .pool
            .getdel(flow_key(state))
            .await
            .map_err(storage_error)?;

        match value {
            Some(json) => live_flow(&json, Utc::now()),
            None => Ok(None),
        }
    }
}
