//! Session issuance after a successful sign-in.

use std::sync::Arc;
use std::time::Duration;

use acme_core::auth::{
    calculate_expiry, generate_session_id, is_session_expired, resolve_redirect_target, Identity,
    Session, SessionId, SessionRepository,
};
use chrono::Utc;

use crate::error::AuthError;

/// A freshly persisted session plus where to send the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub session: Session,
    pub redirect_to: String,
}

/// Creates, looks up and ends sessions.
#[derive(Clone)]
pub struct SessionIssuer {
    sessions: Arc<dyn SessionRepository>,
    ttl: Duration,
    default_redirect: String,
}

impl SessionIssuer {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        ttl: Duration,
        default_redirect: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            ttl,
            default_redirect: default_redirect.into(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn default_redirect(&self) -> &str {
        &self.default_redirect
    }

    /// Persist a session for `identity`.
    ///
    /// A non-empty `callback_url` is used verbatim as the redirect target;
    /// otherwise the default target is used. Callers that accept the callback
    /// from a client are expected to validate it first.
    pub async fn issue_session(
        &self,
        identity: Identity,
        callback_url: Option<&str>,
    ) -> Result<SessionGrant, AuthError> {
        let redirect_to = resolve_redirect_target(callback_url, &self.default_redirect);

        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| calculate_expiry(now, ttl))
            .ok_or_else(|| {
                AuthError::Config(format!("session TTL of {:?} is out of range", self.ttl))
            })?;
        let session = Session {
            id: generate_session_id(),
            identity,
            redirect_to: redirect_to.clone(),
            created_at: now,
            expires_at,
        };

        self.sessions.create_session(&session).await?;

        tracing::info!(
            user_id = %session.user_id(),
            provider = %session.identity.provider,
            %redirect_to,
            "session issued"
        );

        Ok(SessionGrant {
            session,
            redirect_to,
        })
    }

    /// Identity behind a live session, `None` for unknown or expired ids.
    pub async fn current_identity(&self, id: &SessionId) -> Result<Option<Identity>, AuthError> {
        let Some(session) = self.sessions.get_session(id).await? else {
            return Ok(None);
        };

        if is_session_expired(&session, Utc::now()) {
            tracing::debug!(user_id = %session.user_id(), "session expired");
            return Ok(None);
        }

        Ok(Some(session.identity))
    }

    /// End a single session.
    pub async fn sign_out(&self, id: &SessionId) -> Result<(), AuthError> {
        self.sessions.delete_session(id).await?;
        tracing::debug!("session deleted");
        Ok(())
    }

    /// End every session of `user_id`.
    pub async fn sign_out_all(&self, user_id: &str) -> Result<(), AuthError> {
        self.sessions.delete_user_sessions(user_id).await?;
        tracing::info!(%user_id, "all sessions deleted");
        Ok(())
    }
}
