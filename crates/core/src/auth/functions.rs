use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};

use super::{AuthFlowState, Session, SessionId};

/// Seconds a pending OAuth flow stays valid after the redirect to the provider.
pub const AUTH_FLOW_TTL_SECS: i64 = 600;

/// Generate a cryptographically random session ID.
pub fn generate_session_id() -> SessionId {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    SessionId::new(id)
}

/// Generate a random state parameter for CSRF protection.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Check if a session has expired.
pub fn is_session_expired(session: &Session, now: DateTime<Utc>) -> bool {
    session.expires_at <= now
}

/// Check if a pending OAuth flow is too old to be completed.
pub fn is_flow_expired(flow: &AuthFlowState, now: DateTime<Utc>) -> bool {
    now - flow.created_at >= Duration::seconds(AUTH_FLOW_TTL_SECS)
}

/// Calculate session expiry from creation time and TTL.
///
/// `None` when the result does not fit in a timestamp.
pub fn calculate_expiry(created_at: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    created_at.checked_add_signed(ttl)
}

/// Pick the post-login redirect target.
///
/// A non-empty callback URL is used verbatim, otherwise `default_target`.
pub fn resolve_redirect_target(callback_url: Option<&str>, default_target: &str) -> String {
    match callback_url {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => default_target.to_string(),
    }
}

/// Extract username from email if no name provided.
pub fn email_to_name(email: &str) -> String {
    match email.split('@').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "User".to_string(),
    }
}
