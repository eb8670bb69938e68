//! Axum extractors for authentication.

use acme_core::auth::{Identity, SessionId};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use axum_extra::extract::CookieJar;

use crate::AuthState;

/// Session id from the `Authorization: Bearer` header, falling back to the
/// session cookie.
fn session_id(parts: &Parts, cookie_name: &str) -> Option<SessionId> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| SessionId::new(token.to_string()));

    from_header.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(cookie_name)
            .map(|cookie| SessionId::new(cookie.value().to_string()))
    })
}

/// Extractor for the signed-in identity. Returns 401 if not authenticated.
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let session_id = session_id(parts, &auth_state.config.cookie_name)
            .ok_or((StatusCode::UNAUTHORIZED, "No session cookie"))?;

        let identity = auth_state
            .authenticator
            .current_identity(&session_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed")
            })?
            .ok_or((StatusCode::UNAUTHORIZED, "Session not found or expired"))?;

        Ok(CurrentUser(identity))
    }
}

/// Extractor for an optionally signed-in identity. Never rejects.
pub struct OptionalUser(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let Some(session_id) = session_id(parts, &auth_state.config.cookie_name) else {
            return Ok(OptionalUser(None));
        };

        let identity = auth_state
            .authenticator
            .current_identity(&session_id)
            .await
            .ok()
            .flatten();

        Ok(OptionalUser(identity))
    }
}
