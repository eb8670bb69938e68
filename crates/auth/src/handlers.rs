//! HTTP handlers for auth routes.

use acme_core::auth::{validate_return_to, Identity, ProviderDescriptor, SessionId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::error::AuthError;
use crate::extractors::CurrentUser;
use crate::facade::{AttemptState, CredentialsForm, OAuthStart, Transition, OAUTH_FAILED_MESSAGE};
use crate::issuer::SessionGrant;
use crate::signup::{SignupForm, SignupResult, EMAIL_TAKEN_MESSAGE, MISSING_FIELDS_MESSAGE};
use crate::AuthState;

/// Query parameters for OAuth callback.
///
/// Providers send `error` instead of `code` when the user denies consent.
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Query parameters for login endpoints.
#[derive(Deserialize, Default)]
pub struct LoginQuery {
    /// URL to redirect to after successful authentication.
    pub return_to: Option<String>,
}

/// Creates the auth router with all authentication routes.
///
/// Routes:
/// - `GET /auth/providers` - List configured OAuth providers
/// - `POST /auth/login` - Email/password sign-in (form)
/// - `POST /auth/signup` - Create an email/password account (form)
/// - `GET /auth/{provider}/login` - Initiate an OAuth flow
/// - `GET /auth/{provider}/callback` - Handle the OAuth callback
/// - `POST /auth/logout` - End current session
/// - `POST /auth/logout-all` - End all sessions for current user
/// - `GET /auth/me` - Get current authenticated identity
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route("/auth/providers", get(providers))
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/{provider}/login", get(oauth_login))
        .route("/auth/{provider}/callback", get(oauth_callback))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/me", get(me))
}

async fn providers(State(state): State<AuthState>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.authenticator.list_providers().to_vec())
}

async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(mut form): Form<CredentialsForm>,
) -> Result<Response, AuthError> {
    // Validate callback URL to prevent open redirect attacks
    form.callback_url = form
        .callback_url
        .as_deref()
        .and_then(validate_return_to)
        .map(String::from);

    match state
        .authenticator
        .submit_credentials(&AttemptState::Idle, form)
        .await?
    {
        Transition::Navigate(grant) => Ok(signed_in(&state, jar, grant)),
        Transition::Stay(attempt) => {
            let status = match attempt {
                AttemptState::Rejected { .. } => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Ok((status, Json(json!({ "message": attempt.message() }))).into_response())
        }
    }
}

async fn signup(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AuthError> {
    match state.authenticator.sign_up(form).await? {
        SignupResult::Created(grant) => Ok(signed_in(&state, jar, grant)),
        SignupResult::Rejected { message, errors } => {
            let status = match message {
                MISSING_FIELDS_MESSAGE => StatusCode::UNPROCESSABLE_ENTITY,
                EMAIL_TAKEN_MESSAGE => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Ok((
                status,
                Json(json!({ "message": message, "errors": errors })),
            )
                .into_response())
        }
    }
}

async fn oauth_login(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AuthError> {
    // Validate return_to URL to prevent open redirect attacks
    let return_to = query.return_to.as_deref().and_then(validate_return_to);

    match state.authenticator.submit_oauth(&provider, return_to).await? {
        OAuthStart::Redirect(url) => Ok(Redirect::to(url.as_str()).into_response()),
        OAuthStart::Failed(message) => {
            Ok((StatusCode::BAD_GATEWAY, Json(json!({ "message": message }))).into_response())
        }
    }
}

async fn oauth_callback(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    let (code, csrf_state) = match (params.code, params.state) {
        (Some(code), Some(csrf_state)) if params.error.is_none() => (code, csrf_state),
        (_, csrf_state) => {
            if let Some(csrf_state) = csrf_state {
                state.authenticator.abandon_oauth(&csrf_state).await?;
            }
            tracing::warn!(
                %provider,
                error = params.error.as_deref().unwrap_or("missing code or state"),
                "OAuth provider returned without a code"
            );
            return Ok(oauth_failed());
        }
    };

    match state.authenticator.complete_oauth(&code, &csrf_state).await {
        Ok(grant) => Ok(signed_in(&state, jar, grant)),
        Err(e) if e.is_authentication_failure() => {
            tracing::warn!(%provider, error = %e, "OAuth callback failed");
            Ok(oauth_failed())
        }
        Err(e) => Err(e),
    }
}

fn oauth_failed() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": OAUTH_FAILED_MESSAGE })),
    )
        .into_response()
}

async fn logout(
    State(state): State<AuthState>,
    CurrentUser(_identity): CurrentUser,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    if let Some(cookie) = jar.get(&state.config.cookie_name) {
        let session_id = SessionId::new(cookie.value().to_string());
        state.authenticator.sign_out(&session_id).await?;
    }

    let jar = jar.remove(Cookie::from(state.config.cookie_name.clone()));
    Ok(jar)
}

async fn logout_all(
    State(state): State<AuthState>,
    CurrentUser(identity): CurrentUser,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    state.authenticator.sign_out_all(&identity.user_id).await?;

    let jar = jar.remove(Cookie::from(state.config.cookie_name.clone()));
    Ok(jar)
}

async fn me(CurrentUser(identity): CurrentUser) -> Json<Identity> {
    Json(identity)
}

/// Set the session cookie and redirect to the grant's target.
fn signed_in(state: &AuthState, jar: CookieJar, grant: SessionGrant) -> Response {
    let cookie = Cookie::build((
        state.config.cookie_name.clone(),
        grant.session.id.to_string(),
    ))
    .path("/")
    .http_only(true)
    .secure(state.config.cookie_secure)
    .same_site(SameSite::Lax)
    .max_age(time::Duration::seconds(
        state.config.session_ttl.as_secs() as i64,
    ))
    .build();

    (jar.add(cookie), Redirect::to(&grant.redirect_to)).into_response()
}
