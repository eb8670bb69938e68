//! Login page model and the protected dashboard area.

use acme_auth::OptionalUser;
use acme_core::auth::validate_return_to;
use axum::{
    extract::{Query, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// GET /login - What the sign-in page needs to render.
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginPageQuery>,
) -> Json<serde_json::Value> {
    let callback_url = query.callback_url.as_deref().and_then(validate_return_to);

    Json(json!({
        "callbackUrl": callback_url,
        "providers": state.auth.authenticator.list_providers(),
        "signIn": "/auth/login",
        "signUp": "/auth/signup",
    }))
}

/// GET /dashboard and everything below it.
///
/// Anonymous visitors are sent to the login page with the requested path as
/// the callback URL.
pub async fn dashboard(OptionalUser(identity): OptionalUser, uri: Uri) -> Response {
    let path = uri.path();

    let Some(identity) = identity else {
        let callback: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
        return Redirect::to(&format!("/login?callbackUrl={}", callback)).into_response();
    };

    Json(json!({
        "page": path,
        "user": identity,
    }))
    .into_response()
}
