use std::time::Duration;

use acme_auth::auth_routes;
use axum::{http::StatusCode, routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    handlers::{
        health::livez,
        pages::{dashboard, login_page},
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let auth = auth_routes().with_state(state.auth.clone());

    Router::new()
        .route("/livez", get(livez))
        .route("/login", get(login_page))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/{*section}", get(dashboard))
        .with_state(state)
        .merge(auth)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
}
