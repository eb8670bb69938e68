use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Auth errors for the acme_auth crate.
///
/// This wraps the core `AuthError` and adds crate-specific error variants
/// for I/O operations that can't be in the functional core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (validation, token parsing, storage, etc.)
    #[error(transparent)]
    Core(#[from] acme_core::auth::AuthError),

    /// HTTP client error while talking to an identity provider
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider not configured
    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),
}

impl AuthError {
    /// Whether the error belongs to the authentication taxonomy.
    ///
    /// The facade turns these into user-facing messages. Everything else is
    /// propagated to the caller.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, AuthError::Core(_) | AuthError::Http(_))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use acme_core::auth::AuthError as CoreError;

        let (status, message) = match &self {
            AuthError::Core(core_err) => match core_err {
                CoreError::InvalidState => (StatusCode::BAD_REQUEST, self.to_string()),
                CoreError::SessionNotFound | CoreError::SessionExpired => {
                    (StatusCode::UNAUTHORIZED, self.to_string())
                }
                CoreError::InvalidToken(_) | CoreError::MissingClaim(_) => {
                    (StatusCode::UNAUTHORIZED, self.to_string())
                }
                CoreError::CodeExchange(_)
                | CoreError::Storage(_)
                | CoreError::Provider(_)
                | CoreError::Hashing(_) => {
                    tracing::error!(error = %self, "Auth error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            AuthError::Http(_) => {
                tracing::error!(error = %self, "HTTP error during auth");
                (
                    StatusCode::BAD_GATEWAY,
                    "Authentication provider error".to_string(),
                )
            }
            AuthError::Config(_) => {
                tracing::error!(error = %self, "Config error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AuthError::ProviderNotConfigured(provider) => (
                StatusCode::NOT_FOUND,
                format!("Authentication provider '{}' is not configured", provider),
            ),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acme_core::auth::AuthError as CoreError;

    #[test]
    fn core_and_http_errors_are_authentication_failures() {
        assert!(AuthError::Core(CoreError::Storage("down".into())).is_authentication_failure());
        assert!(AuthError::Core(CoreError::InvalidState).is_authentication_failure());
        assert!(AuthError::Http("timeout".into()).is_authentication_failure());
    }

    #[test]
    fn config_errors_are_not_authentication_failures() {
        assert!(!AuthError::Config("bad url".into()).is_authentication_failure());
        assert!(!AuthError::ProviderNotConfigured("apple".into()).is_authentication_failure());
    }

    #[test]
    fn storage_error_response_hides_detail() {
        let response =
            AuthError::Core(CoreError::Storage("password column missing".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_provider_maps_to_not_found() {
        let response = AuthError::ProviderNotConfigured("apple".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_state_maps_to_bad_request() {
        let response = AuthError::Core(CoreError::InvalidState).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
