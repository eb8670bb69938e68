//! Email/password account creation.

use acme_core::auth::{
    hash_password, is_valid_password, normalize_email, CredentialRecord, MIN_PASSWORD_LENGTH,
};
use acme_core::storage::RepositoryError;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::facade::Authenticator;
use crate::issuer::SessionGrant;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing Fields. Failed to Sign Up.";
pub const EMAIL_TAKEN_MESSAGE: &str = "Email already registered.";
pub const DATABASE_ERROR_MESSAGE: &str = "Database Error: Failed to Sign Up.";

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: String,
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub password: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub confirm_password: Vec<String>,
}

impl SignupErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.email.is_empty()
            && self.password.is_empty()
            && self.confirm_password.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupResult {
    /// Account created and signed in.
    Created(SessionGrant),
    Rejected {
        message: &'static str,
        errors: SignupErrors,
    },
}

/// Checks the form and returns the normalized email on success.
fn validate(form: &SignupForm) -> Result<String, SignupErrors> {
    let mut errors = SignupErrors::default();

    if form.name.trim().is_empty() {
        errors.name.push("Please enter your name.".to_string());
    }

    let email = normalize_email(&form.email);
    if email.is_none() {
        errors.email.push("Invalid email address.".to_string());
    }

    if !is_valid_password(&form.password) {
        errors.password.push(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if form.password != form.confirm_password {
        errors
            .confirm_password
            .push("Passwords do not match.".to_string());
    }

    match email {
        Some(email) if errors.is_empty() => Ok(email),
        _ => Err(errors),
    }
}

impl Authenticator {
    /// Create a credential account and sign it in.
    ///
    /// Validation, duplicate and datastore failures come back as
    /// `SignupResult::Rejected`. Hashing and session failures are `Err`.
    pub async fn sign_up(&self, form: SignupForm) -> Result<SignupResult, AuthError> {
        let email = match validate(&form) {
            Ok(email) => email,
            Err(errors) => {
                tracing::debug!(?errors, "sign-up form rejected");
                return Ok(SignupResult::Rejected {
                    message: MISSING_FIELDS_MESSAGE,
                    errors,
                });
            }
        };

        let password = form.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| acme_core::auth::AuthError::Hashing(e.to_string()))??;

        let record = CredentialRecord::new(form.name.trim(), email, password_hash);

        match self.users.create_credential(&record).await {
            Ok(()) => {}
            Err(RepositoryError::AlreadyExists { .. }) => {
                tracing::info!(email = %record.email, "sign-up with registered email");
                return Ok(SignupResult::Rejected {
                    message: EMAIL_TAKEN_MESSAGE,
                    errors: SignupErrors::default(),
                });
            }
            Err(e) => {
                tracing::error!(
                    email = %record.email,
                    error = %e,
                    "failed to create credential record"
                );
                return Ok(SignupResult::Rejected {
                    message: DATABASE_ERROR_MESSAGE,
                    errors: SignupErrors::default(),
                });
            }
        }

        tracing::info!(email = %record.email, user_id = %record.id, "account created");

        let grant = self.issuer.issue_session(record.identity(), None).await?;
        Ok(SignupResult::Created(grant))
    }
}
