//! Authentication facade.
//!
//! Drives a single sign-in attempt and turns internal outcomes into the
//! three user-facing messages. Errors outside the authentication taxonomy
//! are returned as `Err` so callers fail loudly on them.

use std::sync::Arc;

use acme_core::auth::{
    email_to_name, generate_state, is_flow_expired, AuthFlowState, AuthOutcome, Identity,
    ProviderDescriptor, SessionId, SessionRepository,
};
use acme_core::serde::deserialize_optional_string;
use acme_core::storage::CredentialRepository;
use chrono::Utc;
use openidconnect::PkceCodeChallenge;
use serde::Deserialize;
use url::Url;

use crate::config::AuthConfig;
use crate::credentials::CredentialAuthenticator;
use crate::error::AuthError;
use crate::issuer::{SessionGrant, SessionIssuer};
use crate::registry::ProviderRegistry;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials.";
pub const SOMETHING_WENT_WRONG_MESSAGE: &str = "Something went wrong.";
pub const OAUTH_FAILED_MESSAGE: &str = "Can not log in. Something went wrong.";

/// Form state of the sign-in page between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptState {
    #[default]
    Idle,
    Rejected {
        message: &'static str,
    },
    Errored {
        message: &'static str,
    },
}

impl AttemptState {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            AttemptState::Idle => None,
            AttemptState::Rejected { message } | AttemptState::Errored { message } => {
                Some(message)
            }
        }
    }
}

/// What the caller does after a credential submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Stay on the form, showing the state's message.
    Stay(AttemptState),
    /// Leave the flow: the session is issued, go to `redirect_to`.
    Navigate(SessionGrant),
}

/// Credential sign-in form.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
    #[serde(
        default,
        rename = "callbackUrl",
        alias = "callback_url",
        deserialize_with = "deserialize_optional_string"
    )]
    pub callback_url: Option<String>,
}

/// Result of starting an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthStart {
    /// Send the browser to the provider.
    Redirect(Url),
    Failed(&'static str),
}

/// Entry point for every sign-in, sign-up and sign-out operation.
///
/// Cheap to clone; all collaborators are shared and read-only.
#[derive(Clone)]
pub struct Authenticator {
    pub(crate) credentials: CredentialAuthenticator,
    pub(crate) users: Arc<dyn CredentialRepository>,
    pub(crate) sessions: Arc<dyn SessionRepository>,
    pub(crate) providers: ProviderRegistry,
    pub(crate) issuer: SessionIssuer,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn CredentialRepository>,
        sessions: Arc<dyn SessionRepository>,
        providers: ProviderRegistry,
        config: &AuthConfig,
    ) -> Self {
        Self {
            credentials: CredentialAuthenticator::new(users.clone()),
            issuer: SessionIssuer::new(
                sessions.clone(),
                config.session_ttl,
                config.default_redirect.clone(),
            ),
            users,
            sessions,
            providers,
        }
    }

    pub fn list_providers(&self) -> &[ProviderDescriptor] {
        self.providers.list_providers()
    }

    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    /// Handle a credential form submission.
    ///
    /// `previous` is only informational: every submission is evaluated on
    /// its own and no failure counter is kept.
    pub async fn submit_credentials(
        &self,
        previous: &AttemptState,
        form: CredentialsForm,
    ) -> Result<Transition, AuthError> {
        tracing::debug!(phase = "validating", ?previous, "credential sign-in attempt");

        tracing::debug!(phase = "authenticating");
        let identity = match self
            .credentials
            .authenticate(&form.email, &form.password)
            .await
        {
            AuthOutcome::Success(identity) => identity,
            AuthOutcome::InvalidCredentials => {
                return Ok(Transition::Stay(AttemptState::Rejected {
                    message: INVALID_CREDENTIALS_MESSAGE,
                }));
            }
            AuthOutcome::ProviderError(error) => {
                tracing::warn!(%error, "credential sign-in failed");
                return Ok(Transition::Stay(AttemptState::Errored {
                    message: SOMETHING_WENT_WRONG_MESSAGE,
                }));
            }
        };

        match self
            .issuer
            .issue_session(identity, form.callback_url.as_deref())
            .await
        {
            Ok(grant) => Ok(Transition::Navigate(grant)),
            Err(e) if e.is_authentication_failure() => {
                tracing::error!(error = %e, "failed to issue session");
                Ok(Transition::Stay(AttemptState::Errored {
                    message: SOMETHING_WENT_WRONG_MESSAGE,
                }))
            }
            Err(e) => Err(e),
        }
    }

    /// Start an OAuth sign-in with the provider registered as `provider_id`.
    ///
    /// Unknown provider ids are not an authentication failure and come back
    /// as `Err`.
    pub async fn submit_oauth(
        &self,
        provider_id: &str,
        return_to: Option<&str>,
    ) -> Result<OAuthStart, AuthError> {
        let client = self.providers.get(provider_id)?;
        tracing::debug!(phase = "redirecting_oauth", provider = %provider_id);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let csrf_state = generate_state();

        let flow = AuthFlowState {
            pkce_verifier: pkce_verifier.secret().to_string(),
            provider: client.provider(),
            created_at: Utc::now(),
            return_to: return_to.filter(|s| !s.is_empty()).map(String::from),
        };

        let started = async {
            self.sessions.store_auth_flow(&csrf_state, &flow).await?;
            client
                .authorization_url(&csrf_state, pkce_challenge.as_str())
                .await
        }
        .await
        .map_err(AuthError::from);

        match started {
            Ok(url) => Ok(OAuthStart::Redirect(url)),
            Err(e) if e.is_authentication_failure() => {
                tracing::error!(
                    provider = %provider_id,
                    error = %e,
                    "failed to start OAuth sign-in"
                );
                Ok(OAuthStart::Failed(OAUTH_FAILED_MESSAGE))
            }
            Err(e) => Err(e),
        }
    }

    /// Finish an OAuth sign-in: consume the flow stored under `state`,
    /// exchange `code` and issue a session to the stored return target.
    ///
    /// Unknown and stale flows are `InvalidState`.
    pub async fn complete_oauth(&self, code: &str, state: &str) -> Result<SessionGrant, AuthError> {
        let flow = self
            .sessions
            .take_auth_flow(state)
            .await?
            .ok_or(acme_core::auth::AuthError::InvalidState)?;

        if is_flow_expired(&flow, Utc::now()) {
            tracing::warn!(provider = %flow.provider, "OAuth flow expired before callback");
            return Err(acme_core::auth::AuthError::InvalidState.into());
        }

        let client = self.providers.get_kind(flow.provider)?;
        let claims = client.exchange_code(code, &flow.pkce_verifier).await?;

        let mut identity = Identity::from_claims(&claims);
        if identity.name.is_none() {
            identity.name = identity.email.as_deref().map(email_to_name);
        }

        self.issuer
            .issue_session(identity, flow.return_to.as_deref())
            .await
    }

    /// Discard the flow stored under `state` when the provider came back
    /// without a code, e.g. because the user denied consent.
    pub async fn abandon_oauth(&self, state: &str) -> Result<(), AuthError> {
        if let Some(flow) = self.sessions.take_auth_flow(state).await? {
            tracing::debug!(provider = %flow.provider, "pending OAuth flow discarded");
        }
        Ok(())
    }

    pub async fn current_identity(&self, id: &SessionId) -> Result<Option<Identity>, AuthError> {
        self.issuer.current_identity(id).await
    }

    pub async fn sign_out(&self, id: &SessionId) -> Result<(), AuthError> {
        self.issuer.sign_out(id).await
    }

    pub async fn sign_out_all(&self, user_id: &str) -> Result<(), AuthError> {
        self.issuer.sign_out_all(user_id).await
    }
}
