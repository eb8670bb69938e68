//! Google sign-in through OpenID Connect discovery.
//!
//! The ID token nonce is the flow's PKCE challenge, so a token is only
//! accepted by the flow that requested it.

use acme_core::auth::{AuthError, OAuthClaims, OAuthProviderClient, ProviderKind, Result};
use async_trait::async_trait;
use openidconnect::{
    core::{CoreAuthenticationFlow, CoreClient, CoreIdTokenClaims, CoreProviderMetadata},
    reqwest, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, Scope, TokenResponse,
};
use url::Url;

use crate::config::ProviderConfig;

const GOOGLE_ISSUER: &str = "https://accounts.google.com";
const SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Client built from discovered metadata: the authorization endpoint is
/// always present, token and userinfo endpoints may be absent.
type DiscoveredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

pub struct GoogleProvider {
    client: DiscoveredClient,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    /// Discover Google's metadata and build a client for `config`.
    ///
    /// # Errors
    ///
    /// `Provider` if discovery fails or the redirect URI is rejected.
    pub async fn discover(config: &ProviderConfig) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(provider_error)?;

        let issuer = IssuerUrl::new(GOOGLE_ISSUER.to_string()).map_err(provider_error)?;
        let metadata = CoreProviderMetadata::discover_async(issuer, &http_client)
            .await
            .map_err(provider_error)?;
        let redirect_uri =
            RedirectUrl::new(config.redirect_uri.to_string()).map_err(provider_error)?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
        )
        .set_redirect_uri(redirect_uri);

        tracing::debug!(redirect_uri = %config.redirect_uri, "discovered Google OIDC metadata");

        Ok(Self {
            client,
            http_client,
        })
    }
}

fn provider_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::Provider(e.to_string())
}

/// Nonce expected in the ID token of the flow holding `pkce_verifier`.
fn expected_nonce(pkce_verifier: &str) -> Nonce {
    let verifier = PkceCodeVerifier::new(pkce_verifier.to_string());
    Nonce::new(
        PkceCodeChallenge::from_code_verifier_sha256(&verifier)
            .as_str()
            .to_string(),
    )
}

/// Email from the ID token, kept only when Google marks it verified.
fn verified_email(email: Option<&str>, email_verified: Option<bool>) -> Option<String> {
    match (email, email_verified) {
        (Some(email), Some(true)) => Some(email.to_string()),
        (Some(_), _) => {
            tracing::debug!("dropping unverified Google email");
            None
        }
        (None, _) => None,
    }
}

fn claims_from_id_token(claims: &CoreIdTokenClaims) -> OAuthClaims {
    OAuthClaims {
        subject: claims.subject().to_string(),
        email: verified_email(claims.email().map(|e| e.as_str()), claims.email_verified()),
        name: claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.to_string()),
        provider: ProviderKind::Google,
    }
}

#[async_trait]
impl OAuthProviderClient for GoogleProvider {
    async fn authorization_url(&self, state: &str, pkce_challenge: &str) -> Result<Url> {
        let csrf = CsrfToken::new(state.to_string());
        let nonce = Nonce::new(pkce_challenge.to_string());

        let mut request = self.client.authorize_url(
            CoreAuthenticationFlow::AuthorizationCode,
            move || csrf,
            move || nonce,
        );
        for scope in SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (url, _, _) = request
            .add_extra_param("code_challenge", pkce_challenge.to_string())
            .add_extra_param("code_challenge_method", "S256")
            .url();

        Ok(url)
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<OAuthClaims> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        let id_token = response
            .id_token()
            .ok_or_else(|| AuthError::InvalidToken("Google returned no ID token".to_string()))?;

        let nonce = expected_nonce(pkce_verifier);
        let claims = id_token
            .claims(&self.client.id_token_verifier(), &nonce)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(claims_from_id_token(claims))
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Google
    }
}
