//! OAuth 2.0 providers without OpenID Connect: GitHub, Twitter (X) and
//! Facebook.
//!
//! These providers only hand out an access token, so the identity comes from
//! a follow-up call to the provider's profile endpoint.

use acme_core::auth::{AuthError, OAuthClaims, OAuthProviderClient, ProviderKind, Result};
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, reqwest, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret,
    CsrfToken, EndpointNotSet, EndpointSet, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
    TokenUrl,
};
use serde_json::Value;
use url::Url;

use crate::config::ProviderConfig;

const USER_AGENT: &str = "acme-dashboard";

/// BasicClient with the authorization and token endpoints set.
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Static endpoints of a plain OAuth 2.0 provider.
struct Endpoints {
    authorize: &'static str,
    token: &'static str,
    profile: &'static str,
    scopes: &'static [&'static str],
    auth_type: AuthType,
}

fn endpoints(kind: ProviderKind) -> Option<Endpoints> {
    match kind {
        ProviderKind::GitHub => Some(Endpoints {
            authorize: "https://github.com/login/oauth/authorize",
            token: "https://github.com/login/oauth/access_token",
            profile: "https://api.github.com/user",
            scopes: &["read:user", "user:email"],
            auth_type: AuthType::RequestBody,
        }),
        ProviderKind::Twitter => Some(Endpoints {
            authorize: "https://x.com/i/oauth2/authorize",
            token: "https://api.x.com/2/oauth2/token",
            profile: "https://api.x.com/2/users/me",
            scopes: &["users.read", "tweet.read"],
            auth_type: AuthType::BasicAuth,
        }),
        ProviderKind::Facebook => Some(Endpoints {
            authorize: "https://www.facebook.com/v19.0/dialog/oauth",
            token: "https://graph.facebook.com/v19.0/oauth/access_token",
            profile: "https://graph.facebook.com/me?fields=id,name,email",
            scopes: &["email", "public_profile"],
            auth_type: AuthType::RequestBody,
        }),
        ProviderKind::Credentials | ProviderKind::Google => None,
    }
}

/// Authorization code + PKCE provider backed by the `oauth2` crate.
pub struct OAuthProvider {
    kind: ProviderKind,
    client: ConfiguredClient,
    http_client: reqwest::Client,
    profile_url: &'static str,
    scopes: &'static [&'static str],
}

impl OAuthProvider {
    /// Create a client for GitHub, Twitter or Facebook.
    ///
    /// # Errors
    ///
    /// Returns an error for providers without static OAuth endpoints, or when
    /// the configured redirect URI is invalid.
    pub fn new(kind: ProviderKind, config: &ProviderConfig) -> Result<Self> {
        let endpoints = endpoints(kind).ok_or_else(|| {
            AuthError::Provider(format!("{} is not a plain OAuth 2.0 provider", kind))
        })?;

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(
                AuthUrl::new(endpoints.authorize.to_string())
                    .map_err(|e| AuthError::Provider(e.to_string()))?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token.to_string())
                    .map_err(|e| AuthError::Provider(e.to_string()))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.to_string())
                    .map_err(|e| AuthError::Provider(e.to_string()))?,
            )
            .set_auth_type(endpoints.auth_type);

        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            kind,
            client,
            http_client,
            profile_url: endpoints.profile,
            scopes: endpoints.scopes,
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Value> {
        let response = self
            .http_client
            .get(self.profile_url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                AuthError::Provider(format!("{} profile request failed: {}", self.kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "{} profile request returned {}",
                self.kind, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl OAuthProviderClient for OAuthProvider {
    async fn authorization_url(&self, state: &str, pkce_challenge: &str) -> Result<Url> {
        let state_owned = state.to_string();

        let mut request = self
            .client
            .authorize_url(move || CsrfToken::new(state_owned))
            .add_extra_param("code_challenge", pkce_challenge.to_string())
            .add_extra_param("code_challenge_method", "S256");

        for scope in self.scopes {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (auth_url, _csrf_token) = request.url();
        Ok(auth_url)
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<OAuthClaims> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        let profile = self
            .fetch_profile(token_response.access_token().secret())
            .await?;

        claims_from_profile(self.kind, &profile)
    }

    fn provider(&self) -> ProviderKind {
        self.kind
    }
}

/// Map a provider profile document to claims.
///
/// - GitHub: `{ "id": 1, "login": "octocat", "name": .., "email": .. }`
/// - Twitter: `{ "data": { "id": "..", "name": .., "username": .. } }` (no email)
/// - Facebook: `{ "id": "..", "name": .., "email": .. }`
fn claims_from_profile(kind: ProviderKind, profile: &Value) -> Result<OAuthClaims> {
    let user = match kind {
        ProviderKind::Twitter => profile
            .get("data")
            .ok_or_else(|| AuthError::MissingClaim("data".to_string()))?,
        _ => profile,
    };

    let subject = match user.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(AuthError::MissingClaim("id".to_string())),
    };

    let string_field = |field: &str| {
        user.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let name = string_field("name")
        .or_else(|| string_field("login"))
        .or_else(|| string_field("username"));

    Ok(OAuthClaims {
        subject,
        email: string_field("email"),
        name,
        provider: kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config(kind: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            client_id: "client-id".to_string(),
            client_secret: Some("client-secret".to_string()),
            redirect_uri: Url::parse(&format!(
                "http://localhost:3000/auth/{}/callback",
                kind.id()
            ))
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_github_authorization_url() {
        let provider = OAuthProvider::new(ProviderKind::GitHub, &test_config(ProviderKind::GitHub))
            .unwrap();

        let url = provider
            .authorization_url("test-state", "test-challenge")
            .await
            .unwrap();

        assert_eq!(url.host_str(), Some("github.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("state".to_string(), "test-state".to_string())));
        assert!(pairs.contains(&("code_challenge".to_string(), "test-challenge".to_string())));
        assert!(pairs.contains(&("code_challenge_method".to_string(), "S256".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:3000/auth/github/callback".to_string()
        )));
    }

    #[tokio::test]
    async fn test_twitter_authorization_url_has_scopes() {
        let provider =
            OAuthProvider::new(ProviderKind::Twitter, &test_config(ProviderKind::Twitter))
                .unwrap();

        let url = provider.authorization_url("s", "c").await.unwrap();
        let scope = url
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(scope, "users.read tweet.read");
    }

    #[test]
    fn test_google_and_credentials_are_rejected() {
        for kind in [ProviderKind::Google, ProviderKind::Credentials] {
            assert!(OAuthProvider::new(kind, &test_config(kind)).is_err());
        }
    }

    #[test]
    fn test_github_profile_with_numeric_id() {
        let profile = json!({
            "id": 583231,
            "login": "octocat",
            "name": null,
            "email": "octocat@github.com",
        });

        let claims = claims_from_profile(ProviderKind::GitHub, &profile).unwrap();
        assert_eq!(claims.subject, "583231");
        assert_eq!(claims.name.as_deref(), Some("octocat"));
        assert_eq!(claims.email.as_deref(), Some("octocat@github.com"));
        assert_eq!(claims.provider, ProviderKind::GitHub);
    }

    #[test]
    fn test_twitter_profile_is_nested_under_data() {
        let profile = json!({
            "data": { "id": "2244994945", "name": "X Dev", "username": "XDevelopers" }
        });

        let claims = claims_from_profile(ProviderKind::Twitter, &profile).unwrap();
        assert_eq!(claims.subject, "2244994945");
        assert_eq!(claims.name.as_deref(), Some("X Dev"));
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_facebook_profile() {
        let profile = json!({ "id": "10101", "name": "Mark", "email": "mark@example.com" });

        let claims = claims_from_profile(ProviderKind::Facebook, &profile).unwrap();
        assert_eq!(claims.subject, "10101");
        assert_eq!(claims.email.as_deref(), Some("mark@example.com"));
    }

    #[test]
    fn test_profile_without_id_is_missing_claim() {
        let result = claims_from_profile(ProviderKind::Facebook, &json!({ "name": "Mark" }));
        assert!(matches!(result, Err(AuthError::MissingClaim(claim)) if claim == "id"));

        let result = claims_from_profile(ProviderKind::Twitter, &json!({ "id": "1" }));
        assert!(matches!(result, Err(AuthError::MissingClaim(claim)) if claim == "data"));
    }
}
