//! Mock OAuth provider for development and testing.
//!
//! Authorization codes are base64-encoded JSON documents carrying the user
//! info, so no identity provider has to be running.

use acme_core::auth::{AuthError, OAuthClaims, OAuthProviderClient, ProviderKind, Result};
use async_trait::async_trait;
use base64::Engine;
use url::Url;

/// Mock OAuth provider.
///
/// Authorization URLs point at `idp_url`. Codes with `"fail": true` (or that
/// do not decode) make the exchange fail like a provider-side error would.
pub struct MockProvider {
    provider: ProviderKind,
    idp_url: Url,
    redirect_uri: Url,
}

impl MockProvider {
    pub fn new(provider: ProviderKind, idp_url: Url, redirect_uri: Url) -> Self {
        Self {
            provider,
            idp_url,
            redirect_uri,
        }
    }

    /// Build a code the way the mock IdP would.
    pub fn encode_code(subject: &str, email: Option<&str>, name: Option<&str>) -> String {
        base64::engine::general_purpose::STANDARD.encode(
            serde_json::json!({
                "sub": subject,
                "email": email,
                "name": name,
            })
            .to_string(),
        )
    }
}

#[async_trait]
impl OAuthProviderClient for MockProvider {
    async fn authorization_url(&self, state: &str, pkce_challenge: &str) -> Result<Url> {
        let mut url = self
            .idp_url
            .join(&format!("/{}/authorize", self.provider.id()))
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("state", state)
            .append_pair("code_challenge", pkce_challenge)
            .append_pair("redirect_uri", self.redirect_uri.as_str());

        Ok(url)
    }

    async fn exchange_code(&self, code: &str, _pkce_verifier: &str) -> Result<OAuthClaims> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(code)
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        let json: serde_json::Value =
            serde_json::from_slice(&decoded).map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        if json["fail"].as_bool().unwrap_or(false) {
            return Err(AuthError::Provider(format!(
                "{} rejected the authorization code",
                self.provider.display_name()
            )));
        }

        let subject = json["sub"]
            .as_str()
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;

        Ok(OAuthClaims {
            subject: subject.to_string(),
            email: json["email"].as_str().map(String::from),
            name: json["name"].as_str().map(String::from),
            provider: self.provider,
        })
    }

    fn provider(&self) -> ProviderKind {
        self.provider
    }
}
