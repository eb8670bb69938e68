use std::time::Duration;

use acme_core::auth::ProviderKind;
use url::Url;

use crate::error::AuthError;

/// Path users land on when no callback URL was supplied.
pub const DEFAULT_REDIRECT: &str = "/dashboard";

/// Longest accepted `SESSION_TTL_DAYS`.
pub const MAX_SESSION_TTL_DAYS: u64 = 365;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for a single OAuth provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Url,
}

/// Complete auth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub github: Option<ProviderConfig>,
    pub google: Option<ProviderConfig>,
    pub twitter: Option<ProviderConfig>,
    pub facebook: Option<ProviderConfig>,
    pub session_ttl: Duration,
    pub base_url: Url,
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// Redirect target used when the caller did not supply one.
    pub default_redirect: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            github: None,
            google: None,
            twitter: None,
            facebook: None,
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            base_url: Url::parse("http://localhost:3000").expect("static URL is valid"),
            cookie_name: "session".to_string(),
            cookie_secure: true,
            default_redirect: DEFAULT_REDIRECT.to_string(),
        }
    }
}

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AUTH_BASE_URL`: Base URL for callback redirects (default: `http://localhost:3000`)
    /// - `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`: enables GitHub sign-in
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: enables Google sign-in
    /// - `TWITTER_CLIENT_ID` / `TWITTER_CLIENT_SECRET`: enables Twitter (X) sign-in
    /// - `FACEBOOK_CLIENT_ID` / `FACEBOOK_CLIENT_SECRET`: enables Facebook sign-in
    /// - `SESSION_TTL_DAYS`: Session TTL in days, 1 to 365 (default: 7)
    /// - `COOKIE_SECURE`: Whether to set secure flag on cookies (default: true)
    /// - `AUTH_DEFAULT_REDIRECT`: Post-login target without callback URL (default: `/dashboard`)
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid, the session TTL is out of
    /// range or a provider is partially configured (client ID without secret).
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("AUTH_BASE_URL") {
            Some(raw) => Url::parse(&raw)
                .map_err(|e| AuthError::Config(format!("AUTH_BASE_URL is invalid: {}", e)))?,
            None => defaults.base_url,
        };

        let session_ttl = match lookup("SESSION_TTL_DAYS") {
            Some(raw) => session_ttl_from_days(&raw)?,
            None => defaults.session_ttl,
        };

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let default_redirect = lookup("AUTH_DEFAULT_REDIRECT")
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_redirect);

        Ok(Self {
            github: provider_from_lookup(&lookup, &base_url, ProviderKind::GitHub)?,
            google: provider_from_lookup(&lookup, &base_url, ProviderKind::Google)?,
            twitter: provider_from_lookup(&lookup, &base_url, ProviderKind::Twitter)?,
            facebook: provider_from_lookup(&lookup, &base_url, ProviderKind::Facebook)?,
            session_ttl,
            base_url,
            cookie_name: defaults.cookie_name,
            cookie_secure,
            default_redirect,
        })
    }

    /// Configuration for one provider, if enabled.
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::Credentials => None,
            ProviderKind::GitHub => self.github.as_ref(),
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Twitter => self.twitter.as_ref(),
            ProviderKind::Facebook => self.facebook.as_ref(),
        }
    }

    /// Callback URL registered with the provider.
    pub fn callback_url(&self, kind: ProviderKind) -> Result<Url, AuthError> {
        callback_url(&self.base_url, kind)
    }
}

fn callback_url(base_url: &Url, kind: ProviderKind) -> Result<Url, AuthError> {
    base_url
        .join(&format!("/auth/{}/callback", kind.id()))
        .map_err(|e| AuthError::Config(e.to_string()))
}

fn provider_from_lookup<F>(
    lookup: &F,
    base_url: &Url,
    kind: ProviderKind,
) -> Result<Option<ProviderConfig>, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = kind.id().to_uppercase();

    let Some(client_id) = lookup(&format!("{}_CLIENT_ID", prefix)) else {
        return Ok(None);
    };

    let secret_key = format!("{}_CLIENT_SECRET", prefix);
    let client_secret = lookup(&secret_key)
        .ok_or_else(|| AuthError::Config(format!("{} is required", secret_key)))?;

    Ok(Some(ProviderConfig {
        client_id,
        client_secret: Some(client_secret),
        redirect_uri: callback_url(base_url, kind)?,
    }))
}

fn session_ttl_from_days(raw: &str) -> Result<Duration, AuthError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|days| (1..=MAX_SESSION_TTL_DAYS).contains(days))
        .map(|days| Duration::from_secs(days * SECS_PER_DAY))
        .ok_or_else(|| {
            AuthError::Config(format!(
                "SESSION_TTL_DAYS must be a whole number of days between 1 and {}, got {:?}",
                MAX_SESSION_TTL_DAYS, raw
            ))
        })
}
