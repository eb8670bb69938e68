use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cryptographically random session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every provider the dashboard knows how to sign users in with.
///
/// `Credentials` is the internal email/password provider; the others are
/// external OAuth identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Credentials,
    GitHub,
    Google,
    Twitter,
    Facebook,
}

impl ProviderKind {
    /// Static provider order. The registry preserves it.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Credentials,
        ProviderKind::GitHub,
        ProviderKind::Google,
        ProviderKind::Twitter,
        ProviderKind::Facebook,
    ];

    /// Stable routing key.
    pub fn id(self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::GitHub => "github",
            Self::Google => "google",
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
        }
    }

    /// Human readable name shown on the login page.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Credentials => "Credentials",
            Self::GitHub => "GitHub",
            Self::Google => "Google",
            Self::Twitter => "Twitter",
            Self::Facebook => "Facebook",
        }
    }

    pub fn is_credentials(self) -> bool {
        self == Self::Credentials
    }

    /// Parses a routing key back into a provider kind.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn descriptor(self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id().to_string(),
            name: self.display_name().to_string(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Public identity of a configured OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
}

/// Persisted email/password identity.
///
/// Owned by the datastore. The sign-in flow only reads it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: Uuid,
    /// Lowercase-normalized, unique.
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl CredentialRecord {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into().trim().to_lowercase(),
            name: name.into(),
            password_hash: password_hash.into(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id.to_string(),
            email: Some(self.email.clone()),
            name: Some(self.name.clone()),
            provider: ProviderKind::Credentials,
        }
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// A verified identity, produced by either the credential or OAuth flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub provider: ProviderKind,
}

impl Identity {
    /// Identity for an OAuth sign-in. The user id is namespaced by provider
    /// so subjects from different providers never collide.
    pub fn from_claims(claims: &OAuthClaims) -> Self {
        Self {
            user_id: format!("{}:{}", claims.provider, claims.subject),
            email: claims.email.clone(),
            name: claims.name.clone(),
            provider: claims.provider,
        }
    }
}

/// Result of a single authentication attempt.
///
/// Never persisted. Errors outside this taxonomy travel as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success(Identity),
    /// Wrong email, wrong password or malformed input. Does not
    /// say which.
    InvalidCredentials,
    /// The datastore or an identity provider failed.
    ProviderError(String),
}

/// Authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub identity: Identity,
    /// Where the user was sent after signing in.
    pub redirect_to: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }
}

/// Provider-agnostic claims returned by an OAuth code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClaims {
    /// Provider's unique user identifier.
    pub subject: String,
    /// User's email address.
    pub email: Option<String>,
    /// User's display name.
    pub name: Option<String>,
    /// Which provider issued these claims.
    pub provider: ProviderKind,
}

/// PKCE and state data stored during an OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthFlowState {
    pub pkce_verifier: String,
    pub provider: ProviderKind,
    pub created_at: DateTime<Utc>,
    /// URL to redirect to after successful authentication.
    pub return_to: Option<String>,
}
