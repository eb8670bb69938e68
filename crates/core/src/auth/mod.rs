mod error;
mod functions;
mod password;
mod traits;
mod types;
mod validation;

pub use error::AuthError;
pub use functions::{
    calculate_expiry, email_to_name, generate_session_id, generate_state, is_flow_expired,
    is_session_expired, resolve_redirect_target, AUTH_FLOW_TTL_SECS,
};
pub use password::{hash_password, verify_password, BCRYPT_COST};
pub use traits::{OAuthProviderClient, Result, SessionRepository};
pub use types::{
    AuthFlowState, AuthOutcome, CredentialRecord, Identity, OAuthClaims, ProviderDescriptor,
    ProviderKind, Session, SessionId,
};
pub use validation::{is_valid_password, normalize_email, validate_return_to, MIN_PASSWORD_LENGTH};
