//! Signed session tokens.
//!
//! A [`Session`] is resolved per request from a bearer token and handed to
//! the handlers that need it; there is no process-wide login state.
//!
//! Tokens are HMAC-SHA256 based, bound to a session id and issue time.
//! Format: `mden_st_<session_id>_<issued_unix>_<hmac_hex>`

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Token prefix used to identify session tokens.
const TOKEN_PREFIX: &str = "mden_st_";

/// Environment variable holding the hex-encoded signing secret.
pub const SESSION_SECRET_ENV: &str = "MUSCLEDEN_SESSION_SECRET";

/// Errors that can occur during token operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session token format: {0}")]
    InvalidFormat(String),

    #[error("invalid session id in token: {0}")]
    InvalidSessionId(String),

    #[error("invalid issue time in token: {0}")]
    InvalidIssuedAt(String),

    #[error("session token signature verification failed")]
    HmacMismatch,

    #[error("session token expired")]
    Expired,

    #[error("missing session secret")]
    MissingSecret,
}

/// Signing configuration.
#[derive(Clone)]
pub struct SessionConfig {
    /// The HMAC secret key bytes.
    pub secret: Vec<u8>,
    /// How long a token stays valid after issue.
    pub max_age: Duration,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            max_age: Duration::days(Self::DEFAULT_MAX_AGE_DAYS),
        }
    }

    /// Create a config from a hex-encoded secret.
    pub fn from_hex(secret_hex: &str) -> Result<Self, SessionError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| {
            SessionError::InvalidFormat(format!("session secret is not valid hex: {e}"))
        })?;
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }
        Ok(Self::new(secret))
    }
}

/// An authenticated session, as carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub issued_at: DateTime<Utc>,
}

/// Issue a token for a brand-new session.
pub fn issue_token(config: &SessionConfig) -> (Session, String) {
    let session = Session {
        id: Uuid::new_v4(),
        issued_at: Utc::now(),
    };
    let token = token_for(config, &session);
    (session, token)
}

/// Sign a token for an existing session.
pub fn token_for(config: &SessionConfig, session: &Session) -> String {
    let issued = session.issued_at.timestamp();
    let message = format!("{}:{issued}", session.id);
    let mac = compute_hmac(&config.secret, message.as_bytes());
    format!("{TOKEN_PREFIX}{}_{issued}_{}", session.id, hex::encode(mac))
}

/// Validate a token against the current time.
pub fn validate_token(config: &SessionConfig, token: &str) -> Result<Session, SessionError> {
    validate_token_at(config, token, Utc::now())
}

/// Validate a token as of `now`.
///
/// Parses the format, verifies the HMAC in constant time, then checks that
/// the token is not older than `max_age` nor issued in the future.
pub fn validate_token_at(
    config: &SessionConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Session, SessionError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
        SessionError::InvalidFormat(format!("token must start with '{TOKEN_PREFIX}'"))
    })?;

    // A hyphenated UUID is 36 chars.
    let (id_str, after_id) = rest
        .split_at_checked(36)
        .ok_or_else(|| SessionError::InvalidFormat("token too short".to_string()))?;
    let id = Uuid::parse_str(id_str).map_err(|e| SessionError::InvalidSessionId(e.to_string()))?;

    let after_underscore = after_id.strip_prefix('_').ok_or_else(|| {
        SessionError::InvalidFormat("expected underscore after session id".to_string())
    })?;
    let (issued_str, hmac_hex) = after_underscore.split_once('_').ok_or_else(|| {
        SessionError::InvalidFormat("expected underscore between issue time and hmac".to_string())
    })?;

    let issued: i64 = issued_str
        .parse()
        .map_err(|e: std::num::ParseIntError| SessionError::InvalidIssuedAt(e.to_string()))?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| SessionError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    let message = format!("{id}:{issued}");
    verify_hmac_constant_time(&config.secret, message.as_bytes(), &provided_mac)?;

    let issued_at = DateTime::<Utc>::from_timestamp(issued, 0)
        .ok_or_else(|| SessionError::InvalidIssuedAt(issued.to_string()))?;
    // Allow a little clock skew between issuer and verifier.
    if issued_at > now + Duration::minutes(5) || now - issued_at > config.max_age {
        return Err(SessionError::Expired);
    }

    Ok(Session { id, issued_at })
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => unreachable!("HMAC-SHA256 rejected a key"),
    }
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = new_mac(key);
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn verify_hmac_constant_time(
    key: &[u8],
    message: &[u8],
    expected_mac: &[u8],
) -> Result<(), SessionError> {
    let mut mac = new_mac(key);
    mac.update(message);
    mac.verify_slice(expected_mac)
        .map_err(|_| SessionError::HmacMismatch)
}
