use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Distinguishes the two halves of a token pair. A refresh token must never
/// be accepted where an access token is required, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenUse {
    #[serde(rename = "access")]
    Access,
    #[serde(rename = "refresh")]
    Refresh,
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenUse::Access => write!(f, "access"),
            TokenUse::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims structure that will be encoded/decoded for authentication.
///
/// `permissions` is a snapshot taken from the subject's role at issuance
/// time; role edits do not retroactively change issued tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at (as UTC timestamp)
    pub iat: usize,
    /// Issuer
    pub iss: Option<String>,
    /// JWT ID (unique identifier for the token, the revocation key)
    pub jti: String,
    /// Whether this is an access or a refresh token
    pub token_use: TokenUse,
    /// Display name, never used for trust decisions
    pub first_name: String,
    /// Display name, never used for trust decisions
    pub last_name: String,
    /// The subject's single role at issuance time
    pub role_name: String,
    /// Permission strings resolved from the role at issuance time
    pub permissions: Vec<String>,
}

impl Claims {
    /// The subject as a UUID; `None` when the token carries something else.
    pub fn subject_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// The token id as a UUID (the revocation key).
    pub fn token_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.jti).ok()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat as i64, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp as i64, 0)
    }
}
