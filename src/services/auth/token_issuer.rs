use crate::config::settings::AuthConfig;
use crate::db::repositories::UserRecord;
use crate::models::auth_claims::{Claims, TokenUse};
use crate::services::auth::jwt::{JWT_ISSUER, JwtCodec, TokenError};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

/// A minted token together with the claims that went into it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Access/refresh pair for one subject, minted from the same instant.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Mints token pairs for an already-authenticated identity. Credential
/// verification (password check) happens before this is called.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<JwtCodec>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(codec: Arc<JwtCodec>, auth: &AuthConfig) -> Self {
        Self {
            codec,
            access_ttl: Duration::minutes(auth.access_token_ttl_minutes),
            refresh_ttl: Duration::days(auth.refresh_token_ttl_days),
        }
    }

    /// The refresh TTL bounds how long any outstanding token for a subject
    /// can still be alive; revocation entries use it as their horizon.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a fresh access/refresh pair carrying the role and permission
    /// snapshot from the given directory record.
    pub fn issue_pair(&self, user: &UserRecord) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access = self.mint(user, now, self.access_ttl, TokenUse::Access)?;
        let refresh = self.mint(user, now, self.refresh_ttl, TokenUse::Refresh)?;

        debug!(
            "Issued token pair for user {} (access jti: {}, refresh jti: {})",
            user.id, access.claims.jti, refresh.claims.jti
        );

        Ok(TokenPair { access, refresh })
    }

    fn mint(
        &self,
        user: &UserRecord,
        now: DateTime<Utc>,
        ttl: Duration,
        token_use: TokenUse,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: user.id.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: Some(JWT_ISSUER.to_string()),
            // 122 bits of randomness; jti collisions would alias revocation
            // entries, so anything weaker than a v4 UUID is not acceptable.
            jti: Uuid::new_v4().to_string(),
            token_use,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role_name: user.role_name.clone(),
            permissions: user.permissions.clone(),
        };

        let token = self.codec.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }
}
