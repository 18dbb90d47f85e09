use crate::config::settings::AuthConfig;
use crate::error::AppError;
use crate::models::auth_claims::{Claims, TokenUse};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::error;
use thiserror::Error;

// Issuer name for JWT tokens
pub const JWT_ISSUER: &str = "cms-api";

/// Internal token failure taxonomy. Externally every variant collapses to a
/// generic 401; the specific cause is only ever logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("wrong token use, expected {0}")]
    WrongTokenUse(TokenUse),
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Stateless JWT codec: encodes with the primary secret, verifies against the
/// primary secret plus any configured fallback secrets (key rotation).
///
/// Decoding is a pure function of the token string and the verification
/// secrets; it never performs a lookup.
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_keys: Vec<DecodingKey>,
    algorithm: Algorithm,
}

impl JwtCodec {
    pub fn new(primary_secret: &str, fallback_secrets: &[String], algorithm: Algorithm) -> Self {
        let mut decoding_keys = vec![DecodingKey::from_secret(primary_secret.as_bytes())];
        for secret in fallback_secrets {
            decoding_keys.push(DecodingKey::from_secret(secret.as_bytes()));
        }

        Self {
            encoding_key: EncodingKey::from_secret(primary_secret.as_bytes()),
            decoding_keys,
            algorithm,
        }
    }

    pub fn from_settings(auth: &AuthConfig) -> Result<Self, AppError> {
        let algorithm = match auth.jwt_algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            other => {
                return Err(AppError::Configuration(format!(
                    "Unsupported JWT algorithm '{}', only HS256 is supported",
                    other
                )));
            }
        };

        Ok(Self::new(&auth.jwt_secret, &auth.jwt_fallback_secrets, algorithm))
    }

    /// Encode claims into a signed token string.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!("Failed to encode JWT: {}", e);
            TokenError::Encoding(e.to_string())
        })
    }

    /// Decode and validate a token string, enforcing signature, expiry,
    /// issuer and the expected token use.
    ///
    /// Verification is attempted against each configured secret in order; a
    /// signature failure under every key is `InvalidSignature`.
    pub fn decode(&self, token: &str, expected_use: TokenUse) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[JWT_ISSUER]);
        validation.leeway = 0;

        for decoding_key in &self.decoding_keys {
            match decode::<Claims>(token, decoding_key, &validation) {
                Ok(token_data) => {
                    if token_data.claims.token_use != expected_use {
                        return Err(TokenError::WrongTokenUse(expected_use));
                    }
                    return Ok(token_data.claims);
                }
                Err(err) => match err.kind() {
                    // The token may have been signed with a rotated-out
                    // primary; keep trying the remaining keys.
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => continue,
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        return Err(TokenError::Expired);
                    }
                    _ => return Err(TokenError::Malformed),
                },
            }
        }

        Err(TokenError::InvalidSignature)
    }
}
