use actix_web::{HttpResponse, web};
use log::{error, info, warn};
use serde::Deserialize;

use crate::db::repositories::UserDirectory;
use crate::error::AppError;
use crate::models::auth_claims::TokenUse;
use crate::services::auth::authenticator::{CREDENTIALS_MESSAGE, REVOKED_MESSAGE};
use crate::services::auth::{JwtCodec, RevocationStore, TokenIssuer};

use super::login_handler::TokenResponse;

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Exchange a refresh token for a fresh pair. Rotation: the presented token
/// is revoked before the new pair is issued, so a second exchange of the
/// same token fails.
pub async fn refresh(
    payload: web::Json<RefreshTokenRequest>,
    codec: web::Data<JwtCodec>,
    revocations: web::Data<RevocationStore>,
    users: web::Data<dyn UserDirectory>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let claims = codec
        .decode(&payload.refresh_token, TokenUse::Refresh)
        .map_err(|e| {
            warn!("Refresh token rejected: {}", e);
            AppError::Auth(CREDENTIALS_MESSAGE.to_string())
        })?;

    let (user_id, jti, issued_at, expires_at) = match (
        claims.subject_id(),
        claims.token_id(),
        claims.issued_at(),
        claims.expires_at(),
    ) {
        (Some(sub), Some(jti), Some(iat), Some(exp)) => (sub, jti, iat, exp),
        _ => {
            warn!("Refresh token carries malformed identifier claims");
            return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
        }
    };

    if revocations.is_subject_revoked(&user_id, issued_at) {
        warn!("Revoked refresh token presented for user {} (jti: {})", user_id, jti);
        return Err(AppError::Auth(REVOKED_MESSAGE.to_string()));
    }

    // Single-use: burning the token here is the serialization point. Of two
    // concurrent exchanges of the same token exactly one wins the entry and
    // proceeds; the other sees it already burned.
    if !revocations.revoke_if_active(jti, expires_at) {
        warn!("Replayed or revoked refresh token for user {} (jti: {})", user_id, jti);
        return Err(AppError::Auth(REVOKED_MESSAGE.to_string()));
    }

    // The subject must still exist and be active; a directory failure fails
    // closed.
    let user = match users.get_by_id(&user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(Some(_)) => {
            warn!("Refresh token subject {} is deactivated", user_id);
            return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
        }
        Ok(None) => {
            warn!("Refresh token subject {} no longer exists", user_id);
            return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
        }
        Err(e) => {
            error!("User directory lookup failed during refresh, failing closed: {}", e);
            return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
        }
    };

    // Issuing from a fresh directory record re-resolves the role/permission
    // snapshot, so role edits take effect on refresh.
    let pair = issuer.issue_pair(&user).map_err(|e| {
        error!("Token issuance failed for user {}: {}", user.id, e);
        AppError::Internal("Token issuance failed".to_string())
    })?;

    info!("Rotated refresh token for user {} (old jti: {})", user_id, jti);

    Ok(HttpResponse::Ok().json(TokenResponse::bearer(&pair)))
}
