use actix_web::{HttpRequest, HttpResponse, http::header::AUTHORIZATION, web};
use log::{info, warn};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::models::auth_claims::TokenUse;
use crate::services::auth::authenticator::CREDENTIALS_MESSAGE;
use crate::services::auth::{JwtCodec, RevocationStore};

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Revoke the presented access token and, when supplied, the refresh token.
///
/// Revoking only the access token deliberately leaves any associated refresh
/// token usable; a client that wants the whole session gone sends both.
pub async fn logout(
    user: AuthenticatedUser,
    req: HttpRequest,
    payload: Option<web::Json<LogoutRequest>>,
    codec: web::Data<JwtCodec>,
    revocations: web::Data<RevocationStore>,
) -> Result<HttpResponse, AppError> {
    // The middleware already validated the access token; re-read it from the
    // Authorization header for its jti and expiry.
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth(CREDENTIALS_MESSAGE.to_string()))?;
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth(CREDENTIALS_MESSAGE.to_string()))?
        .trim();

    let claims = codec.decode(token, TokenUse::Access).map_err(|e| {
        warn!("Access token rejected at logout: {}", e);
        AppError::Auth(CREDENTIALS_MESSAGE.to_string())
    })?;

    match (claims.token_id(), claims.expires_at()) {
        (Some(jti), Some(expires_at)) => revocations.revoke(jti, expires_at),
        _ => {
            warn!("Access token at logout carries malformed identifier claims");
            return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
        }
    }

    if let Some(refresh_token) = payload.as_ref().and_then(|p| p.refresh_token.as_deref()) {
        match codec.decode(refresh_token, TokenUse::Refresh) {
            Ok(refresh_claims) => {
                if let (Some(jti), Some(expires_at)) =
                    (refresh_claims.token_id(), refresh_claims.expires_at())
                {
                    revocations.revoke(jti, expires_at);
                }
            }
            // An undecodable or expired refresh token is already unusable;
            // logout still succeeds.
            Err(e) => warn!("Refresh token presented at logout was not revocable: {}", e),
        }
    }

    info!("User {} logged out (access jti: {})", user.user_id, claims.jti);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}
