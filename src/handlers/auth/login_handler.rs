use actix_web::{HttpResponse, web};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::db::repositories::UserDirectory;
use crate::error::AppError;
use crate::services::auth::TokenIssuer;
use crate::services::auth::password::{burn_verification, verify_password};
use crate::services::auth::token_issuer::TokenPair;

/// Uniform outward message for failed logins; whether the email or the
/// password was wrong is not disclosed.
pub const INVALID_LOGIN_MESSAGE: &str = "Incorrect email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
}

impl TokenResponse {
    pub fn bearer(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access.token.clone(),
            token_type: "bearer".to_string(),
            refresh_token: pair.refresh.token.clone(),
        }
    }
}

pub async fn login(
    payload: web::Json<LoginRequest>,
    users: web::Data<dyn UserDirectory>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let user = match users.get_by_email(&payload.email).await? {
        Some(user) => user,
        None => {
            burn_verification(&payload.password);
            warn!("Login attempt for unknown email");
            return Err(AppError::Auth(INVALID_LOGIN_MESSAGE.to_string()));
        }
    };

    if !user.is_active {
        burn_verification(&payload.password);
        warn!("Login attempt for deactivated user {}", user.id);
        return Err(AppError::Auth(INVALID_LOGIN_MESSAGE.to_string()));
    }

    let stored_hash = match user.password_hash.as_deref() {
        Some(hash) => hash,
        None => {
            burn_verification(&payload.password);
            warn!("Login attempt for user {} without a local credential", user.id);
            return Err(AppError::Auth(INVALID_LOGIN_MESSAGE.to_string()));
        }
    };

    if !verify_password(&payload.password, stored_hash)? {
        warn!("Failed login attempt for user {}", user.id);
        return Err(AppError::Auth(INVALID_LOGIN_MESSAGE.to_string()));
    }

    let pair = issuer.issue_pair(&user).map_err(|e| {
        error!("Token issuance failed for user {}: {}", user.id, e);
        AppError::Internal("Token issuance failed".to_string())
    })?;

    info!("User {} logged in (role: {})", user.id, user.role_name);

    Ok(HttpResponse::Ok().json(TokenResponse::bearer(&pair)))
}
