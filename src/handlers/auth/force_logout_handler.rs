use actix_web::{HttpResponse, web};
use chrono::Utc;
use log::{error, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::repositories::UserDirectory;
use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::services::auth::{RevocationStore, TokenIssuer};
use crate::services::authz::{DepartmentPolicy, require_permission};

#[derive(Debug, Deserialize)]
pub struct ForceLogoutRequest {
    pub user_id: Uuid,
}

/// Revoke every outstanding token of the target user by recording a
/// subject-wide cutoff. Tokens issued after the cutoff stay valid, so the
/// target can log in again immediately.
pub async fn force_logout(
    user: AuthenticatedUser,
    payload: web::Json<ForceLogoutRequest>,
    users: web::Data<dyn UserDirectory>,
    departments: web::Data<DepartmentPolicy>,
    revocations: web::Data<RevocationStore>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    require_permission(&user, "user:manage")?;

    let target = match users.get_by_id(&payload.user_id).await {
        Ok(Some(target)) => target,
        Ok(None) => {
            return Err(AppError::NotFound(format!(
                "User {} not found",
                payload.user_id
            )));
        }
        Err(e) => {
            error!("User directory lookup failed during force-logout: {}", e);
            return Err(e);
        }
    };

    let target_department = departments.department_of(&target.role_name)?;
    departments.require_same_department_or_superadmin(&user, target_department)?;

    // The cutoff outlives the longest-lived token that could predate it.
    let cutoff = Utc::now();
    revocations.revoke_subject(target.id, cutoff, cutoff + issuer.refresh_ttl());

    warn!(
        "User {} force-logged-out user {} (cutoff: {})",
        user.user_id, target.id, cutoff
    );
    info!("Subject-wide revocation recorded for user {}", target.id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "All sessions revoked",
        "user_id": target.id,
    })))
}
