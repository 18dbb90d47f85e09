use actix_web::HttpResponse;

use crate::error::AppError;
use crate::models::AuthenticatedUser;

/// Handler for getting user information from a validated access token.
/// Everything returned comes from the token snapshot; no database read.
pub async fn get_user_info(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let mut permissions: Vec<&str> = user.permissions.iter().map(String::as_str).collect();
    permissions.sort_unstable();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": user.user_id,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "role_name": user.role_name,
        "permissions": permissions,
        "department": user.department,
    })))
}
