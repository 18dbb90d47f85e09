use crate::handlers;
use actix_web::web;

/// Configures API routes that REQUIRE JWT authentication.
/// Mounted under the "/api" scope and wrapped with SecureAuthentication middleware in main.rs.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth") // Base path: /api/auth
            .route("/userinfo", web::get().to(handlers::auth::get_user_info))
            .route("/logout", web::post().to(handlers::auth::logout))
            .route("/force-logout", web::post().to(handlers::auth::force_logout)),
    );
}

/// Configures public authentication routes (not part of /api).
/// Mounted under the "/auth" scope in main.rs.
pub fn configure_public_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(handlers::auth::login));
    cfg.route("/refresh", web::post().to(handlers::auth::refresh));
}
