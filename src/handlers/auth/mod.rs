pub mod force_logout_handler;
pub mod login_handler;
pub mod logout_handler;
pub mod refresh_handler;
pub mod userinfo_handler;

pub use force_logout_handler::force_logout;
pub use login_handler::login;
pub use logout_handler::logout;
pub use refresh_handler::refresh;
pub use userinfo_handler::get_user_info;

#[cfg(test)]
mod tests {
    use super::login_handler::TokenResponse;
    use super::*;
    use actix_web::{App, http::StatusCode, test, web};
    use jsonwebtoken::Algorithm;
    use std::sync::Arc;

    use crate::db::repositories::{UserDirectory, UserRecord};
    use crate::middleware::SecureAuthentication;
    use crate::services::auth::{Authenticator, JwtCodec, RevocationStore, TokenIssuer};
    use crate::services::authz::DepartmentPolicy;
    use crate::test_support::{
        InMemoryUserDirectory, department_policy, sample_user, test_auth_config,
        user_with_password,
    };

    struct Stack {
        codec: Arc<JwtCodec>,
        issuer: TokenIssuer,
        revocations: RevocationStore,
        directory: Arc<InMemoryUserDirectory>,
        departments: Arc<DepartmentPolicy>,
        authenticator: Arc<Authenticator>,
    }

    fn stack() -> Stack {
        let codec = Arc::new(JwtCodec::new("test-secret", &[], Algorithm::HS256));
        let issuer = TokenIssuer::new(codec.clone(), &test_auth_config());
        let revocations = RevocationStore::new();
        let directory = Arc::new(InMemoryUserDirectory::new());
        let departments = Arc::new(department_policy());
        let authenticator = Arc::new(Authenticator::new(
            codec.clone(),
            revocations.clone(),
            directory.clone(),
            departments.clone(),
        ));
        Stack {
            codec,
            issuer,
            revocations,
            directory,
            departments,
            authenticator,
        }
    }

    fn superadmin() -> UserRecord {
        let mut user = sample_user();
        user.email = "root@example.com".to_string();
        user.role_name = "superadmin".to_string();
        user.permissions = vec!["user:manage".to_string()];
        user
    }

    macro_rules! test_app {
        ($stack:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::from(
                        $stack.directory.clone() as Arc<dyn UserDirectory>
                    ))
                    .app_data(web::Data::from($stack.codec.clone()))
                    .app_data(web::Data::from($stack.departments.clone()))
                    .app_data(web::Data::new($stack.issuer.clone()))
                    .app_data(web::Data::new($stack.revocations.clone()))
                    .service(
                        web::scope("/auth")
                            .route("/login", web::post().to(login))
                            .route("/refresh", web::post().to(refresh)),
                    )
                    .service(
                        web::scope("/api")
                            .wrap(SecureAuthentication::new($stack.authenticator.clone()))
                            .service(
                                web::scope("/auth")
                                    .route("/userinfo", web::get().to(get_user_info))
                                    .route("/logout", web::post().to(logout))
                                    .route("/force-logout", web::post().to(force_logout)),
                            ),
                    ),
            )
            .await
        };
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn login_issues_a_working_token_pair() {
        let stack = stack();
        let user = user_with_password("ada@example.com", "correct horse");
        stack.directory.insert(user.clone());
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "email": "ada@example.com",
                "password": "correct horse",
            }))
            .to_request();
        let tokens: TokenResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tokens.token_type, "bearer");

        let req = test::TestRequest::get()
            .uri("/api/auth/userinfo")
            .insert_header(bearer(&tokens.access_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["role_name"], "editor");
        assert_eq!(body["department"], "content");
    }

    #[actix_web::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let stack = stack();
        stack
            .directory
            .insert(user_with_password("ada@example.com", "correct horse"));
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "email": "ada@example.com",
                "password": "wrong horse",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let stack = stack();
        stack
            .directory
            .insert(user_with_password("ada@example.com", "correct horse"));
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "email": "nobody@example.com",
                "password": "whatever",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let unknown_email_body = test::read_body(resp).await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "email": "ada@example.com",
                "password": "wrong horse",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let wrong_password_body = test::read_body(resp).await;

        // Same status, same body; nothing in the response says which
        // condition was hit.
        assert_eq!(unknown_email_body, wrong_password_body);
    }

    #[actix_web::test]
    async fn refresh_rotation_rejects_replay() {
        let stack = stack();
        let user = sample_user();
        stack.directory.insert(user.clone());
        let pair = stack.issuer.issue_pair(&user).unwrap();
        let app = test_app!(stack);

        let body = serde_json::json!({ "refresh_token": pair.refresh.token });

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // Second exchange of the same refresh token
        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn logout_revokes_access_token_but_not_refresh_token() {
        let stack = stack();
        let user = sample_user();
        stack.directory.insert(user.clone());
        let pair = stack.issuer.issue_pair(&user).unwrap();
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(bearer(&pair.access.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // The access token is dead
        let req = test::TestRequest::get()
            .uri("/api/auth/userinfo")
            .insert_header(bearer(&pair.access.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // The refresh token was not presented, so it still works
        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(serde_json::json!({ "refresh_token": pair.refresh.token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn logout_with_refresh_token_revokes_both() {
        let stack = stack();
        let user = sample_user();
        stack.directory.insert(user.clone());
        let pair = stack.issuer.issue_pair(&user).unwrap();
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(bearer(&pair.access.token))
            .set_json(serde_json::json!({ "refresh_token": pair.refresh.token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(serde_json::json!({ "refresh_token": pair.refresh.token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn force_logout_revokes_all_target_sessions() {
        let stack = stack();
        let admin = superadmin();
        let target = sample_user();
        stack.directory.insert(admin.clone());
        stack.directory.insert(target.clone());
        let admin_pair = stack.issuer.issue_pair(&admin).unwrap();
        let target_pair = stack.issuer.issue_pair(&target).unwrap();
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/api/auth/force-logout")
            .insert_header(bearer(&admin_pair.access.token))
            .set_json(serde_json::json!({ "user_id": target.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // Both halves of the target's pair predate the cutoff
        let req = test::TestRequest::get()
            .uri("/api/auth/userinfo")
            .insert_header(bearer(&target_pair.access.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(serde_json::json!({ "refresh_token": target_pair.refresh.token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // The admin's own session is untouched
        let req = test::TestRequest::get()
            .uri("/api/auth/userinfo")
            .insert_header(bearer(&admin_pair.access.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn force_logout_requires_user_manage_permission() {
        let stack = stack();
        let editor = sample_user();
        let target = superadmin();
        stack.directory.insert(editor.clone());
        stack.directory.insert(target.clone());
        let editor_pair = stack.issuer.issue_pair(&editor).unwrap();
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/api/auth/force-logout")
            .insert_header(bearer(&editor_pair.access.token))
            .set_json(serde_json::json!({ "user_id": target.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn force_logout_is_department_scoped() {
        let stack = stack();
        // A content-department manager with user:manage, but not superadmin
        let mut manager = sample_user();
        manager.email = "manager@example.com".to_string();
        manager.permissions = vec!["user:manage".to_string()];
        let mut target = sample_user();
        target.email = "eve@example.com".to_string();
        target.role_name = "engineer".to_string();
        stack.directory.insert(manager.clone());
        stack.directory.insert(target.clone());
        let manager_pair = stack.issuer.issue_pair(&manager).unwrap();
        let app = test_app!(stack);

        let req = test::TestRequest::post()
            .uri("/api/auth/force-logout")
            .insert_header(bearer(&manager_pair.access.token))
            .set_json(serde_json::json!({ "user_id": target.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
