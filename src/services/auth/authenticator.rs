use log::{error, warn};
use std::sync::Arc;

use crate::db::repositories::UserDirectory;
use crate::error::AppError;
use crate::models::auth_claims::TokenUse;
use crate::models::AuthenticatedUser;
use crate::services::auth::jwt::JwtCodec;
use crate::services::auth::revocation_store::RevocationStore;
use crate::services::authz::DepartmentPolicy;

/// Uniform outward message for every authentication failure. Which specific
/// check failed is only ever logged, never disclosed to the caller.
pub const CREDENTIALS_MESSAGE: &str = "Could not validate credentials";
pub const REVOKED_MESSAGE: &str = "Token has been revoked";

/// Validates a presented access token and produces the identity context.
///
/// Every step is a hard gate and fails closed; success mutates no state.
pub struct Authenticator {
    codec: Arc<JwtCodec>,
    revocations: RevocationStore,
    users: Arc<dyn UserDirectory>,
    departments: Arc<DepartmentPolicy>,
}

impl Authenticator {
    pub fn new(
        codec: Arc<JwtCodec>,
        revocations: RevocationStore,
        users: Arc<dyn UserDirectory>,
        departments: Arc<DepartmentPolicy>,
    ) -> Self {
        Self {
            codec,
            revocations,
            users,
            departments,
        }
    }

    pub async fn authenticate(&self, raw_token: &str) -> Result<AuthenticatedUser, AppError> {
        // Gate 1: signature, expiry, issuer, token use
        let claims = self
            .codec
            .decode(raw_token, TokenUse::Access)
            .map_err(|e| {
                warn!("Access token rejected: {}", e);
                AppError::Auth(CREDENTIALS_MESSAGE.to_string())
            })?;

        let user_id = claims.subject_id().ok_or_else(|| {
            warn!("Access token carries a non-UUID subject: {}", claims.sub);
            AppError::Auth(CREDENTIALS_MESSAGE.to_string())
        })?;
        let jti = claims.token_id().ok_or_else(|| {
            warn!("Access token carries a non-UUID jti: {}", claims.jti);
            AppError::Auth(CREDENTIALS_MESSAGE.to_string())
        })?;
        let issued_at = claims.issued_at().ok_or_else(|| {
            warn!("Access token carries an out-of-range iat: {}", claims.iat);
            AppError::Auth(CREDENTIALS_MESSAGE.to_string())
        })?;

        // Gate 2: server-side revocation (individual and bulk)
        if self.revocations.is_revoked(&jti)
            || self.revocations.is_subject_revoked(&user_id, issued_at)
        {
            warn!("Revoked token presented for user {} (jti: {})", user_id, jti);
            return Err(AppError::Auth(REVOKED_MESSAGE.to_string()));
        }

        // Gate 3: the subject must still exist and be active. A directory
        // failure counts as absent: fail closed, never open.
        match self.users.get_by_id(&user_id).await {
            Ok(Some(user)) if user.is_active => {}
            Ok(Some(_)) => {
                warn!("Token subject {} is deactivated", user_id);
                return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
            }
            Ok(None) => {
                warn!("Token subject {} no longer exists", user_id);
                return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
            }
            Err(e) => {
                error!("User directory lookup failed, failing closed: {}", e);
                return Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()));
            }
        }

        // Gate 4: department resolution (fails closed on unknown roles)
        let department = self.departments.department_of(&claims.role_name)?.to_string();

        Ok(AuthenticatedUser {
            user_id,
            first_name: claims.first_name,
            last_name: claims.last_name,
            role_name: claims.role_name,
            permissions: claims.permissions.into_iter().collect(),
            department,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::UserRecord;
    use crate::services::auth::token_issuer::TokenIssuer;
    use crate::test_support::{
        department_policy, sample_user, test_auth_config, InMemoryUserDirectory,
    };
    use chrono::{Duration, Utc};
    use jsonwebtoken::Algorithm;
    use uuid::Uuid;

    struct Fixture {
        issuer: TokenIssuer,
        revocations: RevocationStore,
        directory: Arc<InMemoryUserDirectory>,
        authenticator: Authenticator,
    }

    fn fixture_with_user(user: &UserRecord) -> Fixture {
        let codec = Arc::new(JwtCodec::new("test-secret", &[], Algorithm::HS256));
        let issuer = TokenIssuer::new(codec.clone(), &test_auth_config());
        let revocations = RevocationStore::new();
        let directory = Arc::new(InMemoryUserDirectory::with_user(user.clone()));
        let authenticator = Authenticator::new(
            codec,
            revocations.clone(),
            directory.clone(),
            Arc::new(department_policy()),
        );
        Fixture {
            issuer,
            revocations,
            directory,
            authenticator,
        }
    }

    #[tokio::test]
    async fn valid_token_yields_identity_context() {
        let user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        let ctx = fx.authenticator.authenticate(&pair.access.token).await.unwrap();

        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.role_name, "editor");
        assert_eq!(ctx.department, "content");
        assert!(ctx.permissions.contains("post:write"));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        let jti = Uuid::parse_str(&pair.access.claims.jti).unwrap();
        fx.revocations.revoke(jti, Utc::now() + Duration::minutes(15));

        let err = fx.authenticator.authenticate(&pair.access.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(msg) if msg == REVOKED_MESSAGE));
    }

    #[tokio::test]
    async fn bulk_revocation_rejects_previously_issued_tokens() {
        let user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        fx.revocations.revoke_subject(
            user.id,
            Utc::now() + Duration::seconds(1),
            Utc::now() + Duration::days(7),
        );

        let err = fx.authenticator.authenticate(&pair.access.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(msg) if msg == REVOKED_MESSAGE));
    }

    #[tokio::test]
    async fn deleted_subject_is_unauthorized_not_forbidden() {
        let user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        // User deleted between issuance and the request
        fx.directory.remove(&user.id);

        let err = fx.authenticator.authenticate(&pair.access.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(msg) if msg == CREDENTIALS_MESSAGE));
    }

    #[tokio::test]
    async fn deactivated_subject_is_rejected() {
        let mut user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        // Deactivated between issuance and the request
        user.is_active = false;
        fx.directory.insert(user);

        let err = fx.authenticator.authenticate(&pair.access.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(msg) if msg == CREDENTIALS_MESSAGE));
    }

    #[tokio::test]
    async fn directory_failure_fails_closed() {
        let user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        fx.directory.fail_lookups(true);

        let err = fx.authenticator.authenticate(&pair.access.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_credential() {
        let user = sample_user();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        let err = fx.authenticator.authenticate(&pair.refresh.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(msg) if msg == CREDENTIALS_MESSAGE));
    }

    #[tokio::test]
    async fn unknown_role_in_token_fails_closed() {
        let mut user = sample_user();
        user.role_name = "ghost_role".to_string();
        let fx = fixture_with_user(&user);
        let pair = fx.issuer.issue_pair(&user).unwrap();

        let err = fx.authenticator.authenticate(&pair.access.token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
