use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// A user as the authentication core sees it: identity, credential hash and
/// the role/permission snapshot eagerly resolved from the role assignment.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
}

/// User-lookup collaborator. The authentication core only ever needs these
/// two reads; swapping the Postgres implementation for an in-memory one (as
/// the tests do) must not touch any call site.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, id: &Uuid) -> Result<Option<UserRecord>, AppError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    role_name: String,
    is_active: bool,
}

pub struct PgUserRepository {
    db_pool: PgPool,
}

impl PgUserRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn load_permissions(&self, role_name: &str) -> Result<Vec<String>, AppError> {
        // Raw queries instead of the macros to avoid compile-time database checks
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.name
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN roles r ON r.id = rp.role_id
            WHERE r.name = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_name)
        .fetch_all(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch role permissions: {}", e)))
    }

    async fn into_record(&self, row: Option<UserRow>) -> Result<Option<UserRecord>, AppError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let permissions = self.load_permissions(&row.role_name).await?;
        Ok(Some(UserRecord {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role_name: row.role_name,
            permissions,
            is_active: row.is_active,
        }))
    }
}

#[async_trait]
impl UserDirectory for PgUserRepository {
    async fn get_by_id(&self, id: &Uuid) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name,
                   r.name AS role_name, u.is_active
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch user: {}", e)))?;

        self.into_record(row).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name,
                   r.name AS role_name, u.is_active
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch user by email: {}", e)))?;

        self.into_record(row).await
    }
}
