//! Shared fixtures for unit tests: an in-memory user directory and canned
//! users, settings and policies.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::config::settings::AuthConfig;
use crate::db::repositories::{UserDirectory, UserRecord};
use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::services::auth::password::hash_password;
use crate::services::authz::DepartmentPolicy;

/// In-memory `UserDirectory` with a switch to simulate collaborator outages.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<Uuid, UserRecord>,
    fail: AtomicBool,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: UserRecord) -> Self {
        let directory = Self::new();
        directory.insert(user);
        directory
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&self, id: &Uuid) {
        self.users.remove(id);
    }

    /// When set, every lookup returns a directory error.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(AppError::Database("user directory unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_id(&self, id: &Uuid) -> Result<Option<UserRecord>, AppError> {
        self.check_available()?;
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        self.check_available()?;
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }
}

pub fn sample_user() -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        email: "ada@example.com".to_string(),
        password_hash: None,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role_name: "editor".to_string(),
        permissions: vec!["post:read".to_string(), "post:write".to_string()],
        is_active: true,
    }
}

pub fn user_with_password(email: &str, password: &str) -> UserRecord {
    let mut user = sample_user();
    user.email = email.to_string();
    user.password_hash = Some(hash_password(password).unwrap());
    user
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_string(),
        jwt_fallback_secrets: Vec::new(),
        jwt_algorithm: "HS256".to_string(),
        access_token_ttl_minutes: 15,
        refresh_token_ttl_days: 7,
        revocation_sweep_interval_secs: 300,
    }
}

pub fn department_policy() -> DepartmentPolicy {
    let mut table = HashMap::new();
    table.insert("editor".to_string(), "content".to_string());
    table.insert("author".to_string(), "content".to_string());
    table.insert("engineer".to_string(), "eng".to_string());
    table.insert("sales_manager".to_string(), "sales".to_string());
    table.insert("superadmin".to_string(), "management".to_string());
    DepartmentPolicy::new(table, "superadmin".to_string()).unwrap()
}

pub fn authenticated_user(role: &str, department: &str, permissions: &[&str]) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role_name: role.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        department: department.to_string(),
    }
}
