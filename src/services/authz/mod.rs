//! Authorization gates evaluated against an already-authenticated identity.
//!
//! Each gate is a pure predicate over the `AuthenticatedUser` context; gates
//! compose by conjunction and evaluation order does not affect the outcome.

use std::collections::HashMap;

use log::error;

use crate::config::settings::AuthzConfig;
use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::services::auth::authenticator::CREDENTIALS_MESSAGE;

/// Passes iff the permission is literally present in the context's snapshot.
/// Exact string match, no wildcard or prefix semantics.
pub fn require_permission(user: &AuthenticatedUser, permission: &str) -> Result<(), AppError> {
    if user.permissions.contains(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Permission '{}' required",
            permission
        )))
    }
}

/// Passes iff the context's single role equals the required one.
pub fn require_role(user: &AuthenticatedUser, role: &str) -> Result<(), AppError> {
    if user.role_name == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Role '{}' required", role)))
    }
}

/// Static role -> department table plus the designated superadmin role.
/// Loaded once at startup; an empty table or an unregistered superadmin role
/// is a configuration error that must abort startup.
#[derive(Clone, Debug)]
pub struct DepartmentPolicy {
    role_departments: HashMap<String, String>,
    superadmin_role: String,
}

impl DepartmentPolicy {
    pub fn new(
        role_departments: HashMap<String, String>,
        superadmin_role: String,
    ) -> Result<Self, AppError> {
        if role_departments.is_empty() {
            return Err(AppError::Configuration(
                "Role -> department table must not be empty".to_string(),
            ));
        }
        if !role_departments.contains_key(&superadmin_role) {
            return Err(AppError::Configuration(format!(
                "Superadmin role '{}' is not registered in the role -> department table",
                superadmin_role
            )));
        }
        Ok(Self {
            role_departments,
            superadmin_role,
        })
    }

    pub fn from_settings(authz: &AuthzConfig) -> Result<Self, AppError> {
        Self::new(authz.role_departments.clone(), authz.superadmin_role.clone())
    }

    pub fn superadmin_role(&self) -> &str {
        &self.superadmin_role
    }

    /// Resolve the department a role belongs to.
    ///
    /// A role that reaches this point without being registered means a token
    /// carries a role the deployment does not know about. That is a
    /// data-integrity problem, logged loudly and failed closed as a 401.
    pub fn department_of(&self, role_name: &str) -> Result<&str, AppError> {
        match self.role_departments.get(role_name) {
            Some(department) => Ok(department),
            None => {
                error!(
                    "DATA INTEGRITY: role '{}' is absent from the role -> department table; \
                     rejecting the request",
                    role_name
                );
                Err(AppError::Auth(CREDENTIALS_MESSAGE.to_string()))
            }
        }
    }

    /// Department-scoping gate: superadmins pass everywhere, everyone else
    /// only within their own department.
    pub fn require_same_department_or_superadmin(
        &self,
        user: &AuthenticatedUser,
        target_department: &str,
    ) -> Result<(), AppError> {
        if user.role_name == self.superadmin_role || user.department == target_department {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Access restricted to department '{}'",
                target_department
            )))
        }
    }
}
