use std::collections::HashMap;
use std::env;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub authz: AuthzConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Primary signing/verification secret.
    pub jwt_secret: String,
    /// Previous secrets still accepted for verification (key rotation).
    pub jwt_fallback_secrets: Vec<String>,
    pub jwt_algorithm: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub revocation_sweep_interval_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Role name -> department identifier. Every role a token can carry must
    /// be registered here.
    pub role_departments: HashMap<String, String>,
    pub superadmin_role: String,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "cms-api".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Database config
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        // CORS origins
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        // Auth config
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Configuration("JWT_SECRET must be set".to_string()))?;
        if jwt_secret.trim().is_empty() {
            return Err(AppError::Configuration("JWT_SECRET must not be empty".to_string()));
        }

        // Comma-separated list of previously active secrets; tokens signed
        // with any of these still verify until they expire.
        let jwt_fallback_secrets = env::var("JWT_FALLBACK_SECRETS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let jwt_algorithm = env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());

        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("ACCESS_TOKEN_TTL_MINUTES must be a valid number".to_string()))?;

        let refresh_token_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("REFRESH_TOKEN_TTL_DAYS must be a valid number".to_string()))?;

        if access_token_ttl_minutes <= 0 || refresh_token_ttl_days <= 0 {
            return Err(AppError::Configuration(
                "Token TTLs must be positive".to_string(),
            ));
        }

        let revocation_sweep_interval_secs = env::var("REVOCATION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("REVOCATION_SWEEP_INTERVAL_SECS must be a valid number".to_string()))?;

        // Authorization config
        let role_departments_raw = env::var("ROLE_DEPARTMENTS")
            .map_err(|_| AppError::Configuration("ROLE_DEPARTMENTS must be set".to_string()))?;
        let role_departments = parse_role_departments(&role_departments_raw)?;

        let superadmin_role = env::var("SUPERADMIN_ROLE").unwrap_or_else(|_| "superadmin".to_string());

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            database: DatabaseConfig {
                url: database_url,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_fallback_secrets,
                jwt_algorithm,
                access_token_ttl_minutes,
                refresh_token_ttl_days,
                revocation_sweep_interval_secs,
            },
            authz: AuthzConfig {
                role_departments,
                superadmin_role,
            },
        })
    }
}

/// Parses a `role:department` comma list, e.g.
/// `editor:content,author:content,sales_manager:sales,superadmin:management`.
fn parse_role_departments(raw: &str) -> Result<HashMap<String, String>, AppError> {
    let mut table = HashMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (role, department) = entry.split_once(':').ok_or_else(|| {
            AppError::Configuration(format!(
                "ROLE_DEPARTMENTS entry '{}' must be in role:department form",
                entry
            ))
        })?;
        let role = role.trim();
        let department = department.trim();
        if role.is_empty() || department.is_empty() {
            return Err(AppError::Configuration(format!(
                "ROLE_DEPARTMENTS entry '{}' has an empty role or department",
                entry
            )));
        }
        if table.insert(role.to_string(), department.to_string()).is_some() {
            return Err(AppError::Configuration(format!(
                "ROLE_DEPARTMENTS lists role '{}' more than once",
                role
            )));
        }
    }
    if table.is_empty() {
        return Err(AppError::Configuration(
            "ROLE_DEPARTMENTS must contain at least one role:department entry".to_string(),
        ));
    }
    Ok(table)
}
