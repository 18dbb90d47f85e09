use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::AppSettings;
use crate::db::connection::{create_pool, verify_connection};
use crate::db::repositories::{PgUserRepository, UserDirectory};
use crate::middleware::SecureAuthentication;
use crate::services::auth::{Authenticator, JwtCodec, RevocationStore, TokenIssuer};
use crate::services::authz::DepartmentPolicy;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load application settings
    let app_settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    // Build the JWT codec from the configured secrets
    let codec = match JwtCodec::from_settings(&app_settings.auth) {
        Ok(codec) => Arc::new(codec),
        Err(e) => {
            log::error!("Failed to initialize JWT codec: {}", e);
            log::error!("Cannot start server without working JWT keys");
            std::process::exit(1);
        }
    };
    log::info!("JWT codec initialized successfully");

    // Build the department policy from the configured role table
    let departments = match DepartmentPolicy::from_settings(&app_settings.authz) {
        Ok(policy) => Arc::new(policy),
        Err(e) => {
            log::error!("Failed to load department policy: {}", e);
            log::error!("Cannot start server without a valid role/department table");
            std::process::exit(1);
        }
    };

    // Database connection setup
    let db_pool = match create_pool(&app_settings.database.url).await {
        Ok(pool) => {
            // Verify the database connection
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    let users: Arc<dyn UserDirectory> = Arc::new(PgUserRepository::new(db_pool.clone()));

    // In-memory revocation state with a periodic sweep of expired entries
    let revocations = RevocationStore::new();
    revocations.start_cleanup_task(app_settings.auth.revocation_sweep_interval_secs);

    let issuer = TokenIssuer::new(codec.clone(), &app_settings.auth);
    let authenticator = Arc::new(Authenticator::new(
        codec.clone(),
        revocations.clone(),
        users.clone(),
        departments.clone(),
    ));

    // Get server host and port from settings
    let host = &app_settings.server.host;
    let port = app_settings.server.port;

    log::info!("Starting server at http://{}:{}", host, port);

    let server_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(server_addr)?;

    HttpServer::new(move || {
        let app_settings = app_settings.clone();

        // Configure CORS using actix-cors
        let mut cors = Cors::default().supports_credentials();

        // Add allowed origins based on configuration
        if app_settings.server.cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &app_settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        // Common CORS settings for all origins
        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(app_settings.clone()))
            .app_data(web::Data::from(users.clone()))
            .app_data(web::Data::from(codec.clone()))
            .app_data(web::Data::from(departments.clone()))
            .app_data(web::Data::new(issuer.clone()))
            .app_data(web::Data::new(revocations.clone()))
            // Health check endpoint without auth
            .service(web::resource("/health").route(web::get().to(handlers::health::health_check)))
            // Public auth routes
            .service(web::scope("/auth").configure(routes::configure_public_auth_routes))
            // Protected API routes with authentication
            .service(
                web::scope("/api")
                    .wrap(SecureAuthentication::new(authenticator.clone()))
                    .configure(routes::configure_routes),
            )
    })
    .listen(listener)?
    .run()
    .await
}
