use actix_web::{
    Error, HttpMessage, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
};
use futures_util::future::{Ready, ok, ready};
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::AppError;
use crate::services::auth::Authenticator;

// Marker struct to indicate request has already been processed by auth middleware
#[derive(Debug)]
struct AuthProcessed;

/// Authentication middleware guarding the protected route tree.
///
/// Extracts the bearer credential, runs it through the `Authenticator` and
/// inserts the resulting `AuthenticatedUser` into request extensions for
/// handlers to extract. All failures terminate the request with a 401.
#[derive(Clone)]
pub struct SecureAuthentication {
    authenticator: Arc<Authenticator>,
}

impl SecureAuthentication {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecureAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SecureAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecureAuthenticationMiddleware {
            service: Arc::new(service),
            authenticator: self.authenticator.clone(),
        })
    }
}

pub struct SecureAuthenticationMiddleware<S> {
    service: Arc<S>,
    authenticator: Arc<Authenticator>,
}

impl<S, B> Service<ServiceRequest> for SecureAuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        debug!("Authentication middleware called for: {} {}", req.method(), req.path());

        // Check if request has already been processed by this middleware
        if req.extensions().get::<AuthProcessed>().is_some() {
            debug!("Request already processed by auth middleware, skipping");
            return Box::pin(async move {
                service.call(req).await.map(ServiceResponse::map_into_left_body)
            });
        }

        // Skip auth check for OPTIONS requests (CORS pre-flight)
        let path = req.path().to_string();
        if req.method() == actix_web::http::Method::OPTIONS {
            debug!("Skipping authentication for OPTIONS request to: {}", path);
            req.extensions_mut().insert(AuthProcessed);
            return Box::pin(async move {
                service.call(req).await.map(ServiceResponse::map_into_left_body)
            });
        }

        req.extensions_mut().insert(AuthProcessed);

        // Extract the token from the Authorization header
        let auth_header = match req.headers().get(AUTHORIZATION) {
            Some(header) => header,
            None => {
                warn!("No Authorization header found for path: {}", path);
                let err = AppError::Auth("Missing Authorization header".to_string());
                return Box::pin(ready(Ok(
                    req.into_response(err.error_response()).map_into_right_body(),
                )));
            }
        };

        let auth_str = match auth_header.to_str() {
            Ok(s) => s,
            Err(_) => {
                warn!("Invalid Authorization header encoding for path: {}", path);
                let err = AppError::Auth("Invalid Authorization header".to_string());
                return Box::pin(ready(Ok(
                    req.into_response(err.error_response()).map_into_right_body(),
                )));
            }
        };

        // Check for Bearer token format
        if !auth_str.starts_with("Bearer ") {
            warn!("Invalid Authorization header format (not Bearer) for path: {}", path);
            let err = AppError::Auth(
                "Invalid Authorization format, expected Bearer token".to_string(),
            );
            return Box::pin(ready(Ok(
                req.into_response(err.error_response()).map_into_right_body(),
            )));
        }

        let token = auth_str[7..].trim(); // Strip "Bearer " prefix
        if token.is_empty() {
            warn!("Empty Bearer token for path: {}", path);
            let err = AppError::Auth("Empty Bearer token".to_string());
            return Box::pin(ready(Ok(
                req.into_response(err.error_response()).map_into_right_body(),
            )));
        }

        let token = token.to_string();
        let authenticator = self.authenticator.clone();

        Box::pin(async move {
            match authenticator.authenticate(&token).await {
                Ok(user) => {
                    debug!(
                        "Authenticated user {} (role: {}) for route {}",
                        user.user_id, user.role_name, path
                    );
                    req.extensions_mut().insert(user);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(e) => Ok(req.into_response(e.error_response()).map_into_right_body()),
            }
        })
    }
}
