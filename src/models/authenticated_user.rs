use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpMessage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::{ready, Ready};
use uuid::Uuid;

/// Identity context produced by the authentication middleware and made
/// available to handlers through request extensions.
///
/// `permissions` and `department` are the snapshot carried by the validated
/// access token, not a live database view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role_name: String,
    pub permissions: HashSet<String>,
    pub department: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            ready(Ok(user.clone()))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not authenticated")))
        }
    }
}
