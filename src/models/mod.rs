pub mod auth_claims;
pub mod authenticated_user;

pub use auth_claims::{Claims, TokenUse};
pub use authenticated_user::AuthenticatedUser;
