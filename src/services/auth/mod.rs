pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod revocation_store;
pub mod token_issuer;

pub use authenticator::Authenticator;
pub use jwt::JwtCodec;
pub use revocation_store::RevocationStore;
pub use token_issuer::{TokenIssuer, TokenPair};
