//! Authentication: token issuance, password hashing and external identity

pub mod identity;
pub mod jwt;
pub mod password;

pub use identity::{GoogleIdentityProvider, GoogleProfile, IdentityProvider, StaticIdentityProvider};
pub use jwt::{Claims, TokenPair, TokenService, TokenType};
pub use password::{hash_password, verify_password};
