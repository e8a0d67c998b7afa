//! Authentication and authorization for Notewarden
//!
//! Provides:
//! - JWT token issuing and validation
//! - Bearer-token access guard with role allow-lists
//! - Account roles
//! - Password hashing with Argon2

pub mod guard;
pub mod jwt;
pub mod password;
pub mod roles;

pub use guard::{extract_bearer_token, AccessGuard};
pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError, DEFAULT_EXPIRY_SECONDS};
pub use password::{hash_password, verify_password, Argon2Verifier, CredentialVerifier};
pub use roles::{Role, ADMIN_ONLY, ANY_ROLE, MEMBERS};
