//! Token codec for stateless identity claims
//!
//! Issues and verifies HS256 JWTs carrying a subject id and a role.
//!
//! Security notes:
//! - The signing secret lives in the codec instance, built once from config
//! - Default expiry is 24 hours; clients refresh instead of holding sessions
//! - Expiry is checked here, not by the library: a token is expired at the
//!   exact second named by `exp`
//! - Rotating the secret invalidates every outstanding token

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::auth::Role;
use crate::types::NotewardenError;

/// Default token lifetime: one day
pub const DEFAULT_EXPIRY_SECONDS: u64 = 24 * 60 * 60;

const MIN_SECRET_LEN: usize = 32;

/// Payload stored in the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id of the caller
    pub sub: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Token id, only used to correlate log lines
    pub jti: String,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Why a token was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid signature")]
    SignatureInvalid,
    #[error("Token expired")]
    Expired,
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs and verifies identity tokens with a process-wide secret
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
    expiry_seconds: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a new codec
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, NotewardenError> {
        if secret.is_empty() {
            return Err(NotewardenError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(NotewardenError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        if expiry_seconds == 0 {
            return Err(NotewardenError::Config(
                "JWT_EXPIRY_SECONDS must be greater than zero".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a codec for dev mode (fixed, insecure secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: DEFAULT_EXPIRY_SECONDS,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Issue a token for an account
    pub fn issue(&self, subject_id: &str, role: Role) -> Result<IssuedToken, NotewardenError> {
        self.issue_at(subject_id, role, unix_now()?)
    }

    /// Issue a token as if the clock read `now`
    pub fn issue_at(
        &self,
        subject_id: &str,
        role: Role,
        now: u64,
    ) -> Result<IssuedToken, NotewardenError> {
        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(self.expiry_seconds),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| NotewardenError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify and decode a token
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let now = unix_now().map_err(|_| TokenError::Expired)?;
        self.verify_at(token, now)
    }

    /// Verify a token as if the clock read `now`
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let mapped = match err.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            };
            debug!("Token rejected: {} ({:?})", mapped, err.kind());
            mapped
        })?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Re-issue a still-valid token with a fresh expiry
    pub fn refresh(&self, token: &str) -> Result<IssuedToken, NotewardenError> {
        let claims = self.verify(token)?;
        self.issue(&claims.sub, claims.role)
    }
}

fn unix_now() -> Result<u64, NotewardenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| NotewardenError::Internal(format!("System time error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_750_000_000;

    fn test_codec() -> TokenCodec {
        TokenCodec::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            DEFAULT_EXPIRY_SECONDS,
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let codec = test_codec();

        let issued = codec.issue_at("user-123", Role::User, NOW).unwrap();
        assert!(!issued.token.is_empty());
        assert_eq!(issued.expires_at, NOW + DEFAULT_EXPIRY_SECONDS);

        let claims = codec.verify_at(&issued.token, NOW + 60).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.iat, NOW);
    }

    #[test]
    fn test_verify_with_system_clock() {
        let codec = test_codec();
        let issued = codec.issue("admin-1", Role::Admin).unwrap();
        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "admin-1");
        assert!(claims.is_admin());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let codec = test_codec();
        let issued = codec.issue_at("user-123", Role::User, NOW).unwrap();

        assert!(codec.verify_at(&issued.token, issued.expires_at - 1).is_ok());
        assert_eq!(
            codec.verify_at(&issued.token, issued.expires_at),
            Err(TokenError::Expired)
        );
        assert_eq!(
            codec.verify_at(&issued.token, issued.expires_at + 3600),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_malformed_token() {
        let codec = test_codec();
        assert_eq!(codec.verify_at("garbage", NOW), Err(TokenError::Malformed));
        assert_eq!(codec.verify_at("", NOW), Err(TokenError::Malformed));
        assert_eq!(codec.verify_at("a.b.c", NOW), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_secret() {
        let codec1 = test_codec();
        let codec2 = TokenCodec::new(
            "different-secret-that-is-at-least-32-characters".into(),
            DEFAULT_EXPIRY_SECONDS,
        )
        .unwrap();

        let issued = codec1.issue_at("user-123", Role::User, NOW).unwrap();
        assert_eq!(
            codec2.verify_at(&issued.token, NOW),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn test_tampered_signature() {
        let codec = test_codec();
        let issued = codec.issue_at("user-123", Role::User, NOW).unwrap();

        let (signed, signature) = issued.token.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", signed, flipped, &signature[1..]);

        assert_eq!(
            codec.verify_at(&tampered, NOW),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn test_secret_validation() {
        assert!(TokenCodec::new("short".into(), 3600).is_err());
        assert!(TokenCodec::new("".into(), 3600).is_err());
        assert!(TokenCodec::new("this-secret-is-at-least-32-chars-long".into(), 0).is_err());
        assert!(TokenCodec::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }

    #[test]
    fn test_refresh_keeps_identity() {
        let codec = test_codec();
        let issued = codec.issue("user-9", Role::User).unwrap();
        let refreshed = codec.refresh(&issued.token).unwrap();

        let claims = codec.verify(&refreshed.token).unwrap();
        assert_eq!(claims.sub, "user-9");
        assert_eq!(claims.role, Role::User);
        assert!(refreshed.expires_at >= issued.expires_at);
    }

    #[test]
    fn test_refresh_rejects_garbage() {
        let codec = test_codec();
        let err = codec.refresh("garbage").unwrap_err();
        assert!(matches!(err, NotewardenError::Unauthenticated(_)));
    }

    #[test]
    fn test_dev_mode_codec() {
        let codec = TokenCodec::new_dev();
        let issued = codec.issue("dev-user", Role::Admin).unwrap();
        assert!(codec.verify(&issued.token).is_ok());
    }
}
