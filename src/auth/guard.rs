//! Access guard
//!
//! Turns a raw `Authorization` header into verified claims or a rejection.
//! Authentication always runs before the role check, so a bad token on an
//! admin route is `Unauthenticated`, never `Forbidden`.

use tracing::{debug, warn};

use crate::auth::{Claims, Role, TokenCodec};
use crate::types::NotewardenError;

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Stateless request gate
#[derive(Debug, Clone)]
pub struct AccessGuard {
    codec: TokenCodec,
}

impl AccessGuard {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify the caller and check the role allow-list
    ///
    /// An empty `required_roles` accepts any valid token.
    pub fn authorize(
        &self,
        required_roles: &[Role],
        auth_header: Option<&str>,
    ) -> Result<Claims, NotewardenError> {
        let token = extract_bearer_token(auth_header).ok_or_else(|| {
            debug!("Rejected request without bearer token");
            NotewardenError::Unauthenticated("No token provided".into())
        })?;

        let claims = self.codec.verify(token).map_err(|e| {
            warn!("Rejected token: {}", e);
            NotewardenError::from(e)
        })?;

        if !required_roles.is_empty() && !required_roles.contains(&claims.role) {
            warn!(
                "Forbidden: subject {} has role {}, route requires {:?}",
                claims.sub, claims.role, required_roles
            );
            return Err(NotewardenError::Forbidden(
                "Insufficient role for this operation".into(),
            ));
        }

        debug!("Authorized subject {} (jti {})", claims.sub, claims.jti);
        Ok(claims)
    }

    /// Verify the caller without a role check
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<Claims, NotewardenError> {
        self.authorize(&[], auth_header)
    }

    /// Verify the caller only if a header was sent
    ///
    /// A missing header yields `Ok(None)`; a present but invalid one is
    /// still rejected.
    pub fn authenticate_optional(
        &self,
        auth_header: Option<&str>,
    ) -> Result<Option<Claims>, NotewardenError> {
        match auth_header {
            None => Ok(None),
            Some(_) => self.authenticate(auth_header).map(Some),
        }
    }
}
