//! Error types for Notewarden
//!
//! Every failure maps to a stable status code and machine code. Messages for
//! infrastructure failures are replaced with a generic one before they reach
//! a client; the detail only goes to the log.

use hyper::StatusCode;

use crate::auth::TokenError;

/// Main error type for Notewarden operations
#[derive(Debug, thiserror::Error)]
pub enum NotewardenError {
    /// Missing, malformed, tampered or expired token
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid token, role not in the route's allow-list
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Valid identity that is neither the author nor an admin
    #[error("Permission denied")]
    PermissionDenied,

    #[error("User has already voted on this {0}")]
    DuplicateVote(String),

    #[error("Invalid vote type: {0}")]
    InvalidVoteType(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Persistence collaborator failure
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotewardenError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::DuplicateVote(_) => StatusCode::BAD_REQUEST,
            Self::InvalidVoteType(_) => StatusCode::BAD_REQUEST,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::DuplicateVote(_) => "DUPLICATE_VOTE",
            Self::InvalidVoteType(_) => "INVALID_VOTE_TYPE",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::RepositoryUnavailable(_) => "REPOSITORY_UNAVAILABLE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to a client
    pub fn public_message(&self) -> String {
        match self {
            Self::RepositoryUnavailable(_) => "Service temporarily unavailable".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the error points at the server rather than the caller
    pub fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<TokenError> for NotewardenError {
    fn from(err: TokenError) -> Self {
        Self::Unauthenticated(err.to_string())
    }
}

impl From<serde_json::Error> for NotewardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::ValidationFailed(format!("Invalid JSON: {}", err))
    }
}

impl From<mongodb::error::Error> for NotewardenError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::RepositoryUnavailable(err.to_string())
    }
}

impl From<bson::ser::Error> for NotewardenError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encoding failed: {}", err))
    }
}

impl From<std::io::Error> for NotewardenError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for Notewarden operations
pub type Result<T> = std::result::Result<T, NotewardenError>;
