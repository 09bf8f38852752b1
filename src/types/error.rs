//! Error types for the submission backend

use hyper::StatusCode;

/// Reasons a bearer credential failed to produce a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential")]
    Missing,

    #[error("malformed credential")]
    Malformed,

    #[error("credential expired")]
    Expired,
}

/// Main error type for the backend
#[derive(Debug, thiserror::Error)]
pub enum MicError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A status-conditional update matched no rows
    #[error("not found or already processed")]
    TransitionConflict,

    #[error("invalid decision")]
    InvalidDecision(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MicError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            MicError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MicError::Forbidden(_) => StatusCode::FORBIDDEN,
            MicError::TransitionConflict => StatusCode::CONFLICT,
            MicError::InvalidDecision(_) => StatusCode::BAD_REQUEST,
            MicError::Validation(_) => StatusCode::BAD_REQUEST,
            MicError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MicError::NotFound(_) => StatusCode::NOT_FOUND,
            MicError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            MicError::Email(_) => StatusCode::BAD_GATEWAY,
            MicError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            MicError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MicError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for error bodies
    pub fn code(&self) -> &'static str {
        match self {
            MicError::Unauthorized(AuthError::Missing) => "AUTH_REQUIRED",
            MicError::Unauthorized(AuthError::Malformed) => "INVALID_TOKEN",
            MicError::Unauthorized(AuthError::Expired) => "TOKEN_EXPIRED",
            MicError::Forbidden(_) => "FORBIDDEN",
            MicError::TransitionConflict => "TRANSITION_CONFLICT",
            MicError::InvalidDecision(_) => "INVALID_DECISION",
            MicError::Validation(_) => "VALIDATION_FAILED",
            MicError::BadRequest(_) => "BAD_REQUEST",
            MicError::NotFound(_) => "NOT_FOUND",
            MicError::Database(_) => "DATABASE_UNAVAILABLE",
            MicError::Email(_) => "EMAIL_FAILED",
            MicError::Collaborator(_) => "COLLABORATOR_UNAVAILABLE",
            MicError::Config(_) => "CONFIG_ERROR",
            MicError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show an HTTP caller. Backend details stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            MicError::Database(_) => "Persistence unavailable".into(),
            MicError::Config(_) | MicError::Internal(_) => "Internal server error".into(),
            MicError::InvalidDecision(_) => "invalid decision".into(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for MicError {
    fn from(err: std::io::Error) -> Self {
        MicError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for MicError {
    fn from(err: serde_json::Error) -> Self {
        MicError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for MicError {
    fn from(err: hyper::Error) -> Self {
        MicError::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for MicError {
    fn from(err: mongodb::error::Error) -> Self {
        MicError::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for MicError {
    fn from(err: bson::ser::Error) -> Self {
        MicError::Database(format!("BSON encoding failed: {}", err))
    }
}

impl From<reqwest::Error> for MicError {
    fn from(err: reqwest::Error) -> Self {
        MicError::Collaborator(err.to_string())
    }
}

/// Result type alias using MicError
pub type Result<T> = std::result::Result<T, MicError>;
