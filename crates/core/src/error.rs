// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid job kind: no queue handles '{0}'")]
    InvalidKind(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] crate::port::CollaboratorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same work could succeed.
    ///
    /// Bad input never gets better on a second attempt; everything that
    /// depends on I/O might.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Collaborator(e) => e.is_retryable(),
            AppError::Domain(_)
            | AppError::Validation(_)
            | AppError::InvalidKind(_)
            | AppError::Serialization(_)
            | AppError::Config(_)
            | AppError::NotFound(_) => false,
            _ => true,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Store adapters report failures as plain strings (orphan rules keep
// sqlx::Error conversions inside the adapter crate)
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Store(err)
    }
}
