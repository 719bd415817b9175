// Failures reported by external collaborators (AI, scaffolding, campaigns,
// payments, business persistence)

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator rejected request: {0}")]
    Rejected(String),

    #[error("collaborator timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed collaborator response: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    /// A rejected request fails the same way next time
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CollaboratorError::Rejected(_))
    }
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;
