//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use launchpad_core::error::AppError;
use thiserror::Error;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_ERROR: i32 = 5001;
    pub const COLLABORATOR_ERROR: i32 = 5002;
}

/// Server startup failures
#[derive(Debug, Error)]
pub enum RpcServerError {
    #[error("Failed to bind JSON-RPC server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register method: {0}")]
    Register(String),
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_)
        | AppError::InvalidKind(_)
        | AppError::Domain(_)
        | AppError::Serialization(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) => code::CONFLICT,
        AppError::Store(_) => code::STORE_ERROR,
        AppError::Collaborator(_) => code::COLLABORATOR_ERROR,
        AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_core::port::CollaboratorError;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            to_rpc_error(AppError::Validation("x".into())).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::InvalidKind("x".into())).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(to_rpc_error(AppError::NotFound("x".into())).code(), code::NOT_FOUND);
        assert_eq!(
            to_rpc_error(AppError::InvalidState("x".into())).code(),
            code::CONFLICT
        );
        assert_eq!(to_rpc_error(AppError::Store("x".into())).code(), code::STORE_ERROR);
        assert_eq!(
            to_rpc_error(AppError::Collaborator(CollaboratorError::Timeout(5))).code(),
            code::COLLABORATOR_ERROR
        );
    }

    #[test]
    fn test_message_keeps_context() {
        let err = to_rpc_error(AppError::NotFound("job j1".into()));
        assert!(err.message().contains("job j1"));
    }
}
