//! Gateway Error Types

use jsonrpsee::core::ClientError;
use launchpad_core::port::CollaboratorError;
use thiserror::Error;

/// JSON-RPC codes that mean the request itself is wrong
const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;
const CLIENT_ERROR_CODES: std::ops::Range<i32> = 4000..5000;

/// Failure to set the gateway up (calls report `CollaboratorError`)
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid gateway URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Classify a client failure so the worker knows whether to retry
pub(crate) fn map_client_error(err: ClientError, timeout_ms: u64) -> CollaboratorError {
    match err {
        ClientError::Call(call) => {
            let code = call.code();
            let message = format!("{} ({})", call.message(), code);
            if code == INVALID_PARAMS || code == METHOD_NOT_FOUND || CLIENT_ERROR_CODES.contains(&code)
            {
                CollaboratorError::Rejected(message)
            } else {
                CollaboratorError::Unavailable(message)
            }
        }
        ClientError::RequestTimeout => CollaboratorError::Timeout(timeout_ms),
        ClientError::ParseError(e) => CollaboratorError::Malformed(e.to_string()),
        ClientError::Transport(e) => CollaboratorError::Unavailable(e.to_string()),
        ClientError::RestartNeeded(_) => {
            CollaboratorError::Unavailable("connection restart needed".to_string())
        }
        other => CollaboratorError::Unavailable(other.to_string()),
    }
}
