//! JSON-RPC API Layer
//!
//! Exposes the orchestrator's typed enqueue, observability and admin
//! operations as versioned JSON-RPC 2.0 methods.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use error::RpcServerError;
pub use server::{methods, RpcServer, RpcServerConfig};
