//! Launchpad Infrastructure - Collaborator Gateway
//!
//! Implements the outbound ports (business persistence, content generation,
//! scaffolding, campaign analysis, payments, notifications) against a single
//! JSON-RPC endpoint.
//!
//! ```no_run
//! use launchpad_infra_gateway::{GatewayClient, GatewayConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = GatewayClient::connect(&GatewayConfig::new(
//!     "http://127.0.0.1:9600",
//!     Duration::from_secs(30),
//! ))?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{methods, GatewayClient, GatewayConfig};
pub use error::GatewayError;
