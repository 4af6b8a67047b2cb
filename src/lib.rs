//! Subspace Client
//!
//! Network resilience layer for the Subspace messaging backend:
//! - Resilient request executor with bearer auth and a closed error taxonomy
//! - Deterministic exponential-backoff retry policies
//! - Self-healing realtime channel over WebSocket
//! - Typed TTL cache for service responses
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use subspace_client::{auth::InMemoryCredentialStore, RetryPolicy};
//! use subspace_client::client::RequestDescriptor;
//! use subspace_client::types::User;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(InMemoryCredentialStore::new());
//!     let client = subspace_client::create_client_from_env(credentials)?;
//!
//!     let user: User = client
//!         .request_with_retry(&RequestDescriptor::get("users/42"), &RetryPolicy::standard())
//!         .await?;
//!
//!     println!("Hello, {}", user.display_name());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `realtime` - Enable the WebSocket realtime channel (default)
//! - `rustls` / `native-tls` - TLS backend for the HTTP client
//! - `full` - Enable all features

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Core modules
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod transport;
pub mod types;

// Services
pub mod services;

// Real-time features
pub mod realtime;

// Resilience
pub mod cache;
pub mod resilience;

// Observability
pub mod observability;

// Testing utilities
pub mod mocks;

// Tests
#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use cache::Cache;
pub use client::{ApiClient, RequestDescriptor};
pub use config::{ClientConfig, ClientConfigBuilder, Environment};
pub use errors::{ConfigResult, ConfigurationError, NetworkError, NetworkResult};
pub use resilience::RetryPolicy;

/// Default base URL for the REST API
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Default URL of the realtime endpoint
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:8080/ws";

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default realtime keepalive interval in seconds
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

/// Default realtime reconnect delay in seconds
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 3;

/// Default cache entry lifetime in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Create a client with the given configuration
pub fn create_client(
    config: ClientConfig,
    credentials: std::sync::Arc<dyn auth::CredentialStore>,
) -> ConfigResult<ApiClient> {
    ApiClient::new(config, credentials)
}

/// Create a client from environment variables
///
/// Reads:
/// - `SUBSPACE_ENV` - Deployment environment selecting default endpoints
/// - `API_BASE_URL` - REST base URL override
/// - `WEBSOCKET_URL` - Realtime endpoint override
/// - `SUBSPACE_TIMEOUT_SECS` - Per-request timeout
pub fn create_client_from_env(
    credentials: std::sync::Arc<dyn auth::CredentialStore>,
) -> ConfigResult<ApiClient> {
    let config = ClientConfig::from_env()?;
    create_client(config, credentials)
}
