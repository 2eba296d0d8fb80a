//! HTTP client factory.
//!
//! All clients share the same User-Agent, `tcp_nodelay` and connect timeout;
//! they differ only in their total request timeout:
//! - `create_probe_client()` - short timeout for health/readiness probes
//! - `create_client(timeout, connect)` - timeouts taken from configuration
//! - `create_client_with_timeout(duration)` - custom timeout

use std::time::Duration;

use reqwest::Client;

use crate::error::{ClientError, Result};

/// User-Agent string for all HTTP requests
pub const USER_AGENT: &str = concat!("modeld-client/", env!("CARGO_PKG_VERSION"));

/// Timeout for inference streams (5 minutes)
pub const STREAMING_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for a single readiness probe (5 seconds)
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connection timeout (10 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates an HTTP client for readiness probes.
pub fn create_probe_client() -> Result<Client> {
    create_client_with_timeout(PROBE_TIMEOUT)
}

/// Creates an HTTP client with a custom total timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client> {
    create_client(timeout, DEFAULT_CONNECT_TIMEOUT.min(timeout))
}

/// Creates an HTTP client with explicit total and connect timeouts.
pub fn create_client(timeout: Duration, connect_timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .tcp_nodelay(true)
        .build()
        .map_err(|e| ClientError::Config {
            message: format!("Failed to build HTTP client: {e}"),
        })
}
