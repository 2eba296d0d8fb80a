//! Readiness polling.
//!
//! [`HealthPoller::poll`] probes a URL on a fixed interval until one of the
//! expected statuses is observed or the time budget runs out. Every probe
//! result counts, including error statuses; a request that fails outright
//! (connection refused, probe timeout) is recorded as status `0`.
//!
//! The poller keeps no state between calls. It has no cancellation of its
//! own beyond the budget; wrap the future in `tokio::select!` to stop early.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::http_client::{create_client_with_timeout, create_probe_client};

/// Status recorded when a probe gets no HTTP response at all.
pub const NO_RESPONSE: u16 = 0;

/// A single status probe.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// Probe `url` and return the HTTP status, or [`NO_RESPONSE`].
    async fn status(&self, url: &str) -> u16;
}

/// Probe that issues an HTTP GET and ignores the body.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Create a probe with the default per-request timeout.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_probe_client()?,
        })
    }

    /// Create a probe whose individual requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn status(&self, url: &str) -> u16 {
        match self.client.get(url).send().await {
            Ok(response) => response.status().as_u16(),
            Err(e) => {
                debug!(url = %url, error = %e, "Probe request failed");
                NO_RESPONSE
            }
        }
    }
}

/// Successful poll result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPollOutcome {
    pub final_status: u16,
    pub elapsed_ms: u64,
}

/// Polls a URL until it reports an expected status.
#[derive(Debug, Clone)]
pub struct HealthPoller<P = HttpProbe> {
    probe: P,
}

impl HealthPoller<HttpProbe> {
    /// Create a poller that probes over HTTP.
    pub fn new() -> Result<Self> {
        Ok(Self::with_probe(HttpProbe::new()?))
    }
}

impl<P: Probe> HealthPoller<P> {
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }

    /// Poll `url` every `interval` until its status is in `expected`.
    ///
    /// The budget is checked before every probe after the first, and the
    /// last sleep is shortened to end on the deadline, so no probe starts
    /// once `timeout` has passed. At least one probe is always made. On
    /// expiry returns [`ClientError::Timeout`] with the last observed status.
    pub async fn poll(
        &self,
        url: &str,
        expected: &[u16],
        interval: Duration,
        timeout: Duration,
    ) -> Result<HealthPollOutcome> {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut last_status = NO_RESPONSE;

        loop {
            if attempts > 0 && started.elapsed() >= timeout {
                warn!(url = %url, last_status, attempts, "Timed out waiting for endpoint");
                return Err(ClientError::poll_timeout(
                    expected,
                    last_status,
                    started.elapsed(),
                ));
            }

            let status = self.probe.status(url).await;
            attempts += 1;
            last_status = status;
            let elapsed = started.elapsed();
            debug!(url = %url, status, attempts, "Probe result");

            if expected.contains(&status) {
                info!(url = %url, status, elapsed_ms = elapsed.as_millis() as u64, "Endpoint ready");
                return Ok(HealthPollOutcome {
                    final_status: status,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            let remaining = timeout.saturating_sub(elapsed);
            tokio::time::sleep(interval.min(remaining)).await;
        }
    }
}

/// Poll `url` over HTTP with a fresh [`HealthPoller`].
pub async fn poll(
    url: &str,
    expected: &[u16],
    interval: Duration,
    timeout: Duration,
) -> Result<HealthPollOutcome> {
    HealthPoller::new()?
        .poll(url, expected, interval, timeout)
        .await
}
