//! Poll command - wait for an endpoint to report an expected status.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use modeld_client::{ClientError, HealthPoller, HttpProbe};

use crate::cli::GlobalArgs;

/// Arguments for the poll command.
#[derive(Debug, Parser)]
pub struct PollCommand {
    /// URL to probe with GET
    #[arg(value_name = "URL")]
    pub url: String,

    /// Status code that ends the wait
    #[arg(value_name = "EXPECTED", default_value_t = 200)]
    pub expected: u16,

    /// Overall budget in seconds (defaults to the configured poll timeout)
    #[arg(value_name = "TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Additional status codes that also end the wait
    #[arg(long, value_name = "STATUS")]
    pub also: Vec<u16>,

    /// Delay between probes in milliseconds (defaults to the configured interval)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl PollCommand {
    /// All statuses accepted as success, primary first.
    pub fn expected_statuses(&self) -> Vec<u16> {
        let mut statuses = vec![self.expected];
        for status in &self.also {
            if !statuses.contains(status) {
                statuses.push(*status);
            }
        }
        statuses
    }

    pub async fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let settings = global.load_config()?.poll;
        let interval = self
            .interval_ms
            .map_or_else(|| settings.interval(), Duration::from_millis);
        let timeout = self
            .timeout_secs
            .map_or_else(|| settings.timeout(), Duration::from_secs);

        let probe = HttpProbe::with_timeout(settings.probe_timeout())
            .context("Failed to create HTTP probe")?;
        let poller = HealthPoller::with_probe(probe);
        let expected = self.expected_statuses();

        match poller.poll(&self.url, &expected, interval, timeout).await {
            Ok(outcome) => {
                println!("OK {} -> {}", self.url, outcome.final_status);
                Ok(ExitCode::SUCCESS)
            }
            Err(ClientError::Timeout { last_status, .. }) => {
                tracing::debug!(url = %self.url, last_status, "Poll budget exhausted");
                eprintln!("TIMEOUT waiting for {} to become {}", self.url, self.expected);
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_statuses_dedup() {
        let cmd = PollCommand::parse_from(["poll", "http://x", "200", "--also", "200", "--also", "204"]);
        assert_eq!(cmd.expected_statuses(), vec![200, 204]);
    }

    #[test]
    fn test_interval_flag() {
        let cmd = PollCommand::parse_from(["poll", "http://x", "--interval-ms", "50"]);
        assert_eq!(cmd.interval_ms, Some(50));
        assert_eq!(cmd.expected, 200);
    }
}
