//! Read-only server queries: health, readiness, models and status.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use modeld_client::{ClientConfig, InferClient};

fn client(config: ClientConfig) -> Result<InferClient> {
    InferClient::new(config).context("Failed to create client")
}

fn exit_for(status: u16) -> ExitCode {
    if (200..300).contains(&status) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Arguments for the health and ready commands.
#[derive(Debug, Parser)]
pub struct ProbeCommand {
    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProbeCommand {
    pub async fn run(self, config: ClientConfig, path: &str) -> Result<ExitCode> {
        let response = client(config)?.probe(path).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("Status: {}", response.status);
            if !response.body.is_empty() {
                println!("{}", response.body.trim_end());
            }
        }
        Ok(exit_for(response.status))
    }
}

/// Arguments for the models command.
#[derive(Debug, Parser)]
pub struct ModelsCommand {
    /// Print the raw model entries as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModelsCommand {
    pub async fn run(self, config: ClientConfig) -> Result<ExitCode> {
        let listing = client(config)?.list_models().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listing.models)?);
            return Ok(ExitCode::SUCCESS);
        }

        println!("Models: {}", listing.count());
        let ids = listing.ids();
        if ids.len() == listing.count() {
            for id in ids {
                println!("  {id}");
            }
        } else {
            for model in &listing.models {
                println!("  {model}");
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Arguments for the status command.
#[derive(Debug, Parser)]
pub struct StatusCommand {
    /// Print only the decoded body as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn run(self, config: ClientConfig) -> Result<ExitCode> {
        let report = client(config)?.server_status().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report.body)?);
        } else {
            println!("HTTP status: {}", report.status);
            if let Some(state) = report.state() {
                println!("State: {state}");
            }
            if let Some(instances) = report.instances() {
                println!("Instances: {instances}");
            }
            println!("{}", serde_json::to_string_pretty(&report.body)?);
        }
        Ok(exit_for(report.status))
    }
}
