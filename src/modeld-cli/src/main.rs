//! modeld CLI - main entry point.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use modeld_cli::{Cli, dispatch_command, init_logging};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.global.effective_log_level());

    dispatch_command(cli).await
}
