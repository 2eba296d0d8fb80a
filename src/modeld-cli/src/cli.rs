//! Command-line argument definitions and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use modeld_client::ClientConfig;

use crate::infer_cmd::InferCommand;
use crate::poll_cmd::PollCommand;
use crate::probe_cmd::{ModelsCommand, ProbeCommand, StatusCommand};

/// Log level for the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// modeld client - talk to a modeld inference server
#[derive(Debug, Parser)]
#[command(name = "modeld")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Path to a TOML config file (defaults to $MODELD_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the modeld server (overrides config and MODELD_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log level for diagnostics written to stderr
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Enable verbose output (same as --log-level debug)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Effective log level: `--verbose`, then `MODELD_LOG_LEVEL`, then `--log-level`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else if let Ok(env_level) = std::env::var("MODELD_LOG_LEVEL") {
            LogLevel::from_str_loose(&env_level).unwrap_or(self.log_level)
        } else {
            self.log_level
        }
    }

    /// Load configuration and apply command-line overrides.
    pub fn load_config(&self) -> Result<ClientConfig> {
        let mut config =
            ClientConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        Ok(config)
    }
}

/// Install the stderr log subscriber.
///
/// When `RUST_LOG` is set the level only applies to this workspace's crates
/// and everything else is limited to errors.
pub fn init_logging(log_level: LogLevel) {
    let level = log_level.as_filter_str();
    let filter_str = if std::env::var("RUST_LOG").is_ok() {
        format!("error,modeld={level},modeld_cli={level},modeld_client={level}")
    } else {
        level.to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(&filter_str)
        .with_writer(std::io::stderr)
        .init();
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a prompt and stream the answer
    #[command(visible_alias = "i")]
    Infer(InferCommand),

    /// Poll a URL until it returns the expected status
    Poll(PollCommand),

    /// Show the health endpoint status and body
    Health(ProbeCommand),

    /// Show the readiness endpoint status and body
    Ready(ProbeCommand),

    /// List available models
    Models(ModelsCommand),

    /// Show the server status report
    Status(StatusCommand),
}

/// Run the selected subcommand.
pub async fn dispatch_command(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Poll(cmd) => cmd.run(&cli.global).await,
        Commands::Infer(cmd) => cmd.run(cli.global.load_config()?).await,
        Commands::Health(cmd) => {
            let config = cli.global.load_config()?;
            let path = config.paths.health.clone();
            cmd.run(config, &path).await
        }
        Commands::Ready(cmd) => {
            let config = cli.global.load_config()?;
            let path = config.paths.ready.clone();
            cmd.run(config, &path).await
        }
        Commands::Models(cmd) => cmd.run(cli.global.load_config()?).await,
        Commands::Status(cmd) => cmd.run(cli.global.load_config()?).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
    }

    #[test]
    fn test_parse_infer() {
        let cli = Cli::parse_from([
            "modeld",
            "--base-url",
            "http://gpu:8080",
            "infer",
            "Write a haiku",
            "--model",
            "tinyllama-q4",
            "--max-tokens",
            "128",
        ]);
        assert_eq!(cli.global.base_url.as_deref(), Some("http://gpu:8080"));
        match cli.command {
            Commands::Infer(cmd) => {
                assert_eq!(cmd.prompt, "Write a haiku");
                assert_eq!(cmd.model.as_deref(), Some("tinyllama-q4"));
                assert_eq!(cmd.max_tokens, Some(128));
                assert!(!cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_poll_positional_defaults() {
        let cli = Cli::parse_from(["modeld", "poll", "http://localhost:8080/readyz"]);
        match cli.command {
            Commands::Poll(cmd) => {
                assert_eq!(cmd.url, "http://localhost:8080/readyz");
                assert_eq!(cmd.expected, 200);
                assert_eq!(cmd.timeout_secs, None);
                assert!(cmd.also.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["modeld", "poll", "http://x/healthz", "204", "5", "--also", "503"]);
        match cli.command {
            Commands::Poll(cmd) => {
                assert_eq!(cmd.expected, 204);
                assert_eq!(cmd.timeout_secs, Some(5));
                assert_eq!(cmd.expected_statuses(), vec![204, 503]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_poll_requires_url() {
        assert!(Cli::try_parse_from(["modeld", "poll"]).is_err());
    }
}
