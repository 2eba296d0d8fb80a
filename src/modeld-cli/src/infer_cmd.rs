//! Infer command - submit a prompt and stream the answer.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use modeld_client::{ClientConfig, InferClient, InferOutcome, InferRequest, RequestController};

/// Arguments for the infer command.
#[derive(Debug, Parser)]
pub struct InferCommand {
    /// Prompt text (may be empty)
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Model identifier; the server default is used when omitted
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Send `"stream": true` with the request
    #[arg(long)]
    pub stream: bool,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Do not echo stream lines to stderr while they arrive
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl InferCommand {
    /// Build the request described by the flags.
    pub fn request(&self) -> InferRequest {
        let mut request = InferRequest::new(self.prompt.clone());
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }
        if self.stream {
            request = request.with_stream(true);
        }
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;
        request.top_p = self.top_p;
        request
    }

    pub async fn run(self, config: ClientConfig) -> Result<ExitCode> {
        let client = InferClient::new(config).context("Failed to create client")?;
        let mut controller = RequestController::new(client);
        let mut updates = controller.subscribe();

        let task = controller.submit(self.request());

        let echo = !self.quiet;
        let printer = tokio::spawn(async move {
            let mut printed = 0;
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if echo {
                    for line in snapshot.streamed_lines.iter().skip(printed) {
                        eprintln!("{line}");
                    }
                }
                printed = snapshot.streamed_lines.len();
                if snapshot.state.is_terminal() {
                    break;
                }
            }
        });

        let outcome = task.outcome().await;
        // Closes the snapshot channel so the printer always exits.
        drop(controller);
        let _ = printer.await;

        let Some(outcome) = outcome else {
            anyhow::bail!("request was cancelled before completion");
        };
        self.print(&outcome)?;

        Ok(if outcome.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    fn print(&self, outcome: &InferOutcome) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        } else if outcome.is_success() {
            println!("{}", outcome.result_text);
            eprintln!("Latency (ms): {}", outcome.latency_ms);
        } else {
            eprintln!("Error: {}", outcome.result_text);
            eprintln!("Latency (ms): {}", outcome.latency_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> InferCommand {
        let mut argv = vec!["infer"];
        argv.extend_from_slice(args);
        InferCommand::parse_from(argv)
    }

    #[test]
    fn test_request_defaults() {
        let request = command(&["hello"]).request();
        assert_eq!(request, InferRequest::new("hello"));
    }

    #[test]
    fn test_request_with_flags() {
        let request = command(&[
            "hello",
            "--model",
            " tiny ",
            "--stream",
            "--max-tokens",
            "64",
            "--top-p",
            "0.5",
        ])
        .request();
        assert_eq!(request.model.as_deref(), Some("tiny"));
        assert_eq!(request.stream, Some(true));
        assert_eq!(request.max_tokens, Some(64));
        assert_eq!(request.top_p, Some(0.5));
        assert_eq!(request.temperature, None);
    }

    #[test]
    fn test_empty_prompt_allowed() {
        assert_eq!(command(&[""]).request().prompt, "");
    }
}
