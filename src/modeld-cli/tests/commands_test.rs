use std::process::ExitCode;

use clap::Parser;
use modeld_cli::{Cli, dispatch_command};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["modeld"];
    argv.extend_from_slice(args);
    dispatch_command(Cli::parse_from(argv))
        .await
        .expect("command runs")
}

#[tokio::test]
async fn test_health_exit_code_follows_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/readyz"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
        .mount(&server)
        .await;

    let uri = server.uri();
    assert_eq!(run(&["--base-url", &uri, "health"]).await, ExitCode::SUCCESS);
    assert_eq!(run(&["--base-url", &uri, "ready"]).await, ExitCode::FAILURE);
}

#[tokio::test]
async fn test_poll_succeeds_and_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/readyz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ready = format!("{}/readyz", server.uri());
    assert_eq!(run(&["poll", &ready]).await, ExitCode::SUCCESS);

    let missing = format!("{}/missing", server.uri());
    assert_eq!(
        run(&["poll", &missing, "200", "0", "--interval-ms", "10"]).await,
        ExitCode::FAILURE
    );
}

#[tokio::test]
async fn test_infer_exit_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/infer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"token\":\"A\"}\n{\"done\":true}\n"),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    assert_eq!(
        run(&["--base-url", &uri, "infer", "hi", "--quiet"]).await,
        ExitCode::SUCCESS
    );

    let unreachable = "http://127.0.0.1:9";
    assert_eq!(
        run(&["--base-url", unreachable, "infer", "hi", "--quiet"]).await,
        ExitCode::FAILURE
    );
}

#[tokio::test]
async fn test_models_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "id": "tiny" }, { "id": "small" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "running",
            "instances": [{ "id": 1 }]
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    assert_eq!(run(&["--base-url", &uri, "models"]).await, ExitCode::SUCCESS);
    assert_eq!(run(&["--base-url", &uri, "status", "--json"]).await, ExitCode::SUCCESS);
}
