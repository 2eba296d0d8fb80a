//! HTTP client for the modeld inference service

use reqwest::Response;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http_client::create_client;
use crate::models::{InferRequest, ModelsListing, ProbeResponse, StatusReport};

/// Client for the modeld HTTP API
#[derive(Debug, Clone)]
pub struct InferClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl InferClient {
    /// Create a client for the configured endpoints
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = create_client(config.request_timeout(), config.connect_timeout())?;
        Ok(Self { client, config })
    }

    /// Create a client with default paths against `base_url`
    pub fn from_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::with_base_url(base_url))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Body actually sent for `request`.
    ///
    /// `stream` is only present when the request sets it or the configuration
    /// asks for it.
    pub fn wire_request(&self, request: &InferRequest) -> InferRequest {
        let mut body = request.clone();
        if body.stream.is_none() && self.config.send_stream_field {
            body.stream = Some(true);
        }
        body
    }

    /// Send an inference request and return the streaming response.
    ///
    /// A non-success status is turned into [`ClientError::Http`] carrying the
    /// body text, read best-effort.
    pub async fn start_infer(&self, request: &InferRequest) -> Result<Response> {
        let url = self.config.infer_url();
        let body = self.wire_request(request);
        debug!(url = %url, model = ?body.model, stream = ?body.stream, "Sending inference request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, url = %url, "Inference request rejected");
        Err(ClientError::Http {
            status: status.as_u16(),
            body,
        })
    }

    /// One-shot GET of `path`, returning any status with its body text
    pub async fn probe(&self, path: &str) -> Result<ProbeResponse> {
        let url = self.config.full_url(path);
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(ProbeResponse { status, body })
    }

    /// Probe the health endpoint
    pub async fn health(&self) -> Result<ProbeResponse> {
        self.probe(&self.config.paths.health).await
    }

    /// Probe the readiness endpoint
    pub async fn ready(&self) -> Result<ProbeResponse> {
        self.probe(&self.config.paths.ready).await
    }

    /// Fetch the list of models
    pub async fn list_models(&self) -> Result<ModelsListing> {
        let url = self.config.full_url(&self.config.paths.models);
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(|e| ClientError::InvalidResponse {
            message: format!("models body is not JSON: {e}"),
        })?;
        ModelsListing::from_body(status.as_u16(), &body).ok_or_else(|| {
            ClientError::InvalidResponse {
                message: "expected a model array or an object with a `models` array".to_string(),
            }
        })
    }

    /// Fetch the server status report. Any HTTP status is returned as-is.
    pub async fn server_status(&self) -> Result<StatusReport> {
        let response = self.probe(&self.config.paths.status).await?;
        Ok(StatusReport::from_text(response.status, &response.body))
    }
}
