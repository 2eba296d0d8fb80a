//! Request and response types for the modeld HTTP API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inference request body for `POST /infer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferRequest {
    /// Prompt text. Not validated here; an empty prompt is sent as-is.
    pub prompt: String,
    /// Model identifier; the server default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Ask the server for an NDJSON token stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling probability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl InferRequest {
    /// Create a request for `prompt` with server defaults.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Set the model. Blank names are ignored and surrounding whitespace is trimmed.
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        let model = model.as_ref().trim();
        self.model = (!model.is_empty()).then(|| model.to_string());
        self
    }

    /// Request streaming explicitly
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top_p
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// Status and body of a one-shot GET probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of `GET /models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsListing {
    pub status: u16,
    pub models: Vec<Value>,
}

impl ModelsListing {
    /// Accept either a bare array or `{"models": [...]}`.
    pub fn from_body(status: u16, body: &Value) -> Option<Self> {
        let models = match body {
            Value::Array(items) => items.clone(),
            Value::Object(object) => object.get("models")?.as_array()?.clone(),
            _ => return None,
        };
        Some(Self { status, models })
    }

    pub fn count(&self) -> usize {
        self.models.len()
    }

    /// Model ids, for entries that carry one
    pub fn ids(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str))
            .collect()
    }
}

/// Result of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: u16,
    /// Decoded JSON body, or `{"raw": text}` when the body is not JSON
    pub body: Value,
}

impl StatusReport {
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = serde_json::from_str::<Value>(text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": text }));
        Self { status, body }
    }

    /// Number of managed instances, when the body lists them
    pub fn instances(&self) -> Option<usize> {
        ["instances", "Instances"]
            .into_iter()
            .find_map(|key| self.body.get(key)?.as_array().map(Vec::len))
    }

    /// Overall manager state, when reported
    pub fn state(&self) -> Option<&str> {
        self.body.get("state").and_then(Value::as_str)
    }
}
