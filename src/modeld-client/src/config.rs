//! Client configuration.
//!
//! Values are layered in this order, later layers winning:
//! 1. Built-in defaults
//! 2. TOML file (`MODELD_CONFIG`, or `<config dir>/modeld/client.toml`)
//! 3. `MODELD_*` environment variables
//! 4. Explicit overrides from the caller (CLI flags)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::http_client::{DEFAULT_CONNECT_TIMEOUT, PROBE_TIMEOUT, STREAMING_TIMEOUT};

/// Configuration file name.
pub const CONFIG_FILE: &str = "client.toml";

/// Environment variable for a custom config file path.
pub const MODELD_CONFIG_ENV: &str = "MODELD_CONFIG";

/// Default readiness poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default readiness poll budget.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub health: String,
    pub ready: String,
    pub models: String,
    pub status: String,
    pub infer: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            health: "/healthz".to_string(),
            ready: "/readyz".to_string(),
            models: "/models".to_string(),
            status: "/status".to_string(),
            infer: "/infer".to_string(),
        }
    }
}

/// Readiness poll defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            probe_timeout_secs: PROBE_TIMEOUT.as_secs(),
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the inference service. Empty means paths are used as-is.
    pub base_url: String,
    pub paths: EndpointPaths,
    /// Send `"stream": true` with every inference request.
    pub send_stream_field: bool,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub poll: PollSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            paths: EndpointPaths::default(),
            send_stream_field: false,
            request_timeout_secs: STREAMING_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            poll: PollSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at `base_url` with default paths.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load defaults, the config file (if any) and environment overrides.
    ///
    /// `explicit_path` takes precedence over `MODELD_CONFIG` and the default
    /// location. A missing default file is not an error; a missing explicit
    /// or `MODELD_CONFIG` file is.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_path, |key| std::env::var(key).ok())
    }

    /// [`ClientConfig::load`] with environment variables read through `lookup`.
    pub fn load_with<F>(explicit_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_path = lookup(MODELD_CONFIG_ENV)
            .filter(|val| !val.is_empty())
            .map(PathBuf::from);

        let mut config = match explicit_path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(path = %path.display(), "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };
        config.apply_env_with(lookup);
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config file");
        let content = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml(&content).map_err(|e| ClientError::Config {
            message: format!("Failed to parse {}: {e}", path.display()),
        })
    }

    /// Parse TOML content.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `MODELD_*` overrides using `lookup` to resolve variables.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                debug!(key, "Applying environment override");
                *target = value;
            }
        };
        set(&mut self.base_url, "MODELD_API_BASE_URL");
        set(&mut self.paths.health, "MODELD_HEALTH_PATH");
        set(&mut self.paths.ready, "MODELD_READY_PATH");
        set(&mut self.paths.models, "MODELD_MODELS_PATH");
        set(&mut self.paths.status, "MODELD_STATUS_PATH");
        set(&mut self.paths.infer, "MODELD_INFER_PATH");

        if let Some(value) = lookup("MODELD_SEND_STREAM_FIELD") {
            self.send_stream_field = parse_bool(&value);
        }
        if let Some(secs) = lookup("MODELD_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
    }

    /// Join the base URL and `path`.
    pub fn full_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn infer_url(&self) -> String {
        self.full_url(&self.paths.infer)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Default config file location under the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("modeld").join(CONFIG_FILE))
}

/// Loose boolean parsing: `1`, `true`, `yes`, `on` (any case) are true.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.paths.health, "/healthz");
        assert_eq!(config.paths.ready, "/readyz");
        assert_eq!(config.paths.infer, "/infer");
        assert!(!config.send_stream_field);
        assert_eq!(config.poll.interval(), Duration::from_millis(500));
        assert_eq!(config.poll.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_full_url_trims_trailing_slash() {
        let config = ClientConfig::with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.infer_url(), "http://127.0.0.1:9000/infer");

        let config = ClientConfig::with_base_url("");
        assert_eq!(config.full_url("/models"), "/models");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            base_url = "http://gpu-box:8080"
            send_stream_field = true

            [paths]
            infer = "/v2/infer"

            [poll]
            interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://gpu-box:8080");
        assert!(config.send_stream_field);
        assert_eq!(config.paths.infer, "/v2/infer");
        assert_eq!(config.paths.health, "/healthz");
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.timeout_secs, DEFAULT_POLL_TIMEOUT_SECS);
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "base_url = \"http://example:1\"\n").unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.base_url, "http://example:1");
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "base_url = [not toml").unwrap();

        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = ClientConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ClientError::Config { .. })));
    }

    #[test]
    fn test_load_env_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "base_url = \"http://from-env-file:1\"\n").unwrap();
        let path_str = path.display().to_string();

        let config = ClientConfig::load_with(None, |key| {
            (key == MODELD_CONFIG_ENV).then(|| path_str.clone())
        })
        .unwrap();
        assert_eq!(config.base_url, "http://from-env-file:1");
    }

    #[test]
    fn test_load_env_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml").display().to_string();

        let result = ClientConfig::load_with(None, |key| {
            (key == MODELD_CONFIG_ENV).then(|| missing.clone())
        });
        assert!(matches!(result, Err(ClientError::Config { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MODELD_API_BASE_URL", "http://env-host:7000"),
            ("MODELD_INFER_PATH", "/generate"),
            ("MODELD_SEND_STREAM_FIELD", "YES"),
            ("MODELD_REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_env_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.infer_url(), "http://env-host:7000/generate");
        assert!(config.send_stream_field);
        assert_eq!(config.request_timeout_secs, 300);
    }

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "TRUE", "yes", "On"] {
            assert!(parse_bool(v), "{v} should be true");
        }
        for v in ["0", "false", "no", "off", "", "maybe"] {
            assert!(!parse_bool(v), "{v} should be false");
        }
    }
}
