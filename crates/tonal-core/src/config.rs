//! Backend connection and run configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, BatchResult};
use crate::request::{RequestOptions, DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Completion backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Base URL of the API, without the `/files` or `/batches` suffix.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries of an idempotent read (status, file content) for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl BatchConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `OPENAI_API_KEY` | Bearer token |
    /// | `TONAL_API_BASE` | API base URL |
    /// | `TONAL_HTTP_TIMEOUT` | Request timeout in seconds (default: 300) |
    /// | `TONAL_HTTP_MAX_RETRIES` | Retries per status/content read (default: 3) |
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("TONAL_API_BASE").unwrap_or_else(|_| default_api_base()),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            timeout_secs: std::env::var("TONAL_HTTP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("TONAL_HTTP_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
        }
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Pipeline settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_completion_window")]
    pub completion_window: String,

    /// Seconds between status checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up after this many status checks (unbounded when absent).
    #[serde(default)]
    pub max_polls: Option<u32>,

    /// Give up after this many seconds of polling (unbounded when absent).
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Passages per submitted batch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Where to keep a copy of each chunk's batch payload.
    #[serde(default)]
    pub batch_file_dir: Option<PathBuf>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_completion_window() -> String {
    "24h".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    1000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            endpoint: default_endpoint(),
            completion_window: default_completion_window(),
            poll_interval_secs: default_poll_interval(),
            max_polls: None,
            deadline_secs: None,
            chunk_size: default_chunk_size(),
            batch_file_dir: None,
        }
    }
}

impl RunConfig {
    /// Load from a YAML file; absent keys take their defaults.
    pub fn load(path: &Path) -> BatchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BatchError::config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> BatchResult<Self> {
        let cfg: RunConfig = serde_yaml::from_str(raw)
            .map_err(|e| BatchError::config(format!("failed to parse YAML: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BatchResult<()> {
        if self.chunk_size == 0 {
            return Err(BatchError::config("chunk_size must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(BatchError::config("model must not be empty"));
        }
        if !self.endpoint.starts_with('/') {
            return Err(BatchError::config(format!(
                "endpoint '{}' must be an absolute path",
                self.endpoint
            )));
        }
        Ok(())
    }

    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            endpoint: self.endpoint.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}
