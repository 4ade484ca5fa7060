//! Shared argument types used across multiple commands.

use std::path::PathBuf;

use clap::ValueEnum;
use tonal_core::{ColumnStyle, RunConfig};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum InputFormat {
    /// Pick by file extension (.jsonl / .ndjson → JSON Lines, otherwise CSV)
    #[default]
    Auto,
    Csv,
    Jsonl,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum ColumnStyleArg {
    /// Criterion names as written in the rubric
    #[default]
    Canonical,
    /// snake_case identifiers (llm_modal_verb, ...)
    Alias,
}

impl From<ColumnStyleArg> for ColumnStyle {
    fn from(arg: ColumnStyleArg) -> Self {
        match arg {
            ColumnStyleArg::Canonical => ColumnStyle::Canonical,
            ColumnStyleArg::Alias => ColumnStyle::Alias,
        }
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct InputArgs {
    /// Passages to score (CSV or JSON Lines with `id` and `text`)
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// CSV column holding the passage id
    #[arg(long, default_value = "ArticleID", env = "TONAL_ID_COLUMN")]
    pub id_column: String,

    /// CSV column holding the passage text
    #[arg(long, default_value = "Abstract", env = "TONAL_TEXT_COLUMN")]
    pub text_column: String,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct RubricArgs {
    /// Rubric YAML (default: built-in tone rubric)
    #[arg(long, env = "TONAL_RUBRIC")]
    pub rubric: Option<PathBuf>,
}

/// Request-shaping settings. Each flag overrides the config file.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct RequestArgs {
    /// Run config YAML
    #[arg(long, env = "TONAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model identifier
    /// Default: gpt-5
    #[arg(long, env = "TONAL_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature
    /// Default: 0.0
    #[arg(long, env = "TONAL_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Endpoint path each request targets
    /// Default: /v1/responses
    #[arg(long, env = "TONAL_ENDPOINT")]
    pub endpoint: Option<String>,
}

impl RequestArgs {
    /// Load the config file (or defaults) and apply flag overrides.
    pub fn run_config(&self) -> tonal_core::BatchResult<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(t) = self.temperature {
            cfg.temperature = t;
        }
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        Ok(cfg)
    }
}
