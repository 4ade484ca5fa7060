//! Wire and record types for the batch protocol.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One passage to score, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageInput {
    /// Join key back to the caller's data. Must be unique within a run.
    pub id: String,
    pub text: String,
}

impl PassageInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One line of the uploaded batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: ResponsesBody,
}

/// Body of a schema-constrained Responses API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsesBody {
    pub model: String,
    pub input: Vec<InputMessage>,
    pub temperature: f32,
    pub text: TextOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    pub format: SchemaFormat,
}

/// Structured-output format descriptor (`type` is always `json_schema`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub schema: Value,
}

/// Lifecycle state of a remote batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Expired,
    Cancelled,
    /// Status string this client does not know. Treated as non-terminal.
    Unknown(String),
}

impl JobStatus {
    /// Map a backend status string.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "validating" | "queued" => Self::Queued,
            "in_progress" | "finalizing" | "cancelling" | "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "expired" => Self::Expired,
            "cancelled" => Self::Cancelled,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Expired | Self::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        Self::from_wire(&s)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch object returned by create/retrieve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub output_file_id: Option<String>,
    #[serde(default)]
    pub error_file_id: Option<String>,
    /// Backend-specific error detail, kept opaque for logging.
    #[serde(default)]
    pub errors: Option<Value>,
}

/// File object returned by upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Exactly one per processed output line; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub id: String,
    pub output: Option<Value>,
    pub validation_passed: bool,
    pub validation_reason: String,
    /// Strict schema violations, informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_errors: Vec<String>,
}

impl EvaluationOutcome {
    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            output: None,
            validation_passed: false,
            validation_reason: reason.into(),
            schema_errors: Vec::new(),
        }
    }
}
