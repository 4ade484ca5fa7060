//! Error types for the batch evaluation pipeline.

use std::time::Duration;

/// Batch pipeline errors.
///
/// Every variant is fatal for the batch it occurs in. Per-record problems
/// never surface here; they become failed outcomes (see [`ExtractError`]).
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Caller inputs break the submission contract (length mismatch, duplicate ids).
    #[error("input contract violation: {message}")]
    InputContract { message: String },

    /// A line of the locally built batch payload is not valid JSON.
    #[error("malformed batch payload at line {line}: {message}")]
    MalformedArtifact { line: usize, message: String },

    /// The remote job reached a terminal status other than completed.
    #[error("batch {job_id} did not complete successfully: {status}")]
    JobFailed { job_id: String, status: String },

    /// The remote job completed but reports no output file.
    #[error("batch {job_id} completed without output")]
    MissingOutput { job_id: String },

    /// Polling was cancelled by the caller.
    #[error("polling of batch {job_id} cancelled")]
    Cancelled { job_id: String },

    /// Polling gave up before the job reached a terminal status.
    #[error("batch {job_id} still {status} after {polls} status checks")]
    DeadlineExceeded {
        job_id: String,
        status: String,
        polls: u32,
    },

    /// Authentication failed or key missing.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Network or server error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response from the backend could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error (rubric, keyword catalog, run settings).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Local file I/O failed.
    #[error("io error: {message}")]
    Io { message: String },
}

impl BatchError {
    pub fn input_contract(message: impl Into<String>) -> Self {
        Self::InputContract {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Caller / local problems
            Self::InputContract { .. } => 2,
            Self::MalformedArtifact { .. } => 2,
            Self::Config { .. } => 2,
            Self::Io { .. } => 2,

            // Auth
            Self::Unauthorized { .. } => 3,

            // Remote job lifecycle
            Self::JobFailed { .. } => 4,
            Self::MissingOutput { .. } => 4,

            // Transport
            Self::RateLimited { .. } => 5,
            Self::Network { .. } => 5,
            Self::InvalidResponse { .. } => 5,

            // Operator stop
            Self::Cancelled { .. } => 6,
            Self::DeadlineExceeded { .. } => 6,
        }
    }

    /// Whether a single HTTP call may be retried.
    ///
    /// This never applies to the job itself: a failed job is not resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }

    /// True for errors raised before anything was sent to the backend.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InputContract { .. }
                | Self::MalformedArtifact { .. }
                | Self::Config { .. }
                | Self::Io { .. }
        )
    }
}

impl From<reqwest::Error> for BatchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Failure to pull a structured payload out of one completion record.
///
/// The `Display` text is what ends up in an outcome's `validation_reason`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("No schema output found in response")]
    NotFound,

    #[error("schema output is not valid JSON: {0}")]
    InvalidJson(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_errors_are_flagged_local() {
        assert!(BatchError::input_contract("dup").is_local());
        assert!(BatchError::MalformedArtifact {
            line: 3,
            message: "eof".into()
        }
        .is_local());
        assert!(!BatchError::MissingOutput {
            job_id: "b1".into()
        }
        .is_local());
    }

    #[test]
    fn only_transport_errors_retry() {
        assert!(BatchError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(BatchError::RateLimited { retry_after: None }.is_retryable());
        assert!(!BatchError::JobFailed {
            job_id: "b1".into(),
            status: "failed".into()
        }
        .is_retryable());
    }

    #[test]
    fn not_found_reason_text() {
        assert_eq!(
            ExtractError::NotFound.to_string(),
            "No schema output found in response"
        );
    }
}
