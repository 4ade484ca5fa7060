//! Polling a submitted job to a terminal status, then fetching its output.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::BatchBackend;
use crate::error::{BatchError, BatchResult};
use crate::types::{BatchJob, JobStatus};

/// Fixed-interval status poller.
///
/// With no attempt limit and no deadline it polls until the job reaches a
/// terminal status, however long that takes. The cancellation token is
/// honored between status checks.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    max_polls: Option<u32>,
    deadline: Option<Duration>,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_polls: None,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Query status until terminal. Returns the terminal job object.
    pub async fn wait(&self, backend: &dyn BatchBackend, job_id: &str) -> BatchResult<BatchJob> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(BatchError::Cancelled {
                    job_id: job_id.to_string(),
                });
            }

            let job = backend.retrieve_batch(job_id).await?;
            polls += 1;
            info!(job_id, status = %job.status, polls, "batch status");

            if job.status.is_terminal() {
                return Ok(job);
            }
            if let JobStatus::Unknown(raw) = &job.status {
                warn!(job_id, status = %raw, "unrecognized batch status, treating as running");
            }

            if self.max_polls.is_some_and(|max| polls >= max) {
                return Err(exceeded(job_id, &job.status, polls));
            }

            let mut sleep_for = self.interval;
            if let Some(deadline) = self.deadline {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    return Err(exceeded(job_id, &job.status, polls));
                }
                sleep_for = sleep_for.min(deadline - elapsed);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    warn!(job_id, polls, "polling cancelled");
                    return Err(BatchError::Cancelled { job_id: job_id.to_string() });
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }
}

fn exceeded(job_id: &str, status: &JobStatus, polls: u32) -> BatchError {
    BatchError::DeadlineExceeded {
        job_id: job_id.to_string(),
        status: status.to_string(),
        polls,
    }
}

/// Turn a terminal job into its output file text.
///
/// All-or-nothing: a job that did not complete yields an error even if the
/// backend holds partial results.
pub async fn fetch_output(backend: &dyn BatchBackend, job: &BatchJob) -> BatchResult<String> {
    if job.status != JobStatus::Completed {
        error!(job_id = %job.id, status = %job.status, "batch terminated unsuccessfully");
        if let Some(errors) = &job.errors {
            match serde_json::to_string_pretty(errors) {
                Ok(text) => error!(job_id = %job.id, "batch errors:\n{}", text),
                Err(_) => error!(job_id = %job.id, "could not serialize batch error details"),
            }
        }
        log_error_file(backend, job).await;
        return Err(BatchError::JobFailed {
            job_id: job.id.clone(),
            status: job.status.to_string(),
        });
    }

    let Some(output_file_id) = job.output_file_id.as_deref() else {
        error!(job_id = %job.id, "batch completed but produced no output file");
        log_error_file(backend, job).await;
        return Err(BatchError::MissingOutput {
            job_id: job.id.clone(),
        });
    };

    backend.file_content(output_file_id).await
}

/// Best effort: log each line of the job's error file, if any.
async fn log_error_file(backend: &dyn BatchBackend, job: &BatchJob) {
    let Some(error_file_id) = job.error_file_id.as_deref() else {
        return;
    };
    error!(job_id = %job.id, error_file_id, "fetching error file for diagnostics");
    match backend.file_content(error_file_id).await {
        Ok(text) => {
            for (i, line) in text.lines().enumerate() {
                error!(job_id = %job.id, line = i + 1, "error line: {}", line);
            }
        }
        Err(e) => warn!(job_id = %job.id, error = %e, "could not fetch error file"),
    }
}
