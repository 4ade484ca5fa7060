//! Scripted in-memory backend for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::BatchBackend;
use crate::error::{BatchError, BatchResult};
use crate::types::{BatchJob, FileObject, JobStatus};

/// Backend that replays a fixed script of status observations.
///
/// Every `retrieve_batch` pops the next scripted job (re-labelled with the
/// requested id); the last one repeats once the script runs dry.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    statuses: Mutex<VecDeque<BatchJob>>,
    files: Mutex<HashMap<String, String>>,
    uploads: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    fail_upload: Option<String>,
    fail_create: Option<String>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append status observations to the script.
    pub fn with_statuses(self, jobs: impl IntoIterator<Item = BatchJob>) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(jobs);
        self
    }

    pub fn with_file(self, file_id: impl Into<String>, content: impl Into<String>) -> Self {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(file_id.into(), content.into());
        self
    }

    pub fn with_failing_upload(mut self, message: impl Into<String>) -> Self {
        self.fail_upload = Some(message.into());
        self
    }

    pub fn with_failing_create(mut self, message: impl Into<String>) -> Self {
        self.fail_create = Some(message.into());
        self
    }

    /// Call log, e.g. `["upload", "create", "retrieve:batch-1"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn status_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("retrieve:"))
            .count()
    }

    /// Payloads received by `upload_batch_file`, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

/// A job observation with the given status and no files.
pub fn job(status: JobStatus) -> BatchJob {
    BatchJob {
        id: String::new(),
        status,
        output_file_id: None,
        error_file_id: None,
        errors: None,
    }
}

/// A completed job observation pointing at an output file.
pub fn completed(output_file_id: &str) -> BatchJob {
    BatchJob {
        output_file_id: Some(output_file_id.to_string()),
        ..job(JobStatus::Completed)
    }
}

#[async_trait]
impl BatchBackend for ScriptedBackend {
    async fn upload_batch_file(
        &self,
        _filename: &str,
        content: Vec<u8>,
    ) -> BatchResult<FileObject> {
        self.record("upload".to_string());
        if let Some(message) = &self.fail_upload {
            return Err(BatchError::Network {
                message: message.clone(),
            });
        }
        let mut uploads = self.uploads.lock().unwrap_or_else(|e| e.into_inner());
        uploads.push(String::from_utf8_lossy(&content).into_owned());
        Ok(FileObject {
            id: format!("file-input-{}", uploads.len()),
            purpose: Some("batch".to_string()),
            bytes: Some(content.len() as u64),
        })
    }

    async fn create_batch(
        &self,
        _input_file_id: &str,
        _endpoint: &str,
        _completion_window: &str,
    ) -> BatchResult<BatchJob> {
        self.record("create".to_string());
        if let Some(message) = &self.fail_create {
            return Err(BatchError::invalid_response(message.clone()));
        }
        let n = self.calls().iter().filter(|c| *c == "create").count();
        Ok(BatchJob {
            id: format!("batch-{}", n),
            ..job(JobStatus::Queued)
        })
    }

    async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob> {
        self.record(format!("retrieve:{}", batch_id));
        let mut statuses = self.statuses.lock().unwrap_or_else(|e| e.into_inner());
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        let mut job = next.ok_or_else(|| BatchError::invalid_response("status script is empty"))?;
        job.id = batch_id.to_string();
        Ok(job)
    }

    async fn file_content(&self, file_id: &str) -> BatchResult<String> {
        self.record(format!("content:{}", file_id));
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(file_id)
            .cloned()
            .ok_or_else(|| BatchError::invalid_response(format!("no such file: {}", file_id)))
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
