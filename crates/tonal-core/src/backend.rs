//! The completion backend seam.
//!
//! The pipeline only talks to this trait. [`crate::client::OpenAiBatchClient`]
//! is the HTTP implementation; tests script their own.

use async_trait::async_trait;

use crate::error::BatchResult;
use crate::types::{BatchJob, FileObject};

#[async_trait]
pub trait BatchBackend: Send + Sync {
    /// Upload a line-delimited request file for batch use.
    async fn upload_batch_file(&self, filename: &str, content: Vec<u8>)
        -> BatchResult<FileObject>;

    /// Launch a batch job over an uploaded file.
    async fn create_batch(
        &self,
        input_file_id: &str,
        endpoint: &str,
        completion_window: &str,
    ) -> BatchResult<BatchJob>;

    /// Current state of a job.
    async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob>;

    /// Raw text content of a file (output or error file).
    async fn file_content(&self, file_id: &str) -> BatchResult<String>;

    fn backend_name(&self) -> &'static str;
}
