//! OpenAI Files/Batches client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.
//! Upload and create are sent once; only the two GETs retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tracing::debug;

use crate::backend::BatchBackend;
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::types::{BatchJob, FileObject};

mod http;

use http::HttpBackend;

pub const CLIENT_USER_AGENT: &str = concat!("tonal-core/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct CreateBatchRequest<'a> {
    input_file_id: &'a str,
    endpoint: &'a str,
    completion_window: &'a str,
}

/// HTTP client for the batch backend.
#[derive(Debug, Clone)]
pub struct OpenAiBatchClient {
    http: HttpBackend,
}

impl OpenAiBatchClient {
    pub fn new(config: BatchConfig) -> BatchResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| BatchError::Unauthorized {
                message: "no API key configured (set OPENAI_API_KEY)".to_string(),
            })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| BatchError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = config.api_base.trim_end_matches('/').to_string();

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                api_key,
                config,
            },
        })
    }

    pub fn from_env() -> BatchResult<Self> {
        Self::new(BatchConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    async fn json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> BatchResult<T> {
        response
            .json()
            .await
            .map_err(|e| BatchError::invalid_response(format!("failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl BatchBackend for OpenAiBatchClient {
    async fn upload_batch_file(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> BatchResult<FileObject> {
        let url = format!("{}/files", self.http.base_url);
        debug!(url = %url, bytes = content.len(), "uploading batch file");

        let part = reqwest::multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str("application/jsonl")?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);
        let request = self.http.client.post(&url).multipart(form);
        let response = self.http.send_single("upload", request).await?;

        Self::json(response, "file object").await
    }

    async fn create_batch(
        &self,
        input_file_id: &str,
        endpoint: &str,
        completion_window: &str,
    ) -> BatchResult<BatchJob> {
        let url = format!("{}/batches", self.http.base_url);
        debug!(url = %url, input_file_id, endpoint, "creating batch");

        let body = CreateBatchRequest {
            input_file_id,
            endpoint,
            completion_window,
        };
        let request = self.http.client.post(&url).json(&body);
        let response = self.http.send_single("create_batch", request).await?;

        Self::json(response, "batch object").await
    }

    async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob> {
        let url = format!("{}/batches/{}", self.http.base_url, batch_id);
        debug!(url = %url, "retrieving batch");

        let response = self
            .http
            .send("retrieve_batch", |client| Ok(client.get(&url)))
            .await?;

        Self::json(response, "batch object").await
    }

    async fn file_content(&self, file_id: &str) -> BatchResult<String> {
        let url = format!("{}/files/{}/content", self.http.base_url, file_id);
        debug!(url = %url, "fetching file content");

        let response = self
            .http
            .send("file_content", |client| Ok(client.get(&url)))
            .await?;

        response.text().await.map_err(|e| BatchError::Network {
            message: format!("failed to read file body: {}", e),
        })
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}
