//! HTTP layer: auth, status mapping, retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use tracing::{debug, warn};

use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};

/// HTTP backend for making requests (holds reqwest client, key, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) config: BatchConfig,
}

impl HttpBackend {
    /// Send a request exactly once. Used for calls that create remote state.
    pub(crate) async fn send_single(
        &self,
        label: &str,
        request: reqwest::RequestBuilder,
    ) -> BatchResult<reqwest::Response> {
        debug!(call = label, "sending without retry");
        self.send_once(request).await
    }

    /// Send an idempotent request, retrying transient failures with jittered backoff.
    ///
    /// `build` is called once per attempt.
    pub(crate) async fn send<F>(&self, label: &str, build: F) -> BatchResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> BatchResult<reqwest::RequestBuilder>,
    {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            let request = build(&self.client)?;
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;
                    let backoff = backoff_for(&e, retries);

                    warn!(
                        call = label,
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: reqwest::RequestBuilder) -> BatchResult<reqwest::Response> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "backend response");

        match status.as_u16() {
            200..=299 => Ok(response),

            401 | 403 => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "invalid or missing API key".to_string());
                Err(BatchError::Unauthorized { message })
            }

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(BatchError::RateLimited { retry_after })
            }

            400..=499 => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(BatchError::InvalidResponse {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate(&message)),
                })
            }

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(BatchError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate(&message)),
                })
            }
        }
    }
}

fn backoff_for(err: &BatchError, retries: u32) -> Duration {
    use rand::Rng;

    match err {
        BatchError::RateLimited {
            retry_after: Some(retry_after),
        } => {
            let capped = (*retry_after).min(Duration::from_secs(30));
            let base_ms = capped.as_millis() as u64;
            let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
            Duration::from_millis(jittered_ms.max(100))
        }
        _ => {
            let base_backoff = Duration::from_secs(1 << retries.min(5)).min(Duration::from_secs(30));
            let jittered_ms = rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
            Duration::from_millis(jittered_ms.max(10))
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_backoff_honors_retry_after_with_cap() {
        let err = BatchError::RateLimited {
            retry_after: Some(Duration::from_secs(120)),
        };
        let d = backoff_for(&err, 1);
        assert!(d >= Duration::from_millis(27_000));
        assert!(d <= Duration::from_millis(33_000));
    }

    #[test]
    fn network_backoff_is_bounded() {
        let err = BatchError::Network {
            message: "reset".into(),
        };
        for retry in 1..10 {
            let d = backoff_for(&err, retry);
            assert!(d >= Duration::from_millis(10));
            assert!(d <= Duration::from_secs(30));
        }
    }

    #[test]
    fn truncate_bounds_error_bodies() {
        let long = "x".repeat(2000);
        assert_eq!(truncate(&long).len(), 500);
    }
}
