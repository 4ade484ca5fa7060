//! Batch rubric scoring of text passages.
//!
//! This crate scores passages against a fixed rubric of tone criteria using a
//! schema-constrained completion API in batch mode, providing:
//!
//! - Rubric catalog and checklist compilation
//! - Wire request construction (one schema-constrained request per passage)
//! - Batch submission, status polling and output retrieval
//! - Output extraction, structural validation and strict schema checks
//! - Reconciliation of outputs back to caller ids
//! - Demultiplexing of stored evaluations into one column per criterion
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use tonal_core::{run_chunked, OpenAiBatchClient, PassageInput, Poller, Rubric, RunConfig};
//!
//! # async fn example() -> Result<(), tonal_core::BatchError> {
//! let client = OpenAiBatchClient::from_env()?;
//! let config = RunConfig::default();
//! let poller = Poller::new(config.poll_interval()).with_deadline(Some(Duration::from_secs(86_400)));
//!
//! let inputs = vec![PassageInput::new("1", "We prove the conjecture.")];
//! let summary = run_chunked(&client, &inputs, &Rubric::default().checklist_text(), &config, &poller).await?;
//! for outcome in &summary.outcomes {
//!     println!("{}: {}", outcome.id, outcome.validation_reason);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OPENAI_API_KEY` | Bearer token for the batch backend |
//! | `TONAL_API_BASE` | API base URL (default: `https://api.openai.com/v1`) |
//! | `TONAL_HTTP_TIMEOUT` | Request timeout in seconds (default: 300) |
//! | `TONAL_HTTP_MAX_RETRIES` | Max retries for transient failures of status/content reads (default: 3) |

pub mod backend;
pub mod client;
pub mod config;
pub mod demux;
pub mod error;
pub mod extract;
pub mod fake;
pub mod pipeline;
pub mod poll;
pub mod reconcile;
pub mod request;
pub mod rubric;
pub mod submit;
pub mod types;

// Re-export main types
pub use backend::BatchBackend;
pub use client::OpenAiBatchClient;
pub use config::{BatchConfig, RunConfig};
pub use demux::{
    Classification, ColumnStyle, CriterionClassifier, DemuxDiagnostic, DemuxSummary,
    Demultiplexer, EvaluationPayload, KeywordCatalog, KeywordClassifier, WideTable,
};
pub use error::{BatchError, BatchResult, ExtractError};
pub use extract::{extract_schema_output, schema_violations, validate_structure};
pub use pipeline::{run_batch, run_chunked, run_chunked_with, ChunkReport, RunSummary};
pub use poll::{fetch_output, Poller};
pub use reconcile::{missing_ids, reconcile, unexpected_ids, ReconcileReport};
pub use request::{build_request, rubric_output_schema, RequestOptions};
pub use rubric::{Criterion, Rubric};
pub use submit::{build_requests, pair_inputs, serialize_payload, submit, SubmitOptions};
pub use types::{BatchJob, EvaluationOutcome, FileObject, JobStatus, PassageInput, WireRequest};
