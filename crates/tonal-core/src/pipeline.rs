//! End-to-end run: build, submit, poll, reconcile; chunk by chunk.

use tracing::{info, warn};

use crate::backend::BatchBackend;
use crate::config::RunConfig;
use crate::error::BatchResult;
use crate::poll::{fetch_output, Poller};
use crate::reconcile::{missing_ids, reconcile, unexpected_ids};
use crate::submit::{
    build_requests, ensure_unique_ids, serialize_payload, submit, write_payload_file,
    SubmitOptions,
};
use crate::types::{EvaluationOutcome, PassageInput};

/// What happened to one submitted chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReport {
    pub index: usize,
    pub job_id: String,
    pub inputs: usize,
    pub outcomes: usize,
    /// Input ids with no output line.
    pub missing: Vec<String>,
    /// Output ids that were never submitted in this chunk.
    pub unexpected: Vec<String>,
    /// Output lines with no usable `custom_id`.
    pub unattributed: usize,
}

/// Accumulated result of a chunked run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<EvaluationOutcome>,
    pub chunks: Vec<ChunkReport>,
}

impl RunSummary {
    pub fn missing(&self) -> Vec<String> {
        self.chunks.iter().flat_map(|c| c.missing.clone()).collect()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.validation_passed).count()
    }
}

/// Run one batch over `inputs` and return its outcomes.
///
/// One outcome per output line; inputs dropped by the backend have none.
pub async fn run_batch(
    backend: &dyn BatchBackend,
    inputs: &[PassageInput],
    checklist: &str,
    config: &RunConfig,
    poller: &Poller,
) -> BatchResult<Vec<EvaluationOutcome>> {
    let (_, outcomes) = run_chunk(backend, inputs, checklist, config, poller, 0).await?;
    Ok(outcomes)
}

/// Run `inputs` in sequential chunks of `config.chunk_size`.
pub async fn run_chunked(
    backend: &dyn BatchBackend,
    inputs: &[PassageInput],
    checklist: &str,
    config: &RunConfig,
    poller: &Poller,
) -> BatchResult<RunSummary> {
    run_chunked_with(backend, inputs, checklist, config, poller, |_, _| Ok(())).await
}

/// Like [`run_chunked`], calling `on_chunk` after each chunk completes so
/// callers can persist outcomes before the next chunk is submitted.
pub async fn run_chunked_with<F>(
    backend: &dyn BatchBackend,
    inputs: &[PassageInput],
    checklist: &str,
    config: &RunConfig,
    poller: &Poller,
    mut on_chunk: F,
) -> BatchResult<RunSummary>
where
    F: FnMut(&ChunkReport, &[EvaluationOutcome]) -> BatchResult<()>,
{
    config.validate()?;
    ensure_unique_ids(inputs.iter().map(|i| i.id.as_str()))?;

    let total_chunks = inputs.len().div_ceil(config.chunk_size);
    info!(
        inputs = inputs.len(),
        chunk_size = config.chunk_size,
        chunks = total_chunks,
        "starting run"
    );

    let mut summary = RunSummary::default();
    for (index, chunk) in inputs.chunks(config.chunk_size).enumerate() {
        info!(chunk = index + 1, of = total_chunks, size = chunk.len(), "processing chunk");
        let (report, outcomes) =
            run_chunk(backend, chunk, checklist, config, poller, index).await?;
        on_chunk(&report, &outcomes)?;
        summary.outcomes.extend(outcomes);
        summary.chunks.push(report);
    }

    info!(
        outcomes = summary.outcomes.len(),
        passed = summary.passed(),
        missing = summary.missing().len(),
        "run finished"
    );
    Ok(summary)
}

async fn run_chunk(
    backend: &dyn BatchBackend,
    inputs: &[PassageInput],
    checklist: &str,
    config: &RunConfig,
    poller: &Poller,
    index: usize,
) -> BatchResult<(ChunkReport, Vec<EvaluationOutcome>)> {
    let requests = build_requests(inputs, checklist, &config.request_options())?;
    let payload = serialize_payload(&requests)?;

    if let Some(dir) = &config.batch_file_dir {
        let path = write_payload_file(dir, index, &payload)?;
        info!(path = %path.display(), "wrote batch file");
    }

    let opts = SubmitOptions {
        filename: format!("batch_{:04}.jsonl", index),
        endpoint: config.endpoint.clone(),
        completion_window: config.completion_window.clone(),
    };
    let job = submit(backend, &payload, &opts).await?;
    let done = poller.wait(backend, &job.id).await?;
    let output = fetch_output(backend, &done).await?;

    let report = reconcile(&output);
    let missing = missing_ids(inputs, &report.outcomes);
    let unexpected = unexpected_ids(inputs, &report.outcomes);
    if !missing.is_empty() {
        warn!(job_id = %done.id, count = missing.len(), ids = ?missing, "inputs with no output");
    }
    if !unexpected.is_empty() {
        warn!(job_id = %done.id, ids = ?unexpected, "outputs for ids never submitted");
    }
    if report.unattributed > 0 {
        warn!(job_id = %done.id, lines = report.unattributed, "unattributed output lines");
    }

    let chunk = ChunkReport {
        index,
        job_id: done.id,
        inputs: inputs.len(),
        outcomes: report.outcomes.len(),
        missing,
        unexpected,
        unattributed: report.unattributed,
    };
    Ok((chunk, report.outcomes))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::BatchError;
    use crate::fake::{completed, ScriptedBackend};
    use serde_json::json;

    fn inputs(ids: &[&str]) -> Vec<PassageInput> {
        ids.iter()
            .map(|id| PassageInput::new(*id, format!("We show {}.", id)))
            .collect()
    }

    fn output_line(id: &str) -> String {
        let payload = r#"{"sections":[{"criterion":"Readability","justification":"ok","score":5}]}"#;
        json!({
            "custom_id": id,
            "response": {"body": {"output": [
                {"type": "message", "content": [{"type": "output_text", "text": payload}]}
            ]}}
        })
        .to_string()
    }

    fn poller() -> Poller {
        Poller::new(Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_run_sequentially_and_accumulate() {
        let out = format!("{}\n{}\n", output_line("a"), output_line("b"));
        let backend = ScriptedBackend::new()
            .with_statuses([completed("out")])
            .with_file("out", out);
        let config = RunConfig {
            chunk_size: 2,
            ..Default::default()
        };

        let summary = run_chunked(&backend, &inputs(&["a", "b", "c"]), "c", &config, &poller())
            .await
            .unwrap();

        assert_eq!(summary.chunks.len(), 2);
        assert_eq!(summary.chunks[1].inputs, 1);
        assert_eq!(summary.chunks[1].missing, vec!["c".to_string()]);
        assert_eq!(summary.chunks[1].unexpected.len(), 2);
        assert_eq!(
            backend.calls(),
            vec![
                "upload", "create", "retrieve:batch-1", "content:out",
                "upload", "create", "retrieve:batch-2", "content:out",
            ]
        );
        assert_eq!(backend.uploads()[1].lines().count(), 1);
    }

    #[tokio::test]
    async fn duplicate_across_chunks_fails_before_any_call() {
        let backend = ScriptedBackend::new();
        let config = RunConfig {
            chunk_size: 1,
            ..Default::default()
        };
        let err = run_chunked(&backend, &inputs(&["x", "y", "x"]), "c", &config, &poller())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::InputContract { .. }));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let backend = ScriptedBackend::new();
        let summary = run_chunked(&backend, &[], "c", &RunConfig::default(), &poller())
            .await
            .unwrap();
        assert!(summary.outcomes.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_files_are_kept_and_callback_sees_each_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new()
            .with_statuses([completed("out")])
            .with_file("out", output_line("a"));
        let config = RunConfig {
            chunk_size: 1,
            batch_file_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let mut seen = Vec::new();
        run_chunked_with(
            &backend,
            &inputs(&["a", "b"]),
            "c",
            &config,
            &poller(),
            |report, outcomes| {
                seen.push((report.index, outcomes.len()));
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(seen, vec![(0, 1), (1, 1)]);
        assert!(dir.path().join("batch_0000.jsonl").exists());
        assert!(dir.path().join("batch_0001.jsonl").exists());
    }

    #[tokio::test]
    async fn upload_failure_is_fatal() {
        let backend = ScriptedBackend::new().with_failing_upload("connection reset");
        let err = run_batch(&backend, &inputs(&["a"]), "c", &RunConfig::default(), &poller())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Network { .. }));
        assert_eq!(backend.calls(), vec!["upload"]);
    }

    #[tokio::test]
    async fn create_failure_after_upload_is_fatal() {
        let backend = ScriptedBackend::new().with_failing_create("unknown endpoint");
        let err = run_batch(&backend, &inputs(&["a", "b"]), "c", &RunConfig::default(), &poller())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidResponse { .. }));
        assert_eq!(backend.calls(), vec!["upload", "create"]);
        assert_eq!(backend.status_queries(), 0);
    }
}
