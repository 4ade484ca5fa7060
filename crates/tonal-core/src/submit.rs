//! Batch submission: contract checks, payload serialization, upload and launch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::backend::BatchBackend;
use crate::error::{BatchError, BatchResult};
use crate::request::{build_request, RequestOptions};
use crate::types::{BatchJob, PassageInput, WireRequest};

/// Reject duplicate ids. Runs before any network call.
pub fn ensure_unique_ids<'a, I>(ids: I) -> BatchResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(BatchError::input_contract(format!("duplicate id '{}'", id)));
        }
    }
    Ok(())
}

/// Pair parallel id/passage lists, rejecting length mismatches.
pub fn pair_inputs(ids: &[String], passages: &[String]) -> BatchResult<Vec<PassageInput>> {
    if ids.len() != passages.len() {
        return Err(BatchError::input_contract(format!(
            "passages and ids must have the same length ({} passages, {} ids)",
            passages.len(),
            ids.len()
        )));
    }
    Ok(ids
        .iter()
        .zip(passages)
        .map(|(id, text)| PassageInput::new(id.clone(), text.clone()))
        .collect())
}

/// Build one wire request per input.
pub fn build_requests(
    inputs: &[PassageInput],
    checklist: &str,
    opts: &RequestOptions,
) -> BatchResult<Vec<WireRequest>> {
    ensure_unique_ids(inputs.iter().map(|i| i.id.as_str()))?;
    Ok(inputs
        .iter()
        .map(|i| build_request(&i.id, &i.text, checklist, opts))
        .collect())
}

/// Serialize requests as JSON Lines and confirm every line re-parses.
pub fn serialize_payload(requests: &[WireRequest]) -> BatchResult<String> {
    ensure_unique_ids(requests.iter().map(|r| r.custom_id.as_str()))?;

    let mut payload = String::new();
    for (i, request) in requests.iter().enumerate() {
        let line = serde_json::to_string(request).map_err(|e| BatchError::MalformedArtifact {
            line: i + 1,
            message: e.to_string(),
        })?;
        payload.push_str(&line);
        payload.push('\n');
    }

    verify_payload(&payload)?;
    Ok(payload)
}

/// Re-parse every line of a batch payload. Returns the number of lines.
pub fn verify_payload(payload: &str) -> BatchResult<usize> {
    let mut count = 0;
    for (i, line) in payload.lines().enumerate() {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(line) {
            error!(line = i + 1, error = %e, "invalid JSON in batch file");
            return Err(BatchError::MalformedArtifact {
                line: i + 1,
                message: e.to_string(),
            });
        }
        count += 1;
    }
    info!(lines = count, "batch file validation passed");
    Ok(count)
}

/// Keep an on-disk copy of a payload. Returns the written path.
pub fn write_payload_file(dir: &Path, chunk: usize, payload: &str) -> BatchResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("batch_{:04}.jsonl", chunk));
    std::fs::write(&path, payload)?;
    Ok(path)
}

/// Where and how a payload is launched.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub filename: String,
    pub endpoint: String,
    pub completion_window: String,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            filename: "batch.jsonl".to_string(),
            endpoint: crate::request::DEFAULT_ENDPOINT.to_string(),
            completion_window: "24h".to_string(),
        }
    }
}

/// Upload a verified payload, then launch the job. No retry of either step
/// beyond the transport-level retry of a single HTTP call.
pub async fn submit(
    backend: &dyn BatchBackend,
    payload: &str,
    opts: &SubmitOptions,
) -> BatchResult<BatchJob> {
    verify_payload(payload)?;

    info!(backend = backend.backend_name(), "uploading batch file");
    let file = backend
        .upload_batch_file(&opts.filename, payload.as_bytes().to_vec())
        .await?;

    let job = backend
        .create_batch(&file.id, &opts.endpoint, &opts.completion_window)
        .await?;

    info!(job_id = %job.id, input_file_id = %file.id, "batch launched");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(ids: &[&str]) -> Vec<PassageInput> {
        ids.iter()
            .map(|id| PassageInput::new(*id, format!("passage {}", id)))
            .collect()
    }

    #[test]
    fn duplicate_ids_are_contract_violations() {
        let err = build_requests(&inputs(&["1", "2", "1"]), "c", &Default::default()).unwrap_err();
        assert!(matches!(err, BatchError::InputContract { .. }));
        assert!(err.to_string().contains("duplicate id '1'"));
    }

    #[test]
    fn length_mismatch_is_contract_violation() {
        let err = pair_inputs(&["1".into()], &["a".into(), "b".into()]).unwrap_err();
        assert!(matches!(err, BatchError::InputContract { .. }));
    }

    #[test]
    fn payload_has_one_line_per_request() {
        let reqs = build_requests(&inputs(&["a", "b", "c"]), "c", &Default::default()).unwrap();
        let payload = serialize_payload(&reqs).unwrap();
        assert_eq!(payload.lines().count(), 3);
        assert!(payload.ends_with('\n'));
        assert_eq!(verify_payload(&payload).unwrap(), 3);
    }

    #[test]
    fn malformed_line_is_fatal_with_line_number() {
        let payload = "{\"a\":1}\n{not json}\n{\"b\":2}\n";
        match verify_payload(payload).unwrap_err() {
            BatchError::MalformedArtifact { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn payload_file_written_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_payload_file(dir.path(), 3, "{}\n").unwrap();
        assert!(path.ends_with("batch_0003.jsonl"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}\n");
    }
}
