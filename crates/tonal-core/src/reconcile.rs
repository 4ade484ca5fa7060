//! Mapping raw output lines back to caller ids.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

use crate::extract::{extract_schema_output, schema_violations, validate_structure};
use crate::types::{EvaluationOutcome, PassageInput};

/// Result of reconciling one output file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// One per output line that carried a `custom_id`, in file order.
    pub outcomes: Vec<EvaluationOutcome>,
    /// Lines that could not be attributed to any id (unparseable record or
    /// no usable `custom_id`). Logged, never turned into outcomes.
    pub unattributed: usize,
}

/// Reconcile every line of a batch output file.
///
/// A bad record never aborts the pass. Ids that produced no line at all are
/// not reported here; see [`missing_ids`].
pub fn reconcile(output_text: &str) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (idx, line) in output_text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(line = idx + 1, error = %e, "unparseable output record, skipping");
                report.unattributed += 1;
                continue;
            }
        };

        let Some(custom_id) = custom_id_of(&record) else {
            warn!(line = idx + 1, "output record has no custom_id, skipping");
            report.unattributed += 1;
            continue;
        };

        report.outcomes.push(reconcile_record(custom_id, &record));
    }

    report
}

fn custom_id_of(record: &Value) -> Option<String> {
    match record.get("custom_id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build the outcome for one attributed record.
pub fn reconcile_record(custom_id: String, record: &Value) -> EvaluationOutcome {
    let body = record
        .pointer("/response/body")
        .unwrap_or(&Value::Null);

    let output = match extract_schema_output(body) {
        Ok(output) => output,
        Err(e) => {
            warn!(custom_id = %custom_id, error = %e, "extraction failed");
            if let Some(err) = record.get("error").filter(|v| !v.is_null()) {
                warn!(custom_id = %custom_id, "record error: {}", err);
            }
            return EvaluationOutcome::failed(custom_id, e.to_string());
        }
    };

    let (passed, reason) = validate_structure(&output);
    info!(
        "Result {}: schema validation {} ({})",
        custom_id,
        if passed { "PASSED" } else { "FAILED" },
        reason
    );

    let schema_errors = schema_violations(&output);
    if !schema_errors.is_empty() {
        warn!(
            custom_id = %custom_id,
            count = schema_errors.len(),
            first = %schema_errors[0],
            "output does not conform to rubric schema"
        );
    }

    EvaluationOutcome {
        id: custom_id,
        output: Some(output),
        validation_passed: passed,
        validation_reason: reason.to_string(),
        schema_errors,
    }
}

/// Input ids with no outcome, in input order.
pub fn missing_ids(inputs: &[PassageInput], outcomes: &[EvaluationOutcome]) -> Vec<String> {
    let seen: HashSet<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
    inputs
        .iter()
        .filter(|i| !seen.contains(i.id.as_str()))
        .map(|i| i.id.clone())
        .collect()
}

/// Outcome ids that match no input, in outcome order, without repeats.
pub fn unexpected_ids(inputs: &[PassageInput], outcomes: &[EvaluationOutcome]) -> Vec<String> {
    let known: HashSet<&str> = inputs.iter().map(|i| i.id.as_str()).collect();
    let mut reported = HashSet::new();
    outcomes
        .iter()
        .filter(|o| !known.contains(o.id.as_str()) && reported.insert(o.id.as_str()))
        .map(|o| o.id.clone())
        .collect()
}
