//! Output extraction and validation for one completion record.

use std::sync::OnceLock;

use jsonschema::Draft;
use serde_json::Value;

use crate::error::ExtractError;
use crate::request::rubric_output_schema;

/// Pull the structured payload out of a Responses API body.
///
/// Takes the first `output_text` content of the first `message` item that has
/// one, and parses its text as JSON.
pub fn extract_schema_output(body: &Value) -> Result<Value, ExtractError> {
    let items = body
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let contents = item
            .get("content")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for content in contents {
            if content.get("type").and_then(Value::as_str) != Some("output_text") {
                continue;
            }
            let Some(text) = content.get("text").and_then(Value::as_str) else {
                continue;
            };
            return serde_json::from_str(text).map_err(|e| ExtractError::InvalidJson(e.to_string()));
        }
    }

    Err(ExtractError::NotFound)
}

pub const VALID: &str = "OK";

/// Structural sanity check: an object with a `sections` array.
///
/// Does not look at scores or criterion names.
pub fn validate_structure(output: &Value) -> (bool, &'static str) {
    let Some(obj) = output.as_object() else {
        return (false, "Output is not an object");
    };
    let Some(sections) = obj.get("sections") else {
        return (false, "Missing 'sections' key");
    };
    if !sections.is_array() {
        return (false, "'sections' is not a list");
    }
    (true, VALID)
}

static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn compiled_validator() -> Result<&'static jsonschema::Validator, String> {
    VALIDATOR
        .get_or_init(|| {
            jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&rubric_output_schema())
                .map_err(|e| format!("failed to compile rubric output schema: {e}"))
        })
        .as_ref()
        .map_err(|e| e.clone())
}

/// Check a payload against the full rubric output schema.
///
/// Returns at most ten violation messages (empty when valid).
pub fn schema_violations(output: &Value) -> Vec<String> {
    const MAX_ERRORS: usize = 10;

    let validator = match compiled_validator() {
        Ok(v) => v,
        Err(e) => return vec![e],
    };
    if validator.is_valid(output) {
        return Vec::new();
    }
    validator
        .iter_errors(output)
        .take(MAX_ERRORS)
        .map(|e| e.to_string())
        .collect()
}
