//! Request builder: one (id, passage, checklist) triple to one wire request.
//!
//! Pure mapping, no I/O. Identical inputs give byte-identical serialized output.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{InputMessage, ResponsesBody, SchemaFormat, TextOptions, WireRequest};

pub const DEFAULT_MODEL: &str = "gpt-5";
pub const DEFAULT_ENDPOINT: &str = "/v1/responses";
pub const SCHEMA_NAME: &str = "rubric_evaluation";

pub const SYSTEM_PROMPT: &str = "
# Role and Objective
You are a rubric-based scoring instrument for evaluating tone-related linguistic features in academic research abstracts.
Your sole objective is to assign rubric-consistent numerical scores based strictly on observable linguistic evidence in the text.

# Task Definition
- You will be given:
  (1) a research abstract, and
  (2) a checklist (rubric) containing multiple criteria with explicit definitions and scoring scales.
- For each criterion, you must assign a score from 1 to 10 using whole numbers only.
- Each criterion must be evaluated independently and strictly according to its rubric definition.

# Evaluation Constraints
- Base all scores only on explicit, surface-level linguistic features in the text (e.g., modal verbs, hedging expressions, boosters, evidential verbs, declarative strength).
- Do NOT infer author intent, confidence, expertise, discipline norms, or rhetorical goals beyond what is directly signaled linguistically.
- Do NOT normalize, recalibrate, or compare scores across criteria.
- Do NOT introduce holistic judgments about overall tone.
- Treat the abstract as anonymized text; do not speculate about the author or context.
- Think step-by-step for each rubric section

# Criterion Labels
- Use criterion names exactly as they appear in the rubric.
- Do not add numbering, prefixes, or paraphrases.

# Justification Rules
- Provide justification for score per criterion.
- The justification should reference specific words, phrases, or constructions from the text.
- Use neutral descriptive language aligned with the rubric; avoid holistic or global tone summaries.

# Output Format (Strict)
- Your response must strictly conform to the provided JSON schema.
";

/// Canonical output schema: `{sections: [{criterion, justification, score 1..=10}]}`.
pub fn rubric_output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "criterion": { "type": "string" },
                        "justification": { "type": "string" },
                        "score": { "type": "integer", "minimum": 1, "maximum": 10 }
                    },
                    "required": ["criterion", "justification", "score"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["sections"],
        "additionalProperties": false
    })
}

/// Per-run request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub model: String,
    pub temperature: f32,
    pub endpoint: String,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Serialize)]
struct UserPayload<'a> {
    rubric_checklist: &'a str,
    passage: &'a str,
}

fn user_content(checklist: &str, passage: &str) -> String {
    // Serializing two borrowed strings cannot fail.
    serde_json::to_string(&UserPayload {
        rubric_checklist: checklist,
        passage,
    })
    .unwrap_or_default()
}

/// Build the wire request for one passage.
pub fn build_request(
    id: &str,
    passage: &str,
    checklist: &str,
    opts: &RequestOptions,
) -> WireRequest {
    WireRequest {
        custom_id: id.to_string(),
        method: "POST".to_string(),
        url: opts.endpoint.clone(),
        body: ResponsesBody {
            model: opts.model.clone(),
            input: vec![
                InputMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                InputMessage {
                    role: "user".to_string(),
                    content: user_content(checklist, passage),
                },
            ],
            temperature: opts.temperature,
            text: TextOptions {
                format: SchemaFormat {
                    kind: "json_schema".to_string(),
                    name: SCHEMA_NAME.to_string(),
                    schema: rubric_output_schema(),
                },
            },
        },
    }
}
