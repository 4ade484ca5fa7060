//! Rubric-to-column demultiplexer.
//!
//! Turns serialized evaluations (one per row) into a wide table with one
//! integer column per catalog criterion. Labels are routed through a
//! [`CriterionClassifier`]; anything it cannot place unambiguously is dropped
//! from the table and reported as a [`DemuxDiagnostic`].

mod catalog;
mod classify;

pub use catalog::{CatalogEntry, KeywordCatalog};
pub use classify::{Classification, CriterionClassifier, KeywordClassifier};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BatchResult;

/// Inclusive score bounds of the rubric scale.
pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 10;

/// One section as it appears in stored output. Lenient: missing fields are
/// reported by the demultiplexer rather than failing the row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSection {
    #[serde(default)]
    pub criterion: String,
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default)]
    pub score: Option<Value>,
}

/// The two payload shapes seen in stored evaluations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EvaluationPayload {
    Wrapped { sections: Vec<RawSection> },
    Bare(Vec<RawSection>),
}

impl EvaluationPayload {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn into_sections(self) -> Vec<RawSection> {
        match self {
            Self::Wrapped { sections } | Self::Bare(sections) => sections,
        }
    }
}

/// Something recovered from while building the table.
#[derive(Debug, Clone, PartialEq)]
pub enum DemuxDiagnostic {
    /// The row's evaluation could not be parsed; the whole row is left empty.
    ParseError { row: String, message: String },
    Unmatched { row: String, label: String },
    Ambiguous {
        row: String,
        label: String,
        candidates: Vec<String>,
    },
    MissingScore { row: String, criterion: String },
    OutOfRange {
        row: String,
        criterion: String,
        value: String,
    },
}

/// Header flavor for the wide table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnStyle {
    #[default]
    Canonical,
    Alias,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub key: String,
    pub scores: Vec<Option<i64>>,
}

/// Output of a demultiplexing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub columns: Vec<String>,
    pub aliases: Vec<String>,
    pub rows: Vec<WideRow>,
    pub diagnostics: Vec<DemuxDiagnostic>,
}

/// Diagnostic counts for a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxSummary {
    pub rows: usize,
    pub cells_written: usize,
    pub parse_errors: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    pub missing_scores: usize,
    pub out_of_range: usize,
}

impl WideTable {
    pub fn header(&self, style: ColumnStyle) -> &[String] {
        match style {
            ColumnStyle::Canonical => &self.columns,
            ColumnStyle::Alias => &self.aliases,
        }
    }

    /// Score at `(row key, canonical column)`, if written.
    pub fn get(&self, key: &str, column: &str) -> Option<i64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.key == key)
            .and_then(|r| r.scores[col])
    }

    pub fn summary(&self) -> DemuxSummary {
        let mut s = DemuxSummary {
            rows: self.rows.len(),
            cells_written: self
                .rows
                .iter()
                .map(|r| r.scores.iter().filter(|v| v.is_some()).count())
                .sum(),
            ..Default::default()
        };
        for d in &self.diagnostics {
            match d {
                DemuxDiagnostic::ParseError { .. } => s.parse_errors += 1,
                DemuxDiagnostic::Unmatched { .. } => s.unmatched += 1,
                DemuxDiagnostic::Ambiguous { .. } => s.ambiguous += 1,
                DemuxDiagnostic::MissingScore { .. } => s.missing_scores += 1,
                DemuxDiagnostic::OutOfRange { .. } => s.out_of_range += 1,
            }
        }
        s
    }
}

/// Wide-table builder over a fixed classifier.
pub struct Demultiplexer<C = KeywordClassifier> {
    classifier: C,
}

impl Demultiplexer<KeywordClassifier> {
    /// Keyword matching over the given catalog.
    pub fn with_catalog(catalog: KeywordCatalog) -> BatchResult<Self> {
        Ok(Self::new(KeywordClassifier::new(catalog)?))
    }
}

impl<C: CriterionClassifier> Demultiplexer<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Build the table from `(row key, serialized evaluation)` pairs.
    ///
    /// A `None` or unparseable evaluation leaves that row empty; it never
    /// aborts the pass.
    pub fn demux<I, K, S>(&self, rows: I) -> WideTable
    where
        I: IntoIterator<Item = (K, Option<S>)>,
        K: Into<String>,
        S: AsRef<str>,
    {
        let catalog = self.classifier.catalog();
        let mut table = WideTable {
            columns: catalog.names(),
            aliases: catalog.aliases(),
            rows: Vec::new(),
            diagnostics: Vec::new(),
        };

        for (key, raw) in rows {
            let key: String = key.into();
            let mut scores = vec![None; table.columns.len()];

            let parsed = match raw {
                Some(raw) => EvaluationPayload::parse(raw.as_ref()).map_err(|e| e.to_string()),
                None => Err("no evaluation".to_string()),
            };

            match parsed {
                Ok(payload) => {
                    for section in payload.into_sections() {
                        self.place(&key, section, &mut scores, &mut table);
                    }
                }
                Err(message) => {
                    warn!(row = %key, error = %message, "failed to parse evaluation, skipping row");
                    table.diagnostics.push(DemuxDiagnostic::ParseError {
                        row: key.clone(),
                        message,
                    });
                }
            }

            table.rows.push(WideRow { key, scores });
        }

        table
    }

    fn place(
        &self,
        key: &str,
        section: RawSection,
        scores: &mut [Option<i64>],
        table: &mut WideTable,
    ) {
        let col = match self.classifier.classify(&section.criterion) {
            Classification::Matched(col) => col,
            Classification::Unmatched => {
                warn!(row = %key, criterion = %section.criterion, "[UNMATCHED]");
                table.diagnostics.push(DemuxDiagnostic::Unmatched {
                    row: key.to_string(),
                    label: section.criterion,
                });
                return;
            }
            Classification::Ambiguous(hits) => {
                let candidates: Vec<String> =
                    hits.iter().map(|&i| table.columns[i].clone()).collect();
                warn!(
                    row = %key,
                    criterion = %section.criterion,
                    candidates = ?candidates,
                    "[AMBIGUOUS]"
                );
                table.diagnostics.push(DemuxDiagnostic::Ambiguous {
                    row: key.to_string(),
                    label: section.criterion,
                    candidates,
                });
                return;
            }
        };

        let column = table.columns[col].clone();
        let Some(raw_score) = section.score.filter(|v| !v.is_null()) else {
            warn!(row = %key, criterion = %column, "section has no score");
            table.diagnostics.push(DemuxDiagnostic::MissingScore {
                row: key.to_string(),
                criterion: column,
            });
            return;
        };

        match scale_score(&raw_score) {
            Some(score) => {
                if let Some(previous) = scores[col] {
                    debug!(row = %key, criterion = %column, previous, score, "score overwritten");
                }
                scores[col] = Some(score);
            }
            None => {
                warn!(row = %key, criterion = %column, value = %raw_score, "score outside rubric scale");
                table.diagnostics.push(DemuxDiagnostic::OutOfRange {
                    row: key.to_string(),
                    criterion: column,
                    value: raw_score.to_string(),
                });
            }
        }
    }
}

/// Integer score within the rubric scale. Integral floats (`7.0`) count.
fn scale_score(value: &Value) -> Option<i64> {
    let n = match value.as_i64() {
        Some(n) => n,
        None => {
            let f = value.as_f64()?;
            if f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    (SCORE_MIN..=SCORE_MAX).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CAUTION: &str = "Caution-Signaling Connectors";

    fn demux() -> Demultiplexer {
        Demultiplexer::with_catalog(KeywordCatalog::default()).unwrap()
    }

    fn run(rows: Vec<(&str, Option<String>)>) -> WideTable {
        demux().demux(rows)
    }

    #[test]
    fn numbered_label_lands_in_column_for_both_shapes() {
        let section = json!({
            "criterion": "5. Caution-Signaling Connectors: uses 'however' twice",
            "justification": "two contrastive connectors",
            "score": 7
        });
        let wrapped = json!({ "sections": [section.clone()] }).to_string();
        let bare = json!([section]).to_string();

        let table = run(vec![("w", Some(wrapped)), ("b", Some(bare))]);
        assert_eq!(table.get("w", CAUTION), Some(7));
        assert_eq!(table.get("b", CAUTION), Some(7));
        assert!(table.diagnostics.is_empty());
        assert_eq!(table.summary().cells_written, 2);
    }

    #[test]
    fn ambiguous_label_writes_nothing() {
        let raw = json!({"sections": [
            {"criterion": "Hedging and modal verbs", "justification": "", "score": 4}
        ]})
        .to_string();
        let table = run(vec![("r1", Some(raw))]);

        assert_eq!(table.get("r1", "Modal Verb Strength"), None);
        assert_eq!(table.get("r1", "Hedging Frequency & Type"), None);
        match &table.diagnostics[..] {
            [DemuxDiagnostic::Ambiguous { candidates, .. }] => assert_eq!(
                candidates,
                &vec![
                    "Modal Verb Strength".to_string(),
                    "Hedging Frequency & Type".to_string()
                ]
            ),
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }

    #[test]
    fn parse_failure_skips_only_that_row() {
        let good = json!([{"criterion": "Readability", "score": 9}]).to_string();
        let table = run(vec![
            ("bad", Some("{not json".to_string())),
            ("none", None),
            ("good", Some(good)),
        ]);

        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0].scores.iter().all(Option::is_none));
        assert_eq!(table.get("good", "Readability"), Some(9));
        let s = table.summary();
        assert_eq!(s.parse_errors, 2);
        assert_eq!(s.rows, 3);
    }

    #[test]
    fn unmatched_missing_and_out_of_range_scores() {
        let raw = json!({"sections": [
            {"criterion": "Overall vibe", "score": 5},
            {"criterion": "Readability"},
            {"criterion": "Pronoun Commitment", "score": 11},
            {"criterion": "Emotional Valence", "score": 7.5},
            {"criterion": "Qualifier Density", "score": 3.0}
        ]})
        .to_string();
        let table = run(vec![("x", Some(raw))]);
        let s = table.summary();
        assert_eq!(s.unmatched, 1);
        assert_eq!(s.missing_scores, 1);
        assert_eq!(s.out_of_range, 2);
        assert_eq!(table.get("x", "Qualifier Density"), Some(3));
        assert_eq!(table.get("x", "Pronoun Commitment"), None);
    }

    #[test]
    fn alias_header() {
        let table = run(vec![]);
        assert_eq!(table.header(ColumnStyle::Alias)[0], "llm_modal_verb");
        assert_eq!(table.header(ColumnStyle::Canonical)[0], "Modal Verb Strength");
        assert_eq!(table.columns.len(), 16);
    }

    struct ExactClassifier(KeywordCatalog);

    impl CriterionClassifier for ExactClassifier {
        fn catalog(&self) -> &KeywordCatalog {
            &self.0
        }

        fn classify(&self, label: &str) -> Classification {
            self.0
                .criteria
                .iter()
                .position(|e| e.name == label)
                .map_or(Classification::Unmatched, Classification::Matched)
        }
    }

    #[test]
    fn classifier_is_substitutable() {
        let d = Demultiplexer::new(ExactClassifier(KeywordCatalog::default()));
        let raw = json!([
            {"criterion": "Readability", "score": 2},
            {"criterion": "readability", "score": 3}
        ])
        .to_string();
        let table = d.demux(vec![("k", Some(raw))]);
        assert_eq!(table.get("k", "Readability"), Some(2));
        assert_eq!(table.summary().unmatched, 1);
    }
}
