//! File formats of the command layer: passages in, outcomes and wide tables out.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Deserialize;
use serde_json::Value;
use tonal_core::{ColumnStyle, EvaluationOutcome, PassageInput, WideTable};
use tracing::{info, warn};

use crate::cli::args::{InputArgs, InputFormat};

fn is_jsonl(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl" | "ndjson")
    )
}

/// Read passages, skipping rows with empty text.
pub fn read_passages(args: &InputArgs) -> Result<Vec<PassageInput>> {
    let jsonl = match args.format {
        InputFormat::Jsonl => true,
        InputFormat::Csv => false,
        InputFormat::Auto => is_jsonl(&args.input),
    };
    let passages = if jsonl {
        read_passages_jsonl(&args.input)?
    } else {
        read_passages_csv(&args.input, &args.id_column, &args.text_column)?
    };
    info!(path = %args.input.display(), passages = passages.len(), "read input");
    Ok(passages)
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    match headers.iter().position(|h| h == name) {
        Some(i) => Ok(i),
        None => bail!(
            "column '{}' not found in {} (columns: {})",
            name,
            path.display(),
            headers.iter().collect::<Vec<_>>().join(", ")
        ),
    }
}

fn read_passages_csv(path: &Path, id_column: &str, text_column: &str) -> Result<Vec<PassageInput>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::Fields)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let id_idx = column_index(&headers, id_column, path)?;
    let text_idx = column_index(&headers, text_column, path)?;

    let mut passages = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV row {}", row + 1))?;
        let text = record.get(text_idx).unwrap_or_default();
        if text.is_empty() {
            skipped += 1;
            continue;
        }
        let id = record.get(id_idx).unwrap_or_default();
        passages.push(PassageInput::new(id, text));
    }
    if skipped > 0 {
        info!(skipped, "skipped rows with empty text");
    }
    Ok(passages)
}

#[derive(Deserialize)]
struct JsonlPassage {
    id: Value,
    #[serde(default)]
    text: Option<String>,
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_passages_jsonl(path: &Path) -> Result<Vec<PassageInput>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut passages = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", n + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: JsonlPassage = serde_json::from_str(&line)
            .with_context(|| format!("{} line {}: expected {{\"id\", \"text\"}}", path.display(), n + 1))?;
        let Some(id) = id_string(&row.id) else {
            bail!("{} line {}: id must be a string or number", path.display(), n + 1);
        };
        match row.text {
            Some(text) if !text.trim().is_empty() => passages.push(PassageInput::new(id, text)),
            _ => warn!(id = %id, "skipping passage with empty text"),
        }
    }
    Ok(passages)
}

/// Appends outcomes as JSON Lines.
pub struct OutcomeWriter {
    out: BufWriter<File>,
    written: usize,
}

impl OutcomeWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Write and flush, so completed chunks survive a later failure.
    pub fn append(&mut self, outcomes: &[EvaluationOutcome]) -> Result<()> {
        for outcome in outcomes {
            serde_json::to_writer(&mut self.out, outcome).context("failed to serialize outcome")?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush().context("failed to flush outcomes")?;
        self.written += outcomes.len();
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

/// Read `(row key, serialized evaluation)` pairs for the demultiplexer.
pub fn read_evaluations(
    path: &Path,
    key_column: &str,
    evaluation_column: &str,
) -> Result<Vec<(String, Option<String>)>> {
    if is_jsonl(path) {
        read_outcomes_jsonl(path)
    } else {
        read_evaluations_csv(path, key_column, evaluation_column)
    }
}

fn read_outcomes_jsonl(path: &Path) -> Result<Vec<(String, Option<String>)>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", n + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EvaluationOutcome>(&line) {
            Ok(outcome) => rows.push((outcome.id, outcome.output.map(|v| v.to_string()))),
            Err(e) => warn!(line = n + 1, error = %e, "not an outcome record, skipping"),
        }
    }
    Ok(rows)
}

fn read_evaluations_csv(
    path: &Path,
    key_column: &str,
    evaluation_column: &str,
) -> Result<Vec<(String, Option<String>)>> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let key_idx = column_index(&headers, key_column, path)?;
    let eval_idx = column_index(&headers, evaluation_column, path)?;

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV row {}", row + 1))?;
        let key = record.get(key_idx).unwrap_or_default().to_string();
        let raw = record
            .get(eval_idx)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        rows.push((key, raw));
    }
    Ok(rows)
}

/// Write the wide table: key column, then one column per criterion.
pub fn write_wide_table(
    path: &Path,
    table: &WideTable,
    style: ColumnStyle,
    key_header: &str,
) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    let mut header = vec![key_header.to_string()];
    header.extend(table.header(style).iter().cloned());
    wtr.write_record(&header).context("Failed to write CSV header")?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.scores.len() + 1);
        record.push(row.key.clone());
        record.extend(
            row.scores
                .iter()
                .map(|s| s.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    Ok(())
}
