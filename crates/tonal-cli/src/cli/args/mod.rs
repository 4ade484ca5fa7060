use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod common;
pub mod run;
pub use common::*;
pub use run::*;

#[derive(Parser)]
#[command(
    name = "tonal",
    version,
    about = "Score text passages against a tone rubric with a batch completion API"
)]
pub struct Cli {
    /// Also append log output to this file
    #[arg(long, global = true, env = "TONAL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the rubric checklist embedded in every request
    Checklist(ChecklistArgs),
    /// Write the batch payload for an input file without submitting it
    Build(BuildArgs),
    /// Submit, poll and reconcile; write one outcome per output line
    Run(RunArgs),
    /// Turn stored evaluations into one score column per criterion
    Demux(DemuxArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct ChecklistArgs {
    #[command(flatten)]
    pub rubric: RubricArgs,

    /// Print the rubric fingerprint instead of the checklist
    #[arg(long)]
    pub fingerprint: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub rubric: RubricArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Where to write the line-delimited payload
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct DemuxArgs {
    /// Outcomes file (.jsonl) or a CSV with a serialized evaluation column
    pub input: PathBuf,

    /// Where to write the wide table (CSV)
    #[arg(long)]
    pub out: PathBuf,

    /// Keyword catalog YAML (default: built-in tone rubric keywords)
    #[arg(long, env = "TONAL_KEYWORDS")]
    pub keywords: Option<PathBuf>,

    /// Header names for the criterion columns
    #[arg(long, value_enum, default_value_t = ColumnStyleArg::Canonical)]
    pub column_style: ColumnStyleArg,

    /// CSV input: column holding the row key
    #[arg(long, default_value = "id")]
    pub key_column: String,

    /// CSV input: column holding the evaluation as JSON text. Python-literal
    /// dict strings (single quotes, None/True) are not parsed and each such
    /// row is reported as a parse error.
    #[arg(long, default_value = "evaluations")]
    pub evaluation_column: String,
}
