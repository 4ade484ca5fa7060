use std::path::PathBuf;

use clap::Parser;
use tonal_core::RunConfig;

use super::common::{InputArgs, RequestArgs, RubricArgs};

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub rubric: RubricArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Where to write outcomes (JSON Lines, one per output line)
    #[arg(long)]
    pub out: PathBuf,

    /// Batch completion window hint
    /// Default: 24h
    #[arg(long, env = "TONAL_COMPLETION_WINDOW")]
    pub completion_window: Option<String>,

    /// Seconds between status checks
    /// Default: 60
    #[arg(long, env = "TONAL_POLL_INTERVAL")]
    pub poll_interval: Option<u64>,

    /// Stop polling after this many status checks
    #[arg(long, env = "TONAL_MAX_POLLS")]
    pub max_polls: Option<u32>,

    /// Stop polling after this many seconds
    #[arg(long, env = "TONAL_DEADLINE")]
    pub deadline: Option<u64>,

    /// Passages per submitted batch
    /// Default: 1000
    #[arg(long, env = "TONAL_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Also keep each chunk's payload in this directory
    #[arg(long, env = "TONAL_BATCH_FILE_DIR")]
    pub batch_file_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn run_config(&self) -> tonal_core::BatchResult<RunConfig> {
        let mut cfg = self.request.run_config()?;
        if let Some(window) = &self.completion_window {
            cfg.completion_window = window.clone();
        }
        if let Some(secs) = self.poll_interval {
            cfg.poll_interval_secs = secs;
        }
        if self.max_polls.is_some() {
            cfg.max_polls = self.max_polls;
        }
        if self.deadline.is_some() {
            cfg.deadline_secs = self.deadline;
        }
        if let Some(size) = self.chunk_size {
            cfg.chunk_size = size;
        }
        if self.batch_file_dir.is_some() {
            cfg.batch_file_dir = self.batch_file_dir.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
