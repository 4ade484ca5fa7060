use anyhow::Context;
use tonal_core::{build_requests, serialize_payload};
use tracing::info;

use crate::cli::args::BuildArgs;
use crate::exit_codes;
use crate::io::read_passages;

use super::load_rubric;

/// Dry run: same local checks as `run`, nothing is sent.
pub fn run(args: BuildArgs) -> anyhow::Result<i32> {
    let rubric = load_rubric(&args.rubric)?;
    let config = args.request.run_config()?;
    config.validate()?;

    let passages = read_passages(&args.input)?;
    let requests = build_requests(
        &passages,
        &rubric.checklist_text(),
        &config.request_options(),
    )?;
    let payload = serialize_payload(&requests)?;

    std::fs::write(&args.out, &payload)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(
        path = %args.out.display(),
        requests = requests.len(),
        rubric = %rubric.fingerprint(),
        "batch payload written"
    );
    Ok(exit_codes::SUCCESS)
}
