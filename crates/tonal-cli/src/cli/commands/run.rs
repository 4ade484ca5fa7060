use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tonal_core::{run_chunked_with, BatchError, OpenAiBatchClient, Poller};
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::exit_codes;
use crate::io::{read_passages, OutcomeWriter};

use super::load_rubric;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let rubric = load_rubric(&args.rubric)?;
    let config = args.run_config()?;
    let passages = read_passages(&args.input)?;
    let client = OpenAiBatchClient::from_env()?;

    let cancel = CancellationToken::new();
    let poller = Poller::new(config.poll_interval())
        .with_max_polls(config.max_polls)
        .with_deadline(config.deadline())
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping at the next status check");
            cancel.cancel();
        }
    });

    info!(
        model = %config.model,
        rubric = %rubric.fingerprint(),
        base_url = client.base_url(),
        "starting batch run"
    );

    let mut writer = OutcomeWriter::create(&args.out)?;
    let summary = run_chunked_with(
        &client,
        &passages,
        &rubric.checklist_text(),
        &config,
        &poller,
        |_, outcomes| {
            writer.append(outcomes).map_err(|e| BatchError::Io {
                message: format!("{:#}", e),
            })
        },
    )
    .await
    .with_context(|| format!("run aborted; completed chunks are in {}", args.out.display()))?;

    let missing = summary.missing();
    println!(
        "{} outcomes ({} passed validation) written to {}",
        writer.written(),
        summary.passed(),
        args.out.display()
    );
    if !missing.is_empty() {
        println!("{} inputs produced no output: {}", missing.len(), missing.join(", "));
        return Ok(exit_codes::INCOMPLETE);
    }
    Ok(exit_codes::SUCCESS)
}
