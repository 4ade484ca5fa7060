use tonal_core::{Demultiplexer, KeywordCatalog};
use tracing::info;

use crate::cli::args::DemuxArgs;
use crate::exit_codes;
use crate::io::{read_evaluations, write_wide_table};

pub fn run(args: DemuxArgs) -> anyhow::Result<i32> {
    let catalog = match &args.keywords {
        Some(path) => KeywordCatalog::load(path)?,
        None => KeywordCatalog::default(),
    };
    let demux = Demultiplexer::with_catalog(catalog)?;

    let rows = read_evaluations(&args.input, &args.key_column, &args.evaluation_column)?;
    let table = demux.demux(rows);

    write_wide_table(&args.out, &table, args.column_style.into(), &args.key_column)?;
    info!(path = %args.out.display(), rows = table.rows.len(), "wide table written");

    let s = table.summary();
    println!(
        "rows: {}, scores written: {}, parse errors: {}, unmatched: {}, ambiguous: {}, missing scores: {}, out of range: {}",
        s.rows, s.cells_written, s.parse_errors, s.unmatched, s.ambiguous, s.missing_scores, s.out_of_range
    );
    Ok(exit_codes::SUCCESS)
}
