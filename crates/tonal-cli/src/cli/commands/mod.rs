use super::args::*;

pub mod build;
pub mod checklist;
pub mod demux;
pub mod run;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Checklist(args) => checklist::run(args),
        Command::Build(args) => build::run(args),
        Command::Run(args) => run::run(args).await,
        Command::Demux(args) => demux::run(args),
    }
}

/// Rubric from `--rubric`, or the built-in one.
pub(crate) fn load_rubric(args: &RubricArgs) -> anyhow::Result<tonal_core::Rubric> {
    Ok(match &args.rubric {
        Some(path) => tonal_core::Rubric::load(path)?,
        None => tonal_core::Rubric::default(),
    })
}
