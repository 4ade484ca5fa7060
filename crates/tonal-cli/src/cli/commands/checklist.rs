use crate::cli::args::ChecklistArgs;
use crate::exit_codes;

use super::load_rubric;

pub fn run(args: ChecklistArgs) -> anyhow::Result<i32> {
    let rubric = load_rubric(&args.rubric)?;
    if args.fingerprint {
        println!("{}", rubric.fingerprint());
    } else {
        println!("{}", rubric.checklist_text());
    }
    Ok(exit_codes::SUCCESS)
}
