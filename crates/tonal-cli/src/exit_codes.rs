//! Process exit codes.
//!
//! Failures of the core map through `BatchError::exit_code`; these cover the
//! rest.

use tonal_core::BatchError;

pub const SUCCESS: i32 = 0;
/// Run finished, but some inputs got no outcome. Failed validations do not set this.
pub const INCOMPLETE: i32 = 1;
/// Fatal error with no more specific code (bad arguments, unreadable files).
pub const INTERNAL_ERROR: i32 = 2;

/// Exit code for a fatal error, taken from the first `BatchError` in its chain.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BatchError>())
        .map_or(INTERNAL_ERROR, BatchError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn batch_error_code_survives_context() {
        let err: anyhow::Result<()> = Err(BatchError::JobFailed {
            job_id: "b".into(),
            status: "expired".into(),
        })
        .context("chunk 1 failed");
        assert_eq!(for_error(&err.unwrap_err()), 4);
    }

    #[test]
    fn other_errors_are_internal() {
        assert_eq!(for_error(&anyhow::anyhow!("nope")), INTERNAL_ERROR);
    }
}
