//! Error taxonomy for the external checker adapter and the refinement
//! controller (§7 of the project spec).

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong invoking and parsing the external
/// probabilistic model checker (§6.4). A non-zero exit, a spawn failure,
/// or a parse failure are all reported here — never silently swallowed.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("failed to spawn checker process: {0}")]
    Io(#[source] std::io::Error),

    #[error("checker exited with status {code:?}: {stderr_excerpt}")]
    NonZeroExit {
        code: Option<i32>,
        stderr_excerpt: String,
    },

    #[error("could not extract a verdict from checker output: {stdout_excerpt}")]
    Unparseable { stdout_excerpt: String },
}

/// Errors from the bound-refinement controller (C5). `BudgetExhausted` is
/// deliberately *not* a variant here — §7 specifies it is returned as data
/// (see [`crate::refine::RefinementOutcome`]), not raised as a failure.
#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("refinement requested on a CPI with no impact-bearing task")]
    NoImpacts,

    #[error("checker invocation failed: {0}")]
    Checker(#[from] CheckerError),

    #[error("failed to write property file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}
