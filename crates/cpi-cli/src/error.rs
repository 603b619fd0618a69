//! `cpi-cli`'s error type: a thin aggregation over the lower crates' error
//! families plus the file I/O failures that only the CLI layer commits
//! (§7, SPEC_FULL.md §3.1).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {0}: {1}")]
    IoFailure(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    InvalidCpi(#[from] cpi_core::CpiError),

    #[error(transparent)]
    Compile(#[from] cpi_compiler::CompileError),

    #[error(transparent)]
    Refinement(#[from] cpi_checker::RefinementError),
}
