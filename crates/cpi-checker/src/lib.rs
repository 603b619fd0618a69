//! External checker adapter, initial-bound sampler, and the multi-impact
//! bound-refinement controller (C5).
//!
//! Everything that talks to a subprocess or the filesystem lives here;
//! `cpi-core` and `cpi-compiler` stay pure and I/O-free.

pub mod checker;
pub mod error;
pub mod refine;
pub mod sampler;

pub use checker::{Checker, CheckerOutput, FakeChecker, ModelStats, ProcessChecker, Verdict};
pub use error::{CheckerError, RefinementError};
pub use refine::{refine, refine_with_checker, BoundsOracle, ProcessBoundsOracle, RefinementOutcome};
pub use sampler::{sample_expected_impacts, DEFAULT_MAX_LOOP_ITERATIONS};
