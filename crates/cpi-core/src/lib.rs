//! CPI (choreographic process instance) tree model.
//!
//! In-memory representation of the hierarchical process tree described in
//! the project's spec: composite constructors (sequence, parallel,
//! exclusive choice, probabilistic branch, probabilistic loop) whose
//! leaves are timed tasks bearing multi-dimensional impact vectors.
//! Parsing, validation, and traversal only — no PRISM concepts live here.

mod error;
mod model;
mod tree;

pub use error::CpiError;
pub use model::Cpi;
pub use tree::{Position, RegionId, RegionKind};
