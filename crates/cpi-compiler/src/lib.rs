//! CPI→PRISM compiler (C2–C4).
//!
//! A pure, total function of a validated [`cpi_core::Cpi`]: synthesises the
//! predicate family (C2), one module per region (C3), and one reward
//! structure per impact dimension (C4), then renders the result as the
//! PRISM model text and property text described in the project's spec
//! (§6.2, §6.3). No I/O and no external process calls live here — that is
//! `cpi-checker`'s job.

pub mod compiler;

pub use compiler::closure::ClosureViolation;
pub use compiler::prism_ast::PrismModel;
pub use compiler::property::render_property;
pub use compiler::{compile, CompileError};
