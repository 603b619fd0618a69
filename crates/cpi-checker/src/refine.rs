//! The bound-refinement controller (C5): a coordinate-wise dichotomous
//! search over per-impact upper bounds, using yes/no verdicts from an
//! external probabilistic model checker (§4.5).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cpi_compiler::render_property;

use crate::checker::{Checker, Verdict};
use crate::error::RefinementError;

/// Abstracts over "write a property file for these bounds, then ask the
/// checker about it." The refinement loop only ever needs this one
/// operation repeated; splitting it out keeps [`refine`] ignorant of
/// where property files live or how the model file is named.
pub trait BoundsOracle {
    fn ask(&self, bounds: &BTreeMap<String, f64>) -> Result<Verdict, RefinementError>;
}

/// Disk-backed [`BoundsOracle`]: renders each candidate bound vector to a
/// property file at a fixed path and re-invokes the configured [`Checker`]
/// against the already-compiled model file.
pub struct ProcessBoundsOracle<'a, C> {
    checker: &'a C,
    model_path: PathBuf,
    property_path: PathBuf,
    resource_flags: &'a [String],
}

impl<'a, C: Checker> ProcessBoundsOracle<'a, C> {
    pub fn new(
        checker: &'a C,
        model_path: impl Into<PathBuf>,
        property_path: impl Into<PathBuf>,
        resource_flags: &'a [String],
    ) -> Self {
        Self {
            checker,
            model_path: model_path.into(),
            property_path: property_path.into(),
            resource_flags,
        }
    }
}

impl<'a, C: Checker> BoundsOracle for ProcessBoundsOracle<'a, C> {
    fn ask(&self, bounds: &BTreeMap<String, f64>) -> Result<Verdict, RefinementError> {
        let text = render_property(bounds);
        std::fs::write(&self.property_path, text)
            .map_err(|e| RefinementError::Io(self.property_path.clone(), e))?;
        let output = self
            .checker
            .check(&self.model_path, &self.property_path, self.resource_flags)?;
        Ok(output.verdict)
    }
}

/// Result of a full refinement run (§4.5, §7). `budget_exhausted` is data,
/// not an error: running out of bisections without a final `unsat` is a
/// normal, successful outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutcome {
    pub final_bounds: BTreeMap<String, f64>,
    pub budget_exhausted: bool,
}

/// Runs the coordinate-wise bisection search described in §4.5 starting
/// from `initial_bounds` (typically [`crate::sampler::sample_expected_impacts`]'s
/// output), for `budget` iterations over every impact in sorted order.
///
/// Returns `Err(NoSolution)`-shaped failure via the final verification step
/// reporting `unsat`: per §4.5 this is reported as "no solution", which we
/// surface by returning `Ok` with `final_bounds` but flip `budget_exhausted`
/// is orthogonal — see [`refine`]'s return type note below for the exact
/// contract.
pub fn refine(
    initial_bounds: &BTreeMap<String, f64>,
    budget: u32,
    oracle: &dyn BoundsOracle,
) -> Result<RefinementOutcome, RefinementError> {
    if initial_bounds.is_empty() {
        return Err(RefinementError::NoImpacts);
    }

    let keys: Vec<String> = initial_bounds.keys().cloned().collect();
    let mut lo: BTreeMap<String, f64> = keys.iter().map(|k| (k.clone(), 0.0)).collect();
    let mut hi: BTreeMap<String, f64> = initial_bounds.clone();
    let mut final_bounds: BTreeMap<String, f64> = initial_bounds.clone();

    for iteration in 1..=budget {
        for k in &keys {
            let mid = (lo[k] + hi[k]) / 2.0;
            let mut test_bounds = hi.clone();
            test_bounds.insert(k.clone(), mid);

            let verdict = oracle.ask(&test_bounds)?;
            tracing::debug!(iteration, impact = %k, mid, ?verdict, "refinement probe");

            match verdict {
                Verdict::Sat => {
                    final_bounds = hi.clone();
                    hi.insert(k.clone(), mid);
                }
                Verdict::Unsat => {
                    lo.insert(k.clone(), mid);
                }
            }
        }
    }

    let verified = oracle.ask(&final_bounds)?;
    let budget_exhausted = verified == Verdict::Unsat;
    if budget_exhausted {
        tracing::warn!("final verification against narrowed bounds was unsat: no solution");
    }

    Ok(RefinementOutcome {
        final_bounds,
        budget_exhausted,
    })
}

/// Convenience wrapper for callers that already have a rendered model on
/// disk and just want to drive a [`ProcessBoundsOracle`] end to end.
pub fn refine_with_checker<C: Checker>(
    initial_bounds: &BTreeMap<String, f64>,
    budget: u32,
    checker: &C,
    model_path: &Path,
    property_path: &Path,
    resource_flags: &[String],
) -> Result<RefinementOutcome, RefinementError> {
    let oracle = ProcessBoundsOracle::new(checker, model_path, property_path, resource_flags);
    refine(initial_bounds, budget, &oracle)
}
