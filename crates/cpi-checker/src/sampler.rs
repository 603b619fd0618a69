//! `sample_expected_impact` (§4.5): a recursive symbolic expected-value
//! aggregation across a CPI tree, producing the initial upper-bound seed
//! `U0` the refinement search narrows from `[0, U0]`.

use std::collections::BTreeMap;

use cpi_core::{Cpi, RegionId, RegionKind};
use rand::Rng;

/// Default cap on the geometric series `1/(1-q)` used for a loop whose
/// repeat probability approaches 1 (§4.5).
pub const DEFAULT_MAX_LOOP_ITERATIONS: u32 = 100;

/// Computes `U0_k` for every impact name appearing anywhere in the CPI.
/// Missing keys at a task are treated as zero contribution.
pub fn sample_expected_impacts(cpi: &Cpi, max_loop_iterations: u32) -> BTreeMap<String, f64> {
    let names = cpi.impact_names();
    let mut rng = rand::thread_rng();
    let totals = aggregate(cpi, cpi.root(), max_loop_iterations, &mut rng);
    names
        .into_iter()
        .map(|name| (name.clone(), totals.get(&name).copied().unwrap_or(0.0)))
        .collect()
}

fn aggregate(
    cpi: &Cpi,
    region: RegionId,
    max_loop_iterations: u32,
    rng: &mut impl Rng,
) -> BTreeMap<String, f64> {
    match cpi.kind(region).expect("region id from the tree itself always resolves") {
        RegionKind::Task { impacts, .. } => impacts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
        RegionKind::Sequence { head, tail } => sum(
            aggregate(cpi, *head, max_loop_iterations, rng),
            aggregate(cpi, *tail, max_loop_iterations, rng),
        ),
        RegionKind::Parallel {
            first_split,
            second_split,
        } => sum(
            aggregate(cpi, *first_split, max_loop_iterations, rng),
            aggregate(cpi, *second_split, max_loop_iterations, rng),
        ),
        RegionKind::Choice { r#true, r#false } => {
            // The worst case over a nondeterministic choice isn't computed
            // here: pick one branch uniformly as a stochastic seed, left
            // for the search to tighten (§4.5).
            let chosen = if rng.gen_bool(0.5) { *r#true } else { *r#false };
            aggregate(cpi, chosen, max_loop_iterations, rng)
        }
        RegionKind::Nature {
            probability,
            r#true,
            r#false,
        } => {
            let p = *probability;
            let t = aggregate(cpi, *r#true, max_loop_iterations, rng);
            let f = aggregate(cpi, *r#false, max_loop_iterations, rng);
            scaled_sum(p, t, 1.0 - p, f)
        }
        RegionKind::Loop { probability, child } => {
            let child_totals = aggregate(cpi, *child, max_loop_iterations, rng);
            let expected_iterations = if *probability >= 1.0 {
                max_loop_iterations as f64
            } else {
                (1.0 / (1.0 - *probability)).min(max_loop_iterations as f64)
            };
            child_totals
                .into_iter()
                .map(|(k, v)| (k, v * expected_iterations))
                .collect()
        }
    }
}

fn sum(a: BTreeMap<String, f64>, b: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    scaled_sum(1.0, a, 1.0, b)
}

fn scaled_sum(
    scale_a: f64,
    a: BTreeMap<String, f64>,
    scale_b: f64,
    b: BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (k, v) in a {
        *out.entry(k).or_insert(0.0) += scale_a * v;
    }
    for (k, v) in b {
        *out.entry(k).or_insert(0.0) += scale_b * v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_task_returns_its_own_impacts() {
        let cpi = Cpi::load(r#"{"type":"task","id":0,"duration":1,"impacts":{"cost":5}}"#).unwrap();
        let bounds = sample_expected_impacts(&cpi, DEFAULT_MAX_LOOP_ITERATIONS);
        assert_eq!(bounds.get("cost"), Some(&5.0));
    }

    #[test]
    fn sequence_sums_children() {
        let cpi = Cpi::load(
            r#"{
                "type":"sequence","id":0,
                "head":{"type":"task","id":1,"duration":1,"impacts":{"c":1}},
                "tail":{"type":"task","id":2,"duration":1,"impacts":{"c":2}}
            }"#,
        )
        .unwrap();
        let bounds = sample_expected_impacts(&cpi, DEFAULT_MAX_LOOP_ITERATIONS);
        assert_eq!(bounds.get("c"), Some(&3.0));
    }

    #[test]
    fn nature_is_probability_weighted() {
        let cpi = Cpi::load(
            r#"{
                "type":"nature","id":0,"probability":0.25,
                "true":{"type":"task","id":1,"duration":1,"impacts":{"c":8}},
                "false":{"type":"task","id":2,"duration":1,"impacts":{"c":0}}
            }"#,
        )
        .unwrap();
        let bounds = sample_expected_impacts(&cpi, DEFAULT_MAX_LOOP_ITERATIONS);
        assert_eq!(bounds.get("c"), Some(&2.0));
    }

    #[test]
    fn loop_scales_by_expected_geometric_iterations() {
        let cpi = Cpi::load(
            r#"{
                "type":"loop","id":0,"probability":0.5,
                "child":{"type":"task","id":1,"duration":1,"impacts":{"c":2}}
            }"#,
        )
        .unwrap();
        let bounds = sample_expected_impacts(&cpi, DEFAULT_MAX_LOOP_ITERATIONS);
        // 1 / (1 - 0.5) = 2 expected iterations.
        assert_eq!(bounds.get("c"), Some(&4.0));
    }

    #[test]
    fn loop_near_certain_repeat_is_capped() {
        let cpi = Cpi::load(
            r#"{
                "type":"loop","id":0,"probability":0.999,
                "child":{"type":"task","id":1,"duration":1,"impacts":{"c":1}}
            }"#,
        )
        .unwrap();
        let bounds = sample_expected_impacts(&cpi, 10);
        assert_eq!(bounds.get("c"), Some(&10.0));
    }

    #[test]
    fn missing_impact_key_defaults_to_zero() {
        let cpi = Cpi::load(
            r#"{
                "type":"sequence","id":0,
                "head":{"type":"task","id":1,"duration":1,"impacts":{"c":1}},
                "tail":{"type":"task","id":2,"duration":1,"impacts":{"t":5}}
            }"#,
        )
        .unwrap();
        let bounds = sample_expected_impacts(&cpi, DEFAULT_MAX_LOOP_ITERATIONS);
        assert_eq!(bounds.get("c"), Some(&1.0));
        assert_eq!(bounds.get("t"), Some(&5.0));
    }
}
