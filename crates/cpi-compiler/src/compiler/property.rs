//! Renders the PRISM property file (§6.3): a single `multi(...)` PCTL
//! query asking whether a scheduler exists under which every listed
//! expected cumulative reward stays below its threshold.

use std::collections::BTreeMap;

use super::prism_ast::format_const;

/// `multi(R{"k1"}<=v1 [C], R{"k2"}<=v2 [C], ...)`, impact names sorted
/// lexicographically for determinism (Property 1).
pub fn render_property(bounds: &BTreeMap<String, f64>) -> String {
    let clauses: Vec<String> = bounds
        .iter()
        .map(|(name, value)| format!("R{{\"{name}\"}}<={} [C]", format_const(*value)))
        .collect();
    format!("multi({})", clauses.join(", "))
}
