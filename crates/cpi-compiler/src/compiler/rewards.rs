//! C4 — Rewards Synthesiser.
//!
//! One `rewards "k" ... endrewards` block per distinct impact dimension,
//! gated on the accepting terminal marking `state_root=4` so the
//! cumulative reward stays finite on every terminating path (§4.4).

use cpi_core::Cpi;

use super::names::state_var;
use super::prism_ast::{Expr, RewardItem, Rewards};

pub fn synthesise(cpi: &Cpi) -> Vec<Rewards> {
    let root_completed = Expr::eq(state_var(cpi.root()), 4);
    let task_impacts = cpi.task_impacts();

    cpi.impact_names()
        .into_iter()
        .map(|impact_name| {
            let mut items = Vec::new();
            for task in cpi.tasks() {
                let Some(value) = task_impacts.get(&task).and_then(|m| m.get(&impact_name)) else {
                    continue;
                };
                let guard = Expr::and(vec![
                    root_completed.clone(),
                    Expr::cmp(state_var(task), super::prism_ast::CmpOp::Ne, 0),
                    Expr::cmp(state_var(task), super::prism_ast::CmpOp::Ne, 1),
                ]);
                items.push(RewardItem { guard, value: *value });
            }
            Rewards { impact_name, items }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_rewards_block_per_impact_sorted() {
        let json = r#"{
            "type":"parallel","id":0,
            "first_split":{"type":"task","id":1,"duration":2,"impacts":{"cost":1,"time":2}},
            "second_split":{"type":"task","id":2,"duration":3,"impacts":{"cost":2,"time":3}}
        }"#;
        let cpi = Cpi::load(json).unwrap();
        let rewards = synthesise(&cpi);
        let names: Vec<_> = rewards.iter().map(|r| r.impact_name.clone()).collect();
        assert_eq!(names, vec!["cost".to_string(), "time".to_string()]);
        assert_eq!(rewards[0].items.len(), 2);
    }

    #[test]
    fn task_missing_an_impact_is_skipped() {
        let json = r#"{
            "type":"sequence","id":0,
            "head":{"type":"task","id":1,"duration":1,"impacts":{"cost":1}},
            "tail":{"type":"task","id":2,"duration":1,"impacts":{}}
        }"#;
        let cpi = Cpi::load(json).unwrap();
        let rewards = synthesise(&cpi);
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].items.len(), 1);
    }
}
