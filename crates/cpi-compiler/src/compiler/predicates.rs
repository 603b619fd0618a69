//! C2 — Predicate Synthesiser.
//!
//! Emits the fixed family of "pending" formulas that serialise opening,
//! closing, and time-stepping into a strict order (§4.2 of the project
//! spec), so the generated MDP carries no nondeterminism beyond the one
//! kind the modeller actually asked for (exclusive choice).

use cpi_core::{Cpi, Position, RegionId, RegionKind};

use super::names::*;
use super::prism_ast::{CmpOp, Expr, Formula, FormulaSection};

/// All formula sections, plus the id sets the module synthesiser needs
/// to know which regions have a `ReadyPending`/`ClosingPending` formula
/// (every region has `ClosingPending`; only non-root regions have
/// `ReadyPending`).
pub struct Predicates {
    pub sections: Vec<FormulaSection>,
    pub closing_pending_ids: Vec<RegionId>,
    pub ready_pending_ids: Vec<RegionId>,
}

pub fn synthesise(cpi: &Cpi) -> Predicates {
    let closing_pending_ids: Vec<RegionId> = cpi.regions().map(|(id, _)| id).collect();
    let ready_pending_ids: Vec<RegionId> = cpi
        .regions()
        .filter(|(id, _)| cpi.parent(*id).is_some())
        .map(|(id, _)| id)
        .collect();

    let mut closing_section = FormulaSection::default();
    for &id in &closing_pending_ids {
        closing_section.formulas.push(Formula {
            name: closing_pending(id),
            body: closing_pending_expr(cpi, id),
        });
    }

    let mut ready_section = FormulaSection::default();
    for &id in &ready_pending_ids {
        ready_section.formulas.push(Formula {
            name: ready_pending(id),
            body: ready_pending_expr(cpi, id),
        });
    }

    let mut loop_section = FormulaSection::default();
    for l in cpi.loops() {
        let child = loop_child_id(cpi, l);
        loop_section.formulas.push(Formula {
            name: loop_child_completed(l),
            body: Expr::and(vec![Expr::eq(state_var(l), 3), Expr::eq(state_var(child), 4)]),
        });
        loop_section.formulas.push(Formula {
            name: loop_should_restart(l),
            body: Expr::and(vec![Expr::eq(state_var(l), 3), Expr::eq(state_var(child), 1)]),
        });
        loop_section.formulas.push(Formula {
            name: loop_child_excluded(l),
            body: Expr::and(vec![Expr::eq(state_var(l), 3), Expr::eq(state_var(child), 0)]),
        });
    }

    let mut cleared_section = FormulaSection::default();
    cleared_section.formulas.push(Formula {
        name: READY_PENDING_CLEARED.to_string(),
        body: Expr::and(
            ready_pending_ids
                .iter()
                .map(|&id| Expr::FormulaRef(ready_pending(id)).not())
                .collect::<Vec<_>>(),
        ),
    });
    cleared_section.formulas.push(Formula {
        name: CLOSING_PENDING_CLEARED.to_string(),
        body: Expr::and(
            closing_pending_ids
                .iter()
                .map(|&id| Expr::FormulaRef(closing_pending(id)).not())
                .collect::<Vec<_>>(),
        ),
    });

    let mut step_ready_section = FormulaSection::default();
    for id in cpi.tasks() {
        let duration = cpi.duration(id).expect("task has duration");
        step_ready_section.formulas.push(Formula {
            name: step_ready(id),
            body: Expr::and(vec![
                Expr::r#in(state_var(id), vec![2, 3]),
                Expr::cmp(step_var(id), CmpOp::Lt, duration as i64),
            ]),
        });
    }

    let mut step_available_section = FormulaSection::default();
    let mut step_available_parts = vec![
        Expr::FormulaRef(READY_PENDING_CLEARED.to_string()),
        Expr::FormulaRef(CLOSING_PENDING_CLEARED.to_string()),
    ];
    for l in cpi.loops() {
        step_available_parts.push(Expr::FormulaRef(loop_child_completed(l)).not());
        step_available_parts.push(Expr::FormulaRef(loop_should_restart(l)).not());
        step_available_parts.push(Expr::FormulaRef(loop_child_excluded(l)).not());
    }
    step_available_parts.push(Expr::or(
        cpi.tasks()
            .map(|id| Expr::FormulaRef(step_ready(id)))
            .collect::<Vec<_>>(),
    ));
    step_available_section.formulas.push(Formula {
        name: STEP_AVAILABLE.to_string(),
        body: Expr::and(step_available_parts),
    });

    let mut active_ready_section = FormulaSection::default();
    for (i, &id) in ready_pending_ids.iter().enumerate() {
        let mut parts = vec![Expr::FormulaRef(ready_pending(id))];
        for &lower in &ready_pending_ids[..i] {
            parts.push(Expr::FormulaRef(ready_pending(lower)).not());
        }
        active_ready_section.formulas.push(Formula {
            name: active_ready_pending(id),
            body: Expr::and(parts),
        });
    }

    let mut active_closing_section = FormulaSection::default();
    for (i, &id) in closing_pending_ids.iter().enumerate() {
        let mut parts = vec![
            Expr::FormulaRef(READY_PENDING_CLEARED.to_string()),
            Expr::FormulaRef(closing_pending(id)),
        ];
        for &lower in &closing_pending_ids[..i] {
            parts.push(Expr::FormulaRef(closing_pending(lower)).not());
        }
        active_closing_section.formulas.push(Formula {
            name: active_closing_pending(id),
            body: Expr::and(parts),
        });
    }

    Predicates {
        sections: vec![
            closing_section,
            ready_section,
            loop_section,
            cleared_section,
            step_ready_section,
            step_available_section,
            active_ready_section,
            active_closing_section,
        ],
        closing_pending_ids,
        ready_pending_ids,
    }
}

fn loop_child_id(cpi: &Cpi, loop_id: RegionId) -> RegionId {
    match cpi.kind(loop_id) {
        Some(RegionKind::Loop { child, .. }) => *child,
        _ => unreachable!("loop id must name a Loop region"),
    }
}

fn closing_pending_expr(cpi: &Cpi, id: RegionId) -> Expr {
    let sv = state_var(id);
    match cpi.kind(id).expect("region exists") {
        RegionKind::Task { duration, .. } => Expr::and(vec![
            Expr::eq(sv, 3),
            Expr::cmp(step_var(id), CmpOp::Eq, *duration as i64),
        ]),
        RegionKind::Sequence { tail, .. } => {
            Expr::and(vec![Expr::eq(sv, 3), Expr::r#in(state_var(*tail), vec![4, 5])])
        }
        RegionKind::Parallel {
            first_split,
            second_split,
        } => Expr::and(vec![
            Expr::eq(sv, 3),
            Expr::r#in(state_var(*first_split), vec![4, 5]),
            Expr::r#in(state_var(*second_split), vec![4, 5]),
        ]),
        RegionKind::Choice { r#true, r#false } | RegionKind::Nature { r#true, r#false, .. } => {
            Expr::and(vec![
                Expr::eq(sv, 3),
                Expr::or(vec![
                    Expr::r#in(state_var(*r#true), vec![4, 5]),
                    Expr::r#in(state_var(*r#false), vec![4, 5]),
                ]),
            ])
        }
        RegionKind::Loop { child, .. } => Expr::and(vec![Expr::eq(sv, 3), Expr::eq(state_var(*child), 0)]),
    }
}

fn ready_pending_expr(cpi: &Cpi, id: RegionId) -> Expr {
    let (parent_id, position) = cpi.parent(id).expect("ReadyPending only defined for non-root");
    let sv = state_var(id);
    let psv = state_var(parent_id);
    match cpi.kind(parent_id).expect("parent exists") {
        RegionKind::Sequence { head, .. } => match position {
            Position::Head => Expr::and(vec![Expr::eq(sv, 1), Expr::eq(psv, 2)]),
            Position::Tail => Expr::and(vec![
                Expr::eq(sv, 1),
                Expr::r#in(psv, vec![2, 3]),
                Expr::r#in(state_var(*head), vec![4, 5]),
            ]),
            _ => unreachable!("sequence child must be head or tail"),
        },
        RegionKind::Parallel { .. } => Expr::and(vec![Expr::eq(sv, 1), Expr::r#in(psv, vec![2, 3])]),
        RegionKind::Choice { r#true, .. } | RegionKind::Nature { r#true, .. } => match position {
            Position::True_ => Expr::and(vec![Expr::eq(sv, 1), Expr::r#in(psv, vec![2, 3])]),
            Position::False_ => Expr::and(vec![
                Expr::eq(sv, 1),
                Expr::r#in(psv, vec![2, 3]),
                Expr::r#in(state_var(*r#true), vec![0, 2]),
            ]),
            _ => unreachable!("choice/nature child must be true_ or false_"),
        },
        RegionKind::Loop { .. } => Expr::and(vec![Expr::eq(sv, 1), Expr::eq(psv, 2)]),
        RegionKind::Task { .. } => unreachable!("task cannot be a parent"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_ready_pending_is_ordered_by_id() {
        let cpi = cpi_core::Cpi::load(
            r#"{
            "type":"parallel","id":0,
            "first_split":{"type":"task","id":1,"duration":1,"impacts":{}},
            "second_split":{"type":"task","id":2,"duration":1,"impacts":{}}
        }"#,
        )
        .unwrap();
        let preds = synthesise(&cpi);
        assert_eq!(preds.ready_pending_ids, vec![1, 2]);
        let active_section = &preds.sections[6];
        assert_eq!(active_section.formulas.len(), 2);
        assert_eq!(active_section.formulas[0].name, "ActiveReadyPending_1");
        // region 2's active formula excludes itself if region 1 fires first.
        let rendered = active_section.formulas[1].body.render();
        assert!(rendered.contains("!(ReadyPending_1)"));
    }

    #[test]
    fn step_available_references_all_loop_guards() {
        let cpi = cpi_core::Cpi::load(
            r#"{
            "type":"loop","id":0,"probability":0.5,
            "child":{"type":"task","id":1,"duration":1,"impacts":{"c":2}}
        }"#,
        )
        .unwrap();
        let preds = synthesise(&cpi);
        let step_available = &preds.sections[5].formulas[0];
        let rendered = step_available.body.render();
        assert!(rendered.contains("LoopChildCompleted_0"));
        assert!(rendered.contains("LoopShouldRestart_0"));
        assert!(rendered.contains("LoopChildExcluded_0"));
    }
}
