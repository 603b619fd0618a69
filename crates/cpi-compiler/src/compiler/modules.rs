//! C3 — Module Synthesiser.
//!
//! Emits one PRISM module per region: opening transitions (parent-aware),
//! closing, task/composite time evolution under the shared `step` action,
//! and — for loops — the three-action synchronisation protocol that lets
//! a loop body re-enter OPEN without duplicating its state (§4.3.5–4.3.6
//! of the project spec).

use cpi_core::{Cpi, Position, RegionId, RegionKind};

use super::names::*;
use super::prism_ast::{Arm, Assign, CmpOp, Command, Expr, Module, VarDecl};

pub fn synthesise(cpi: &Cpi) -> Vec<Module> {
    cpi.regions()
        .map(|(id, kind)| module_for(cpi, id, kind))
        .collect()
}

fn module_for(cpi: &Cpi, id: RegionId, kind: &RegionKind) -> Module {
    let mut variables = vec![VarDecl {
        name: state_var(id),
        low: 0,
        high: 5,
        init: if id == cpi.root() { 2 } else { 1 },
    }];
    if let RegionKind::Task { duration, .. } = kind {
        variables.push(VarDecl {
            name: step_var(id),
            low: 0,
            high: *duration as i64,
            init: 0,
        });
    }

    let mut commands = Vec::new();
    commands.extend(opening_commands(cpi, id));
    commands.extend(closing_command(id, kind));
    commands.extend(time_evolution_commands(id, kind));
    commands.extend(loop_protocol_commands(id, kind));
    commands.extend(loop_reset_commands(cpi, id));

    Module {
        name: module_name(kind.kind_name(), id),
        variables,
        commands,
    }
}

fn opening_commands(cpi: &Cpi, id: RegionId) -> Vec<Command> {
    let Some((parent_id, position)) = cpi.parent(id) else {
        return Vec::new();
    };
    let sv = state_var(id);
    let arp = Expr::FormulaRef(active_ready_pending(id));

    match cpi.kind(parent_id).expect("parent exists") {
        RegionKind::Sequence { .. } | RegionKind::Parallel { .. } | RegionKind::Loop { .. } => {
            vec![start_command(&sv, id, arp)]
        }
        RegionKind::Choice { r#true, .. } => match position {
            Position::True_ => vec![
                start_command(&sv, id, arp.clone()),
                disable_command(&sv, id, arp),
            ],
            Position::False_ => {
                let true_sv = state_var(*r#true);
                vec![
                    start_command(&sv, id, Expr::and(vec![arp.clone(), Expr::eq(true_sv.clone(), 0)])),
                    disable_command(&sv, id, Expr::and(vec![arp, Expr::eq(true_sv, 2)])),
                ]
            }
            _ => unreachable!("choice child must be true_ or false_"),
        },
        RegionKind::Nature { probability, r#true, .. } => match position {
            Position::True_ => vec![Command {
                action: None,
                name: open_to_nature(id),
                guard: arp,
                arms: vec![
                    Arm::weighted(*probability, vec![Assign::Int(sv.clone(), 2)]),
                    Arm::weighted(1.0 - probability, vec![Assign::Int(sv.clone(), 0)]),
                ],
            }],
            Position::False_ => {
                let true_sv = state_var(*r#true);
                vec![
                    start_command(&sv, id, Expr::and(vec![arp.clone(), Expr::eq(true_sv.clone(), 0)])),
                    disable_command(&sv, id, Expr::and(vec![arp, Expr::eq(true_sv, 2)])),
                ]
            }
            _ => unreachable!("nature child must be true_ or false_"),
        },
        RegionKind::Task { .. } => unreachable!("task cannot be a parent"),
    }
}

fn start_command(sv: &str, id: RegionId, guard: Expr) -> Command {
    Command {
        action: None,
        name: open_to_started(id),
        guard,
        arms: vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 2)])],
    }
}

fn disable_command(sv: &str, id: RegionId, guard: Expr) -> Command {
    Command {
        action: None,
        name: open_to_disabled(id),
        guard,
        arms: vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 0)])],
    }
}

/// §4.3.2: every composite/loop closes via an `ActiveClosingPending`-gated
/// transition. Tasks close implicitly inside their time evolution instead.
fn closing_command(id: RegionId, kind: &RegionKind) -> Option<Command> {
    if kind.is_task() {
        return None;
    }
    Some(Command {
        action: None,
        name: running_to_completed(id),
        guard: Expr::FormulaRef(active_closing_pending(id)),
        arms: vec![Arm::deterministic(vec![Assign::Int(state_var(id), 4)])],
    })
}

fn time_evolution_commands(id: RegionId, kind: &RegionKind) -> Vec<Command> {
    let sv = state_var(id);
    match kind {
        RegionKind::Task { duration, .. } => task_time_evolution(id, &sv, *duration),
        RegionKind::Loop { child, .. } => loop_time_evolution(id, &sv, *child),
        _ => composite_time_evolution(id, &sv),
    }
}

fn step_cmd(name: String, guard: Expr, arms: Vec<Arm>) -> Command {
    Command {
        action: Some(STEP_ACTION.to_string()),
        name,
        guard,
        arms,
    }
}

fn task_time_evolution(id: RegionId, sv: &str, duration: u32) -> Vec<Command> {
    let step = step_var(id);
    let duration = duration as i64;
    let mut commands = Vec::new();

    if duration == 1 {
        commands.push(step_cmd(
            format!("task_complete_{id}"),
            Expr::eq(sv, 2),
            vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 4)])],
        ));
        commands.push(step_cmd(
            format!("task_idle_{id}"),
            Expr::r#in(sv, vec![0, 1, 3, 5]),
            vec![Arm::deterministic(vec![])],
        ));
    } else {
        commands.push(step_cmd(
            format!("task_start_{id}"),
            Expr::eq(sv, 2),
            vec![Arm::deterministic(vec![
                Assign::Int(step.clone(), 1),
                Assign::Int(sv.to_string(), 3),
            ])],
        ));
        commands.push(step_cmd(
            format!("task_advance_{id}"),
            Expr::and(vec![Expr::eq(sv, 3), Expr::cmp(step.clone(), CmpOp::Lt, duration - 1)]),
            vec![Arm::deterministic(vec![Assign::Increment(step.clone())])],
        ));
        commands.push(step_cmd(
            format!("task_finish_{id}"),
            Expr::and(vec![Expr::eq(sv, 3), Expr::cmp(step.clone(), CmpOp::Eq, duration - 1)]),
            vec![Arm::deterministic(vec![
                Assign::Increment(step),
                Assign::Int(sv.to_string(), 4),
            ])],
        ));
        commands.push(step_cmd(
            format!("task_idle_{id}"),
            Expr::r#in(sv, vec![0, 1, 5]),
            vec![Arm::deterministic(vec![])],
        ));
    }

    commands.push(step_cmd(
        format!("task_expire_{id}"),
        Expr::eq(sv, 4),
        vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 5)])],
    ));
    commands
}

fn composite_time_evolution(id: RegionId, sv: &str) -> Vec<Command> {
    vec![
        step_cmd(
            format!("composite_start_{id}"),
            Expr::eq(sv, 2),
            vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 3)])],
        ),
        step_cmd(
            format!("composite_expire_{id}"),
            Expr::eq(sv, 4),
            vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 5)])],
        ),
        step_cmd(
            format!("composite_idle_{id}"),
            Expr::r#in(sv, vec![0, 1, 3, 5]),
            vec![Arm::deterministic(vec![])],
        ),
    ]
}

fn loop_time_evolution(id: RegionId, sv: &str, child: RegionId) -> Vec<Command> {
    let child_sv = state_var(child);
    vec![
        step_cmd(
            format!("loop_start_{id}"),
            Expr::and(vec![Expr::eq(sv, 2), Expr::r#in(child_sv.clone(), vec![2, 3, 4])]),
            vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 3)])],
        ),
        step_cmd(
            format!("loop_wait_{id}"),
            Expr::and(vec![Expr::eq(sv, 2), Expr::r#in(child_sv, vec![2, 3, 4]).not()]),
            vec![Arm::deterministic(vec![])],
        ),
        step_cmd(
            format!("loop_expire_{id}"),
            Expr::eq(sv, 4),
            vec![Arm::deterministic(vec![Assign::Int(sv.to_string(), 5)])],
        ),
        step_cmd(
            format!("loop_idle_{id}"),
            Expr::r#in(sv, vec![0, 1, 3, 5]),
            vec![Arm::deterministic(vec![])],
        ),
    ]
}

/// The three named synchronising actions, emitted only in a loop's own
/// module (§4.3.6 items 2, 3, 5). Each is a no-op from L's perspective —
/// the real state change happens in the child module (see
/// [`loop_reset_commands`]).
fn loop_protocol_commands(id: RegionId, kind: &RegionKind) -> Vec<Command> {
    let RegionKind::Loop { child, .. } = kind else {
        return Vec::new();
    };
    vec![
        Command {
            action: Some(loop_child_completed_sync(id)),
            name: loop_child_completed_sync(id),
            guard: Expr::FormulaRef(loop_child_completed(id)),
            arms: vec![Arm::deterministic(vec![])],
        },
        Command {
            action: Some(loop_decision_sync(id)),
            name: loop_decision_sync(id),
            guard: Expr::FormulaRef(loop_should_restart(id)),
            arms: vec![Arm::deterministic(vec![])],
        },
        Command {
            action: Some(loop_final_reset(id)),
            name: loop_final_reset(id),
            guard: Expr::and(vec![Expr::eq(state_var(id), 4), Expr::eq(state_var(*child), 0)]),
            arms: vec![Arm::deterministic(vec![])],
        },
    ]
}

/// Every loop `L` with `id`'s nearest-enclosing chain, nearest first.
/// Walks `parent_of` rather than `loop_ancestor` because §4.3.7 requires
/// participation in *every* enclosing loop's reset sweep, not only the
/// nearest one.
fn ancestor_loops(cpi: &Cpi, id: RegionId) -> Vec<RegionId> {
    let mut loops = Vec::new();
    let mut current = id;
    while let Some((parent_id, _)) = cpi.parent(current) {
        if cpi.kind(parent_id).map(RegionKind::is_loop).unwrap_or(false) {
            loops.push(parent_id);
        }
        current = parent_id;
    }
    loops
}

/// §4.3.5/4.3.6: a region's participation, in its *own* module, in every
/// enclosing loop's `loop_child_completed_sync_L` reset sweep. The loop's
/// direct child gets the specific completed→reset mirror plus the
/// probabilistic decision and final-reset mirrors (a, b, c); any other
/// descendant — and a direct child with respect to loops further out —
/// gets the generic `state_d≠1 → state_d'=1` reset.
fn loop_reset_commands(cpi: &Cpi, id: RegionId) -> Vec<Command> {
    let is_direct_loop_child = matches!(cpi.parent(id), Some((_, Position::LoopChild)));
    let sv = state_var(id);
    let mut enclosing = ancestor_loops(cpi, id).into_iter();

    let mut commands = Vec::new();
    if is_direct_loop_child {
        let l = enclosing.next().expect("direct loop child has an enclosing loop");
        let RegionKind::Loop { probability, .. } = cpi.kind(l).expect("loop exists") else {
            unreachable!("loop_child parent must be a Loop region");
        };
        commands.push(Command {
            action: Some(loop_child_completed_sync(l)),
            name: format!("{}_{id}", loop_child_completed_sync(l)),
            guard: Expr::eq(sv.clone(), 4),
            arms: vec![Arm::deterministic(vec![Assign::Int(sv.clone(), 1)])],
        });
        commands.push(Command {
            action: Some(loop_decision_sync(l)),
            name: format!("{}_{id}", loop_decision_sync(l)),
            guard: Expr::eq(sv.clone(), 1),
            arms: vec![
                Arm::weighted(*probability, vec![Assign::Int(sv.clone(), 2)]),
                Arm::weighted(1.0 - probability, vec![Assign::Int(sv.clone(), 0)]),
            ],
        });
        commands.push(Command {
            action: Some(loop_final_reset(l)),
            name: format!("{}_{id}", loop_final_reset(l)),
            guard: Expr::eq(sv.clone(), 0),
            arms: vec![Arm::deterministic(vec![Assign::Int(sv.clone(), 1)])],
        });
    }

    for l in enclosing {
        commands.push(Command {
            action: Some(loop_child_completed_sync(l)),
            name: format!("{}_{id}", loop_child_completed_sync(l)),
            guard: Expr::cmp(sv.clone(), CmpOp::Ne, 1),
            arms: vec![Arm::deterministic(vec![Assign::Int(sv.clone(), 1)])],
        });
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpi_core::Cpi;

    #[test]
    fn task_duration_one_collapses_two_to_four() {
        let cpi = Cpi::load(r#"{"type":"task","id":0,"duration":1,"impacts":{"c":5}}"#).unwrap();
        let modules = synthesise(&cpi);
        assert_eq!(modules.len(), 1);
        let rendered = modules[0].render();
        assert!(rendered.contains("state_0'=4"));
        assert!(!rendered.contains("state_0'=3"));
    }

    #[test]
    fn loop_child_gets_three_mirrored_sync_commands() {
        let json = r#"{
            "type":"loop","id":0,"probability":0.5,
            "child":{"type":"task","id":1,"duration":1,"impacts":{"c":2}}
        }"#;
        let cpi = Cpi::load(json).unwrap();
        let modules = synthesise(&cpi);
        let child_module = modules.iter().find(|m| m.name == "task1").unwrap();
        let rendered = child_module.render();
        assert!(rendered.contains("loop_child_completed_sync_0"));
        assert!(rendered.contains("loop_decision_sync_0"));
        assert!(rendered.contains("loop_final_reset_0"));
        assert!(rendered.contains("0.500000:"));
    }

    #[test]
    fn nested_loop_child_resets_on_both_loops() {
        let json = r#"{
            "type":"loop","id":0,"probability":0.5,
            "child":{
                "type":"loop","id":1,"probability":0.3,
                "child":{"type":"task","id":2,"duration":1,"impacts":{"c":1}}
            }
        }"#;
        let cpi = Cpi::load(json).unwrap();
        let modules = synthesise(&cpi);
        let inner_loop_module = modules.iter().find(|m| m.name == "loop1").unwrap();
        let rendered = inner_loop_module.render();
        // loop1 is itself the direct loop_child of loop0: mirrored commands for L=0,
        // plus loop1's own protocol commands for its own child (task2).
        assert!(rendered.contains("loop_child_completed_sync_0"));
        assert!(rendered.contains("loop_child_completed_sync_1"));
    }
}
