//! Canonical naming for PRISM variables, formulas, and synchronising actions.
//!
//! Centralised so the predicate synthesiser (C2), module synthesiser (C3),
//! and rewards synthesiser (C4) always agree on a name for the same
//! concept — the single biggest source of Property 2 (syntactic closure)
//! violations in a hand-templated generator like the source repo's.

use cpi_core::RegionId;

pub fn state_var(id: RegionId) -> String {
    format!("state_{id}")
}

pub fn step_var(id: RegionId) -> String {
    format!("step_{id}")
}

pub fn module_name(kind: &str, id: RegionId) -> String {
    format!("{kind}{id}")
}

pub fn closing_pending(id: RegionId) -> String {
    format!("ClosingPending_{id}")
}

pub fn ready_pending(id: RegionId) -> String {
    format!("ReadyPending_{id}")
}

pub fn step_ready(id: RegionId) -> String {
    format!("StepReady_{id}")
}

pub fn active_ready_pending(id: RegionId) -> String {
    format!("ActiveReadyPending_{id}")
}

pub fn active_closing_pending(id: RegionId) -> String {
    format!("ActiveClosingPending_{id}")
}

pub fn loop_child_completed(l: RegionId) -> String {
    format!("LoopChildCompleted_{l}")
}

pub fn loop_should_restart(l: RegionId) -> String {
    format!("LoopShouldRestart_{l}")
}

pub fn loop_child_excluded(l: RegionId) -> String {
    format!("LoopChildExcluded_{l}")
}

pub const READY_PENDING_CLEARED: &str = "ReadyPendingCleared";
pub const CLOSING_PENDING_CLEARED: &str = "ClosingPendingCleared";
pub const STEP_AVAILABLE: &str = "StepAvailable";
pub const STEP_ACTION: &str = "step";

pub fn open_to_started(id: RegionId) -> String {
    format!("open_to_started_{id}")
}

pub fn open_to_disabled(id: RegionId) -> String {
    format!("open_to_disabled_{id}")
}

pub fn open_to_nature(id: RegionId) -> String {
    format!("open_to_nature_{id}")
}

pub fn running_to_completed(id: RegionId) -> String {
    format!("running_to_completed_{id}")
}

pub fn loop_child_completed_sync(l: RegionId) -> String {
    format!("loop_child_completed_sync_{l}")
}

pub fn loop_decision_sync(l: RegionId) -> String {
    format!("loop_decision_sync_{l}")
}

pub fn loop_final_reset(l: RegionId) -> String {
    format!("loop_final_reset_{l}")
}
