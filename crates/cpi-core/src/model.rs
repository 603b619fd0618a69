//! Flattened CPI model: parsing, derived structures, and traversal (C1).

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::error::CpiError;
use crate::tree::{Position, RegionId, RegionKind};

/// The flattened, validated CPI tree plus its derived structures (§3.3).
///
/// Built once via [`Cpi::load`] or [`Cpi::from_value`]; no mutation after
/// construction. Region lookups are O(log n) (or O(1) for `parent`/
/// `loop_ancestor`), and the pre-order id invariant means iterating
/// `regions`/`tasks`/`loops` yields ascending id order for free, since
/// they're backed by a `BTreeMap`.
#[derive(Debug, Clone)]
pub struct Cpi {
    root: RegionId,
    regions: BTreeMap<RegionId, RegionKind>,
    parent_of: HashMap<RegionId, (RegionId, Position)>,
    loop_ancestor_of: HashMap<RegionId, Option<RegionId>>,
    tasks: Vec<RegionId>,
    loops: Vec<RegionId>,
}

impl Cpi {
    /// Parse and validate a CPI from its JSON representation (§6.1).
    pub fn load(json: &str) -> Result<Self, CpiError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse and validate a CPI from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, CpiError> {
        let mut builder = Builder::default();
        let root = builder.parse_region(value, None, None)?;
        let regions = builder.regions;
        let parent_of = builder.parent_of;
        let loop_ancestor_of = builder.loop_ancestor_of;
        let tasks = regions
            .iter()
            .filter(|(_, k)| k.is_task())
            .map(|(id, _)| *id)
            .collect();
        let loops = regions
            .iter()
            .filter(|(_, k)| k.is_loop())
            .map(|(id, _)| *id)
            .collect();
        let cpi = Cpi {
            root,
            regions,
            parent_of,
            loop_ancestor_of,
            tasks,
            loops,
        };
        cpi.validate()?;
        Ok(cpi)
    }

    /// Re-check §3.1's structural invariants against the built tree.
    /// Always succeeds for a `Cpi` obtained through `load`/`from_value`
    /// (those already enforce every check inline, failing fast); exposed
    /// separately so callers that assemble a `Cpi` some other way still
    /// have a validation entry point, per C1's contract.
    pub fn validate(&self) -> Result<(), CpiError> {
        for (&id, kind) in &self.regions {
            match kind {
                RegionKind::Task { duration, .. } => {
                    if *duration < 1 {
                        return Err(CpiError::NonPositiveDuration {
                            id,
                            duration: *duration as i64,
                        });
                    }
                }
                RegionKind::Nature { probability, .. } | RegionKind::Loop { probability, .. } => {
                    if !(*probability > 0.0 && *probability < 1.0) {
                        return Err(CpiError::ProbabilityOutOfRange {
                            id,
                            probability: *probability,
                        });
                    }
                }
                _ => {}
            }
            for child in kind.children() {
                if child <= id {
                    return Err(CpiError::IdOrderingViolation { parent: id, child });
                }
                if !self.regions.contains_key(&child) {
                    return Err(CpiError::InvalidCpi(format!(
                        "region {id} references unknown child {child}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn root(&self) -> RegionId {
        self.root
    }

    pub fn kind(&self, id: RegionId) -> Option<&RegionKind> {
        self.regions.get(&id)
    }

    /// All regions, ascending by id.
    pub fn regions(&self) -> impl Iterator<Item = (RegionId, &RegionKind)> {
        self.regions.iter().map(|(id, k)| (*id, k))
    }

    /// Task ids, ascending.
    pub fn tasks(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.tasks.iter().copied()
    }

    /// Loop ids, ascending.
    pub fn loops(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.loops.iter().copied()
    }

    pub fn children(&self, id: RegionId) -> Vec<RegionId> {
        self.kind(id).map(RegionKind::children).unwrap_or_default()
    }

    /// `(parent_id, position)` of `id`, or `None` for the root.
    pub fn parent(&self, id: RegionId) -> Option<(RegionId, Position)> {
        self.parent_of.get(&id).copied()
    }

    /// Nearest enclosing loop id, or `None` if `id` is not under any loop.
    pub fn loop_ancestor(&self, id: RegionId) -> Option<RegionId> {
        self.loop_ancestor_of.get(&id).copied().flatten()
    }

    pub fn duration(&self, id: RegionId) -> Option<u32> {
        match self.kind(id) {
            Some(RegionKind::Task { duration, .. }) => Some(*duration),
            _ => None,
        }
    }

    /// Every distinct impact name used by any task, sorted lexicographically
    /// (§4.4's determinism requirement).
    pub fn impact_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .regions
            .values()
            .filter_map(|k| match k {
                RegionKind::Task { impacts, .. } => Some(impacts.keys().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Full impact map per task, for provenance/debugging (mirrors the
    /// original `get_task_impacts` helper; see SPEC_FULL.md §4).
    pub fn task_impacts(&self) -> BTreeMap<RegionId, BTreeMap<String, f64>> {
        self.tasks
            .iter()
            .filter_map(|&id| match self.kind(id) {
                Some(RegionKind::Task { impacts, .. }) => Some((id, impacts.clone())),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
struct Builder {
    regions: BTreeMap<RegionId, RegionKind>,
    parent_of: HashMap<RegionId, (RegionId, Position)>,
    loop_ancestor_of: HashMap<RegionId, Option<RegionId>>,
}

impl Builder {
    fn parse_region(
        &mut self,
        value: &Value,
        parent: Option<(RegionId, Position)>,
        loop_ctx: Option<RegionId>,
    ) -> Result<RegionId, CpiError> {
        let id = read_id(value)?;

        if self.regions.contains_key(&id) {
            return Err(CpiError::DuplicateId(id));
        }
        if let Some((parent_id, _)) = parent {
            if id <= parent_id {
                return Err(CpiError::IdOrderingViolation {
                    parent: parent_id,
                    child: id,
                });
            }
        }

        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CpiError::InvalidCpi(format!("region {id} missing 'type' field")))?;

        self.loop_ancestor_of.insert(id, loop_ctx);
        if let Some(p) = parent {
            self.parent_of.insert(id, p);
        }

        let kind = match type_name {
            "task" => {
                let duration = read_u64(value, "duration", id)? as i64;
                if duration < 1 {
                    return Err(CpiError::NonPositiveDuration { id, duration });
                }
                let impacts = match value.get("impacts") {
                    Some(Value::Object(map)) => map
                        .iter()
                        .map(|(k, v)| {
                            let f = v.as_f64().ok_or_else(|| {
                                CpiError::InvalidCpi(format!(
                                    "task {id}: impact '{k}' is not numeric"
                                ))
                            })?;
                            Ok((k.clone(), f))
                        })
                        .collect::<Result<BTreeMap<_, _>, CpiError>>()?,
                    Some(_) => {
                        return Err(CpiError::InvalidCpi(format!(
                            "task {id}: 'impacts' must be an object"
                        )))
                    }
                    None => BTreeMap::new(),
                };
                RegionKind::Task {
                    duration: duration as u32,
                    impacts,
                }
            }
            "sequence" => {
                let head = self.parse_child(value, "head", id, Position::Head, loop_ctx)?;
                let tail = self.parse_child(value, "tail", id, Position::Tail, loop_ctx)?;
                RegionKind::Sequence { head, tail }
            }
            "parallel" => {
                let first_split =
                    self.parse_child(value, "first_split", id, Position::First, loop_ctx)?;
                let second_split =
                    self.parse_child(value, "second_split", id, Position::Second, loop_ctx)?;
                RegionKind::Parallel {
                    first_split,
                    second_split,
                }
            }
            "choice" => {
                let t = self.parse_child(value, "true", id, Position::True_, loop_ctx)?;
                let f = self.parse_child(value, "false", id, Position::False_, loop_ctx)?;
                RegionKind::Choice {
                    r#true: t,
                    r#false: f,
                }
            }
            "nature" => {
                let probability = read_f64(value, "probability", id)?;
                if !(probability > 0.0 && probability < 1.0) {
                    return Err(CpiError::ProbabilityOutOfRange { id, probability });
                }
                let t = self.parse_child(value, "true", id, Position::True_, loop_ctx)?;
                let f = self.parse_child(value, "false", id, Position::False_, loop_ctx)?;
                RegionKind::Nature {
                    probability,
                    r#true: t,
                    r#false: f,
                }
            }
            "loop" => {
                let probability = read_f64(value, "probability", id)?;
                if !(probability > 0.0 && probability < 1.0) {
                    return Err(CpiError::ProbabilityOutOfRange { id, probability });
                }
                // The loop's direct child (and everything under it) now has
                // `id` as its nearest enclosing loop.
                let child = self.parse_child(value, "child", id, Position::LoopChild, Some(id))?;
                RegionKind::Loop { probability, child }
            }
            other => return Err(CpiError::UnknownRegionType(other.to_string())),
        };

        self.regions.insert(id, kind);
        Ok(id)
    }

    fn parse_child(
        &mut self,
        value: &Value,
        key: &str,
        parent_id: RegionId,
        position: Position,
        loop_ctx: Option<RegionId>,
    ) -> Result<RegionId, CpiError> {
        let child_value = value
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or(CpiError::MissingChild {
                parent_id,
                position: position.as_str(),
            })?;
        self.parse_region(child_value, Some((parent_id, position)), loop_ctx)
    }
}

fn read_id(value: &Value) -> Result<RegionId, CpiError> {
    value
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|v| RegionId::try_from(v).ok())
        .ok_or_else(|| CpiError::InvalidCpi("missing or out-of-range 'id' field".to_string()))
}

fn read_u64(value: &Value, key: &str, id: RegionId) -> Result<u64, CpiError> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| CpiError::InvalidCpi(format!("region {id}: missing or invalid '{key}'")))
}

fn read_f64(value: &Value, key: &str, id: RegionId) -> Result<f64, CpiError> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| CpiError::InvalidCpi(format!("region {id}: missing or invalid '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_task() {
        let cpi = Cpi::load(r#"{"type":"task","id":0,"duration":1,"impacts":{"cost":5}}"#).unwrap();
        assert_eq!(cpi.root(), 0);
        assert_eq!(cpi.tasks().collect::<Vec<_>>(), vec![0]);
        assert_eq!(cpi.parent(0), None);
        assert_eq!(cpi.duration(0), Some(1));
        assert_eq!(cpi.impact_names(), vec!["cost".to_string()]);
    }

    #[test]
    fn sequence_of_two_tasks() {
        let json = r#"{
            "type":"sequence","id":0,
            "head":{"type":"task","id":1,"duration":1,"impacts":{"c":3}},
            "tail":{"type":"task","id":2,"duration":2,"impacts":{"c":4}}
        }"#;
        let cpi = Cpi::load(json).unwrap();
        assert_eq!(cpi.tasks().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(cpi.parent(1), Some((0, Position::Head)));
        assert_eq!(cpi.parent(2), Some((0, Position::Tail)));
    }

    #[test]
    fn duplicate_id_rejected() {
        let json = r#"{
            "type":"parallel","id":0,
            "first_split":{"type":"task","id":1,"duration":1,"impacts":{}},
            "second_split":{"type":"task","id":1,"duration":1,"impacts":{}}
        }"#;
        assert!(matches!(Cpi::load(json), Err(CpiError::DuplicateId(1))));
    }

    #[test]
    fn id_ordering_violation_rejected() {
        let json = r#"{
            "type":"sequence","id":5,
            "head":{"type":"task","id":1,"duration":1,"impacts":{}},
            "tail":{"type":"task","id":2,"duration":1,"impacts":{}}
        }"#;
        assert!(matches!(
            Cpi::load(json),
            Err(CpiError::IdOrderingViolation { parent: 5, child: 1 })
        ));
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let json = r#"{
            "type":"loop","id":0,"probability":1.0,
            "child":{"type":"task","id":1,"duration":1,"impacts":{}}
        }"#;
        assert!(matches!(
            Cpi::load(json),
            Err(CpiError::ProbabilityOutOfRange { .. })
        ));
    }

    #[test]
    fn missing_child_rejected() {
        let json = r#"{"type":"sequence","id":0,"head":{"type":"task","id":1,"duration":1,"impacts":{}}}"#;
        assert!(matches!(
            Cpi::load(json),
            Err(CpiError::MissingChild { parent_id: 0, position: "tail" })
        ));
    }

    #[test]
    fn loop_ancestor_tracks_nearest_enclosing_loop() {
        let json = r#"{
            "type":"loop","id":0,"probability":0.5,
            "child":{"type":"task","id":1,"duration":1,"impacts":{"c":2}}
        }"#;
        let cpi = Cpi::load(json).unwrap();
        assert_eq!(cpi.loop_ancestor(0), None);
        assert_eq!(cpi.loop_ancestor(1), Some(0));
    }

    #[test]
    fn unknown_region_type_rejected() {
        let json = r#"{"type":"bogus","id":0}"#;
        assert!(matches!(
            Cpi::load(json),
            Err(CpiError::UnknownRegionType(ref s)) if s == "bogus"
        ));
    }
}
