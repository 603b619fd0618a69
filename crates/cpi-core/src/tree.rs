//! The CPI tree's tagged sum type and the positions children occupy.

use std::collections::BTreeMap;

/// Unique, pre-order-increasing region identifier (§3.1).
pub type RegionId = u32;

/// Where a region sits relative to its parent. Mirrors the `position`
/// vocabulary of §3.3 exactly (`head`, `tail`, `first`, `second`,
/// `true_`, `false_`, `loop_child`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Head,
    Tail,
    First,
    Second,
    True_,
    False_,
    LoopChild,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Head => "head",
            Position::Tail => "tail",
            Position::First => "first",
            Position::Second => "second",
            Position::True_ => "true_",
            Position::False_ => "false_",
            Position::LoopChild => "loop_child",
        }
    }
}

/// One CPI constructor, carrying only the ids of its children (the tree
/// itself lives flattened in `Cpi::regions`; see `model.rs`). This is the
/// tagged-sum-type rewrite of the source's dynamic dict-of-variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionKind {
    Task {
        duration: u32,
        impacts: BTreeMap<String, f64>,
    },
    Sequence {
        head: RegionId,
        tail: RegionId,
    },
    Parallel {
        first_split: RegionId,
        second_split: RegionId,
    },
    Choice {
        r#true: RegionId,
        r#false: RegionId,
    },
    Nature {
        probability: f64,
        r#true: RegionId,
        r#false: RegionId,
    },
    Loop {
        probability: f64,
        child: RegionId,
    },
}

impl RegionKind {
    /// A short, stable name used as the PRISM module-name prefix (§6.2).
    pub fn kind_name(&self) -> &'static str {
        match self {
            RegionKind::Task { .. } => "task",
            RegionKind::Sequence { .. } => "sequence",
            RegionKind::Parallel { .. } => "parallel",
            RegionKind::Choice { .. } => "choice",
            RegionKind::Nature { .. } => "nature",
            RegionKind::Loop { .. } => "loop",
        }
    }

    /// Ordered list of this region's direct children.
    pub fn children(&self) -> Vec<RegionId> {
        match self {
            RegionKind::Task { .. } => vec![],
            RegionKind::Sequence { head, tail } => vec![*head, *tail],
            RegionKind::Parallel {
                first_split,
                second_split,
            } => vec![*first_split, *second_split],
            RegionKind::Choice { r#true, r#false } => vec![*r#true, *r#false],
            RegionKind::Nature { r#true, r#false, .. } => vec![*r#true, *r#false],
            RegionKind::Loop { child, .. } => vec![*child],
        }
    }

    pub fn is_task(&self) -> bool {
        matches!(self, RegionKind::Task { .. })
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, RegionKind::Loop { .. })
    }
}
