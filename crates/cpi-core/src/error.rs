//! Error taxonomy for CPI loading and validation.

use crate::tree::RegionId;
use thiserror::Error;

/// All the ways a CPI tree can fail to load or validate.
///
/// `DuplicateId`, `UnknownRegionType`, and `MissingChild` are the named
/// subcategories of `InvalidCpi`; the remaining variants cover the
/// numeric invariants (duration, probability, id ordering) that the
/// distilled spec groups under the same `InvalidCPI(reason)` umbrella.
#[derive(Debug, Error)]
pub enum CpiError {
    #[error("invalid CPI: {0}")]
    InvalidCpi(String),

    #[error("duplicate region id {0}")]
    DuplicateId(RegionId),

    #[error("unknown region type '{0}'")]
    UnknownRegionType(String),

    #[error("region {parent_id} is missing its '{position}' child")]
    MissingChild {
        parent_id: RegionId,
        position: &'static str,
    },

    #[error("task {id}: duration must be >= 1, got {duration}")]
    NonPositiveDuration { id: RegionId, duration: i64 },

    #[error("region {id}: probability must lie strictly in (0,1), got {probability}")]
    ProbabilityOutOfRange { id: RegionId, probability: f64 },

    #[error("region {child} has id <= its parent {parent}'s id (pre-order ids must strictly increase)")]
    IdOrderingViolation { parent: RegionId, child: RegionId },

    #[error("failed to parse CPI JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
