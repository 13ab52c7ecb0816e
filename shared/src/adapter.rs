use thiserror::Error;

use crate::{
    commands::{
        feature::{FeatureKind, FeatureTarget, FeatureValue},
        feature_commands::BatchEntry,
    },
    EntityRef, Handle, StableId,
};

/// Errors a traffic-control adapter reports back from `apply`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The simulation has not finished loading
    #[error("Traffic-control adapter is not ready")]
    NotReady,

    /// The adapter cannot handle this feature at all
    #[error("Feature {feature} is not supported by the adapter")]
    Unsupported { feature: FeatureKind },

    /// The entity vanished between validation and apply
    #[error("Entity {entity} disappeared before the value could be applied")]
    EntityGone { entity: EntityRef },

    /// The simulation refused the value
    #[error("Simulation rejected the value: {reason}")]
    Rejected { reason: String },
}

/// Read-only view of the simulation's entity storage.
pub trait EntityCatalog {
    fn entity_exists(&self, entity: &EntityRef) -> bool;

    /// Parent entities (segments) whose sub-entities are tracked by the mapping store.
    fn parents(&self) -> Vec<Handle>;

    /// Sub-entities currently observable under `parent` as `(sub_index, local identity)`.
    fn children(&self, parent: Handle) -> Vec<(u16, StableId)>;
}

/// Narrow capability interface onto the simulation's traffic-control state.
///
/// Targets handed to `apply` and `read` are always expressed in local handles.
pub trait TrafficControlAdapter: EntityCatalog + Send {
    /// Whether the simulation is loaded far enough to be read and written.
    fn is_ready(&self) -> bool;

    fn supports(&self, _feature: FeatureKind) -> bool {
        true
    }

    fn apply(&mut self, target: &FeatureTarget, value: &FeatureValue) -> Result<(), AdapterError>;

    /// The value actually in effect, which may differ from what was last applied.
    fn read(&self, feature: FeatureKind, target: &FeatureTarget) -> Option<FeatureValue>;

    /// Every target with non-default state for `feature`.
    fn export(&self, feature: FeatureKind) -> Vec<BatchEntry>;
}
