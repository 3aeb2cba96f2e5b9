//! Error types shared across the bevy_intgrid crates

use crate::{GridPos, LayerDescriptor, LayerId};
use thiserror::Error;
use uuid::Uuid;

/// Authoring data that cannot be used.
///
/// Raised while loading or compiling definitions, never during a matching
/// pass. Rule-scoped variants carry the rule name so the offending asset can
/// be found.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("IntGrid '{grid}' defines value {value} more than once")]
    DuplicateIntGridValue { grid: String, value: i32 },
    #[error("IntGrid '{grid}' entry '{name}' uses the reserved empty value {value}")]
    ReservedIntGridValue {
        grid: String,
        name: String,
        value: i32,
    },
    #[error("Rule '{rule}' has an empty result pool")]
    EmptyResultPool { rule: String },
    #[error("Rule '{rule}' result {index} has weight 0 (weights must be >= 1)")]
    ZeroWeight { rule: String, index: usize },
    #[error("Rule '{rule}' constrains offset {offset} more than once")]
    DuplicateOffset { rule: String, offset: GridPos },
    #[error("'{owner}' references unknown IntGrid {grid}")]
    UnknownIntGrid { owner: String, grid: Uuid },
    #[error("Terrain '{terrain}' has {count} member layers (maximum {max})")]
    TooManyTerrainLayers {
        terrain: String,
        count: usize,
        max: usize,
    },
    #[error("Terrain '{terrain}' lists IntGrid {grid} more than once")]
    DuplicateTerrainLayer { terrain: String, grid: Uuid },
    #[error("Terrain '{terrain}' has no member layers")]
    EmptyTerrain { terrain: String },
    #[error("Duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: Uuid },
}

/// Errors raised while draining commands into the grid store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Layer {layer} already exists as {existing:?}, command requested {requested:?}")]
    DescriptorMismatch {
        layer: LayerId,
        existing: LayerDescriptor,
        requested: LayerDescriptor,
    },
}
