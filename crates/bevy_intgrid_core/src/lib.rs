//! Core data structures for bevy_intgrid
//!
//! This crate provides the ground-truth side of the auto-tiling engine:
//! - `IntGridDefinition` - A named palette of semantic cell values
//! - `LayerId` / `LayerDescriptor` - Stable layer identity hashed from the grid key
//! - `CommandBuffer` - Queued `set`/`clear` edits and the global random seed
//! - `GridStore` - Sparse per-layer cell storage, mutated only by draining a buffer
//! - `GridSnapshot` - Immutable view handed to matching passes
//! - `RefreshTracker` - Expands drained changes into the cells to re-evaluate
//!
//! This crate has no Bevy dependency.

mod command;
mod error;
mod intgrid;
mod layer;
mod pos;
mod refresh;
mod store;

pub use command::{CommandBuffer, LayerQueue, SetCommand};
pub use error::{ConfigurationError, GridError};
pub use intgrid::{Color, IntGridDefinition, IntGridValue};
pub use layer::{GridLayer, LayerDescriptor, LayerId, DEFAULT_LAYER_CAPACITY, EMPTY_VALUE};
pub use pos::GridPos;
pub use refresh::{DirtySet, RefreshTracker};
pub use store::{CellChange, DrainReport, GridSnapshot, GridStore, LayerChanges};
