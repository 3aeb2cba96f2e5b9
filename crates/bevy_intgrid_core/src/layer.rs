//! Layer identity and per-layer cell storage

use crate::GridPos;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Value a missing cell reads as.
pub const EMPTY_VALUE: i32 = 0;

/// Initial cell capacity of a lazily created layer.
pub const DEFAULT_LAYER_CAPACITY: usize = 64;

/// Stable identity of a grid layer.
///
/// Derived by hashing the IntGrid definition's key, never its display name,
/// so renaming a grid keeps its layer and two references to the same grid
/// always resolve to one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl LayerId {
    pub fn from_key(key: Uuid) -> Self {
        Self(seahash::hash(key.as_bytes()))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Attributes a layer is created with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub dual_grid: bool,
    /// World size of one cell on each axis
    pub cell_size: [f32; 2],
}

impl LayerDescriptor {
    pub fn new(key: Uuid) -> Self {
        Self {
            id: LayerId::from_key(key),
            dual_grid: false,
            cell_size: [1.0, 1.0],
        }
    }

    pub fn with_dual_grid(mut self, dual_grid: bool) -> Self {
        self.dual_grid = dual_grid;
        self
    }

    pub fn with_cell_size(mut self, cell_size: [f32; 2]) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// World-space centre of the rendered cell at `pos`.
    ///
    /// Dual-grid cells sit on the corners of the source grid, so their centre
    /// is the corner shared by the four source cells they blend.
    pub fn cell_center(&self, pos: GridPos) -> [f32; 2] {
        let (ox, oy) = if self.dual_grid { (0.0, 0.0) } else { (0.5, 0.5) };
        [
            (pos.x as f32 + ox) * self.cell_size[0],
            (pos.y as f32 + oy) * self.cell_size[1],
        ]
    }
}

/// A sparse layer of painted cells
///
/// Cells live behind an [`Arc`] so snapshots are cheap; the store mutates
/// through [`Arc::make_mut`], which copies only when a snapshot is still
/// alive.
#[derive(Debug, Clone)]
pub struct GridLayer {
    pub descriptor: LayerDescriptor,
    cells: Arc<HashMap<GridPos, i32>>,
}

impl GridLayer {
    pub fn new(descriptor: LayerDescriptor, capacity: usize) -> Self {
        Self {
            descriptor,
            cells: Arc::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn id(&self) -> LayerId {
        self.descriptor.id
    }

    /// Get the value at `pos`, or `None` if the cell is empty
    pub fn get(&self, pos: GridPos) -> Option<i32> {
        self.cells.get(&pos).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPos, i32)> + '_ {
        self.cells.iter().map(|(p, v)| (*p, *v))
    }

    /// Set a cell. Writing `empty` erases it. Returns the previous value.
    pub(crate) fn set(&mut self, pos: GridPos, value: i32, empty: i32) -> Option<i32> {
        let cells = Arc::make_mut(&mut self.cells);
        if value == empty {
            cells.remove(&pos)
        } else {
            cells.insert(pos, value)
        }
    }

    /// Remove every cell, returning the positions that were painted
    pub(crate) fn clear(&mut self) -> Vec<(GridPos, i32)> {
        let old = std::mem::replace(&mut self.cells, Arc::new(HashMap::new()));
        old.iter().map(|(p, v)| (*p, *v)).collect()
    }

    pub(crate) fn shared_cells(&self) -> Arc<HashMap<GridPos, i32>> {
        Arc::clone(&self.cells)
    }
}
