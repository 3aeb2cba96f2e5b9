//! Command buffer: queued IntGrid edits awaiting the next drain
//!
//! Producers (gameplay or editor code) push `set`/`clear` requests here.
//! Nothing touches the grid until [`GridStore::drain`](crate::GridStore::drain)
//! consumes the buffer, which decouples producers from the matching pass.

use crate::{GridPos, IntGridDefinition, LayerDescriptor, LayerId, DEFAULT_LAYER_CAPACITY};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A queued cell write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCommand {
    pub position: GridPos,
    pub value: i32,
}

/// Pending operations for one layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerQueue {
    pub descriptor: LayerDescriptor,
    /// Empty the layer before applying `sets`
    pub clear: bool,
    /// Writes in enqueue order
    pub sets: Vec<SetCommand>,
}

impl LayerQueue {
    fn new(descriptor: LayerDescriptor, capacity: usize) -> Self {
        Self {
            descriptor,
            clear: false,
            sets: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.clear && self.sets.is_empty()
    }
}

/// Per-layer ingestion queues plus the global random seed.
///
/// No operation blocks or fails; queues are created lazily the first time a
/// layer is referenced and grow by doubling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandBuffer {
    queues: BTreeMap<LayerId, LayerQueue>,
    clear_all: bool,
    seed: u32,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_LAYER_CAPACITY
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::with_layer_capacity(DEFAULT_LAYER_CAPACITY)
    }

    /// Create a buffer whose lazily created queues start at `capacity`
    pub fn with_layer_capacity(capacity: usize) -> Self {
        Self {
            queues: BTreeMap::new(),
            clear_all: false,
            seed: 0,
            capacity: capacity.max(1),
        }
    }

    fn queue_mut(&mut self, layer: &LayerDescriptor) -> &mut LayerQueue {
        let capacity = self.capacity;
        let queue = self
            .queues
            .entry(layer.id)
            .or_insert_with(|| LayerQueue::new(*layer, capacity));
        // Latest descriptor wins; the drain rejects it if the layer already exists differently.
        queue.descriptor = *layer;
        queue
    }

    /// Queue a write of `value` at `position`. Writing the empty value erases the cell.
    pub fn set(&mut self, layer: &LayerDescriptor, position: GridPos, value: i32) {
        self.queue_mut(layer).sets.push(SetCommand { position, value });
    }

    /// Queue a write addressed by IntGrid definition
    pub fn set_int_grid_value(&mut self, grid: &IntGridDefinition, position: GridPos, value: i32) {
        self.set(&grid.descriptor(), position, value);
    }

    /// Empty the layer at the next drain, before that drain's queued sets apply
    pub fn clear(&mut self, layer: &LayerDescriptor) {
        self.queue_mut(layer).clear = true;
    }

    /// Clear every layer in the store at the next drain
    pub fn clear_all(&mut self) {
        self.clear_all = true;
        for queue in self.queues.values_mut() {
            queue.clear = true;
        }
    }

    pub fn set_global_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    pub fn randomize_global_seed(&mut self, rng: &mut impl Rng) {
        self.seed = rng.gen();
    }

    pub fn global_seed(&self) -> u32 {
        self.seed
    }

    pub fn is_clear_all(&self) -> bool {
        self.clear_all
    }

    pub fn queue(&self, layer: LayerId) -> Option<&LayerQueue> {
        self.queues.get(&layer)
    }

    pub fn queues(&self) -> impl Iterator<Item = &LayerQueue> {
        self.queues.values()
    }

    pub fn is_empty(&self) -> bool {
        !self.clear_all && self.queues.values().all(LayerQueue::is_empty)
    }

    /// Total queued set operations across layers
    pub fn pending_sets(&self) -> usize {
        self.queues.values().map(|q| q.sets.len()).sum()
    }

    /// Drop queued work for one layer (explicit layer teardown)
    pub fn discard_layer(&mut self, layer: LayerId) -> bool {
        self.queues.remove(&layer).is_some()
    }

    /// Take every queue, leaving the buffer empty. The seed is kept.
    pub(crate) fn take(&mut self) -> (bool, BTreeMap<LayerId, LayerQueue>) {
        let clear_all = std::mem::take(&mut self.clear_all);
        (clear_all, std::mem::take(&mut self.queues))
    }
}
