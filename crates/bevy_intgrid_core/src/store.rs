//! The grid store and its drain step
//!
//! The store is the ground truth of what is painted where. It is mutated only
//! by [`GridStore::drain`]; matching passes read from a [`GridSnapshot`].

use crate::{
    CommandBuffer, GridError, GridLayer, GridPos, LayerDescriptor, LayerId, LayerQueue,
    DEFAULT_LAYER_CAPACITY, EMPTY_VALUE,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// How a drained position changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellChange {
    Added { value: i32 },
    Changed { old: i32, new: i32 },
    Removed { old: i32 },
    /// A set wrote the value the cell already held. Still re-evaluated.
    Unchanged { value: i32 },
}

impl CellChange {
    fn between(old: Option<i32>, new: Option<i32>) -> Option<Self> {
        match (old, new) {
            (None, None) => None,
            (None, Some(value)) => Some(Self::Added { value }),
            (Some(old), None) => Some(Self::Removed { old }),
            (Some(old), Some(new)) if old == new => Some(Self::Unchanged { value: new }),
            (Some(old), Some(new)) => Some(Self::Changed { old, new }),
        }
    }

    pub fn is_value_change(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

/// Changes applied to one layer by a drain
#[derive(Debug, Clone)]
pub struct LayerChanges {
    pub descriptor: LayerDescriptor,
    pub cleared: bool,
    /// Net change per touched position, comparing before and after the drain
    pub changes: BTreeMap<GridPos, CellChange>,
}

impl LayerChanges {
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.changes.keys().copied()
    }

    pub fn value_changes(&self) -> usize {
        self.changes.values().filter(|c| c.is_value_change()).count()
    }
}

/// Result of a drain: per-layer changes and the seed in effect
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    pub seed: u32,
    pub layers: BTreeMap<LayerId, LayerChanges>,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.layers.values().all(|l| l.changes.is_empty())
    }

    pub fn touched_positions(&self) -> usize {
        self.layers.values().map(|l| l.changes.len()).sum()
    }
}

/// Immutable view of every layer, taken at drain time.
///
/// Cheap to clone and safe to share across worker threads.
#[derive(Debug, Clone, Default)]
pub struct GridSnapshot {
    layers: HashMap<LayerId, SnapshotLayer>,
}

#[derive(Debug, Clone)]
struct SnapshotLayer {
    descriptor: LayerDescriptor,
    cells: Arc<HashMap<GridPos, i32>>,
}

impl GridSnapshot {
    /// Value at `pos`, or `None` when the cell (or the whole layer) is empty
    pub fn get(&self, layer: LayerId, pos: GridPos) -> Option<i32> {
        self.layers
            .get(&layer)
            .and_then(|l| l.cells.get(&pos).copied())
    }

    /// Value at `pos`, reading empty cells as `empty`
    pub fn value_or(&self, layer: LayerId, pos: GridPos, empty: i32) -> i32 {
        self.get(layer, pos).unwrap_or(empty)
    }

    pub fn descriptor(&self, layer: LayerId) -> Option<&LayerDescriptor> {
        self.layers.get(&layer).map(|l| &l.descriptor)
    }

    pub fn contains_layer(&self, layer: LayerId) -> bool {
        self.layers.contains_key(&layer)
    }
}

/// Sparse per-layer mapping from cell coordinate to value
#[derive(Debug, Clone)]
pub struct GridStore {
    layers: HashMap<LayerId, GridLayer>,
    layer_capacity: usize,
    /// Writing this value erases a cell
    empty_value: i32,
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GridStore {
    pub fn new() -> Self {
        Self::with_layer_capacity(DEFAULT_LAYER_CAPACITY)
    }

    pub fn with_layer_capacity(layer_capacity: usize) -> Self {
        Self {
            layers: HashMap::new(),
            layer_capacity,
            empty_value: EMPTY_VALUE,
        }
    }

    /// Use `empty_value` as the erase sentinel instead of [`EMPTY_VALUE`]
    pub fn with_empty_value(mut self, empty_value: i32) -> Self {
        self.empty_value = empty_value;
        self
    }

    pub fn empty_value(&self) -> i32 {
        self.empty_value
    }

    pub fn layer(&self, id: LayerId) -> Option<&GridLayer> {
        self.layers.get(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = &GridLayer> {
        self.layers.values()
    }

    /// Value at `pos`, or `None` if empty
    pub fn get(&self, layer: LayerId, pos: GridPos) -> Option<i32> {
        self.layers.get(&layer).and_then(|l| l.get(pos))
    }

    /// Create a layer if it does not exist yet.
    pub fn ensure_layer(&mut self, descriptor: LayerDescriptor) -> Result<&GridLayer, GridError> {
        if let Some(existing) = self.layers.get(&descriptor.id) {
            if existing.descriptor != descriptor {
                return Err(GridError::DescriptorMismatch {
                    layer: descriptor.id,
                    existing: existing.descriptor,
                    requested: descriptor,
                });
            }
        }
        let capacity = self.layer_capacity;
        let layer = self
            .layers
            .entry(descriptor.id)
            .or_insert_with(|| GridLayer::new(descriptor, capacity));
        Ok(&*layer)
    }

    /// Tear a layer down, returning it with its cells.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<GridLayer> {
        self.layers.remove(&id)
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            layers: self
                .layers
                .iter()
                .map(|(id, layer)| {
                    (
                        *id,
                        SnapshotLayer {
                            descriptor: layer.descriptor,
                            cells: layer.shared_cells(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Apply every queued command in `buffer`.
    ///
    /// Per layer: if a clear is pending the layer is emptied first, then the
    /// queued sets apply in enqueue order (a later set to the same position
    /// overrides an earlier one). Every queue is validated before anything is
    /// applied, so on error the store and the buffer are left untouched.
    pub fn drain(&mut self, buffer: &mut CommandBuffer) -> Result<DrainReport, GridError> {
        for queue in buffer.queues() {
            if let Some(existing) = self.layers.get(&queue.descriptor.id) {
                if existing.descriptor != queue.descriptor {
                    return Err(GridError::DescriptorMismatch {
                        layer: queue.descriptor.id,
                        existing: existing.descriptor,
                        requested: queue.descriptor,
                    });
                }
            }
        }

        let seed = buffer.global_seed();
        let (clear_all, mut queues) = buffer.take();
        if clear_all {
            for layer in self.layers.values() {
                queues
                    .entry(layer.id())
                    .or_insert_with(|| LayerQueue {
                        descriptor: layer.descriptor,
                        clear: true,
                        sets: Vec::new(),
                    })
                    .clear = true;
            }
        }

        let mut report = DrainReport {
            seed,
            layers: BTreeMap::new(),
        };
        for (id, queue) in queues {
            if queue.is_empty() {
                continue;
            }
            let changes = self.apply_queue(queue);
            debug!(
                layer = %id,
                cleared = changes.cleared,
                touched = changes.changes.len(),
                changed = changes.value_changes(),
                "drained layer"
            );
            report.layers.insert(id, changes);
        }
        Ok(report)
    }

    fn apply_queue(&mut self, queue: LayerQueue) -> LayerChanges {
        let capacity = self.layer_capacity;
        let empty_value = self.empty_value;
        let layer = self
            .layers
            .entry(queue.descriptor.id)
            .or_insert_with(|| GridLayer::new(queue.descriptor, capacity));

        // Original value of every touched position, first touch wins.
        let mut before: BTreeMap<GridPos, Option<i32>> = BTreeMap::new();
        if queue.clear {
            for (pos, value) in layer.clear() {
                before.insert(pos, Some(value));
            }
        }
        for set in &queue.sets {
            let old = layer.set(set.position, set.value, empty_value);
            before.entry(set.position).or_insert(old);
        }

        let changes = before
            .into_iter()
            .filter_map(|(pos, old)| {
                CellChange::between(old, layer.get(pos)).map(|change| (pos, change))
            })
            .collect();

        LayerChanges {
            descriptor: queue.descriptor,
            cleared: queue.clear,
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn layer() -> LayerDescriptor {
        LayerDescriptor::new(Uuid::new_v4())
    }

    #[test]
    fn test_drain_applies_sets_in_order() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(0, 0), 1);
        buffer.set(&l, GridPos::new(0, 0), 2);

        let report = store.drain(&mut buffer).unwrap();
        assert_eq!(store.get(l.id, GridPos::new(0, 0)), Some(2));
        assert_eq!(
            report.layers[&l.id].changes[&GridPos::new(0, 0)],
            CellChange::Added { value: 2 }
        );
        assert!(buffer.is_empty(), "drain consumes the buffer");
    }

    #[test]
    fn test_nothing_applies_before_drain() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(0, 0), 1);
        assert_eq!(store.get(l.id, GridPos::new(0, 0)), None);
        store.drain(&mut buffer).unwrap();
        assert_eq!(store.get(l.id, GridPos::new(0, 0)), Some(1));
    }

    #[test]
    fn test_clear_runs_before_sets_of_same_drain() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(0, 0), 1);
        buffer.set(&l, GridPos::new(1, 0), 1);
        store.drain(&mut buffer).unwrap();

        buffer.set(&l, GridPos::new(1, 0), 1);
        buffer.clear(&l);
        let report = store.drain(&mut buffer).unwrap();

        assert_eq!(store.get(l.id, GridPos::new(0, 0)), None);
        assert_eq!(store.get(l.id, GridPos::new(1, 0)), Some(1));
        let changes = &report.layers[&l.id].changes;
        assert_eq!(changes[&GridPos::new(0, 0)], CellChange::Removed { old: 1 });
        assert_eq!(changes[&GridPos::new(1, 0)], CellChange::Unchanged { value: 1 });
    }

    #[test]
    fn test_clear_all_empties_every_stored_layer() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let (a, b) = (layer(), layer());
        buffer.set(&a, GridPos::new(0, 0), 1);
        buffer.set(&b, GridPos::new(0, 0), 1);
        store.drain(&mut buffer).unwrap();

        buffer.clear_all();
        let report = store.drain(&mut buffer).unwrap();
        assert!(store.layer(a.id).unwrap().is_empty());
        assert!(store.layer(b.id).unwrap().is_empty());
        assert_eq!(report.layers.len(), 2);
    }

    #[test]
    fn test_setting_same_value_is_reported_unchanged() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(5, 5), 3);
        store.drain(&mut buffer).unwrap();
        buffer.set(&l, GridPos::new(5, 5), 3);
        let report = store.drain(&mut buffer).unwrap();

        let changes = &report.layers[&l.id];
        assert_eq!(changes.changes.len(), 1);
        assert_eq!(changes.value_changes(), 0);
    }

    #[test]
    fn test_set_then_erase_in_one_drain_reports_nothing() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(0, 0), 1);
        buffer.set(&l, GridPos::new(0, 0), EMPTY_VALUE);
        let report = store.drain(&mut buffer).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_custom_empty_value_erases_and_zero_is_stored() {
        let mut store = GridStore::new().with_empty_value(-1);
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(0, 0), 1);
        buffer.set(&l, GridPos::new(1, 0), 0);
        store.drain(&mut buffer).unwrap();
        assert_eq!(store.get(l.id, GridPos::new(1, 0)), Some(0));

        buffer.set(&l, GridPos::new(0, 0), -1);
        let report = store.drain(&mut buffer).unwrap();
        assert_eq!(store.get(l.id, GridPos::new(0, 0)), None);
        assert_eq!(
            report.layers[&l.id].changes[&GridPos::new(0, 0)],
            CellChange::Removed { old: 1 }
        );
    }

    #[test]
    fn test_descriptor_mismatch_leaves_store_and_buffer_untouched() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let key = Uuid::new_v4();
        let single = LayerDescriptor::new(key);
        buffer.set(&single, GridPos::new(0, 0), 1);
        store.drain(&mut buffer).unwrap();

        let dual = single.with_dual_grid(true);
        buffer.set(&dual, GridPos::new(1, 0), 1);
        let err = store.drain(&mut buffer).unwrap_err();
        assert!(matches!(err, GridError::DescriptorMismatch { .. }));
        assert_eq!(store.get(single.id, GridPos::new(1, 0)), None);
        assert_eq!(buffer.pending_sets(), 1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_drains() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        let l = layer();
        buffer.set(&l, GridPos::new(0, 0), 1);
        store.drain(&mut buffer).unwrap();
        let snapshot = store.snapshot();

        buffer.set(&l, GridPos::new(0, 0), 9);
        store.drain(&mut buffer).unwrap();

        assert_eq!(snapshot.get(l.id, GridPos::new(0, 0)), Some(1));
        assert_eq!(store.snapshot().get(l.id, GridPos::new(0, 0)), Some(9));
        assert_eq!(snapshot.value_or(l.id, GridPos::new(3, 3), EMPTY_VALUE), EMPTY_VALUE);
    }

    #[test]
    fn test_drain_reports_seed() {
        let mut store = GridStore::new();
        let mut buffer = CommandBuffer::new();
        buffer.set_global_seed(42);
        assert_eq!(store.drain(&mut buffer).unwrap().seed, 42);
    }
}
