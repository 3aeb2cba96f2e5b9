//! Dirty tracking: which cells need re-evaluation after a drain

use crate::{DrainReport, GridPos, LayerChanges, LayerId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::trace;

/// Positions to re-evaluate, per layer, in row-major order
pub type DirtySet = BTreeMap<LayerId, BTreeSet<GridPos>>;

/// Expands directly changed cells into the full set of cells whose rule
/// outcome may differ.
///
/// A rule anchored at `p` reads `p + o` for each offset `o` in its pattern
/// (under every symmetry variant), so a change at `c` can alter the outcome
/// at every `c - o`. Layers register the union of those offsets; an
/// unregistered layer only dirties the changed cell itself.
#[derive(Debug, Clone, Default)]
pub struct RefreshTracker {
    influence: HashMap<LayerId, Vec<GridPos>>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or extend) the pattern offsets read by rules on `layer`
    pub fn register_offsets(&mut self, layer: LayerId, offsets: impl IntoIterator<Item = GridPos>) {
        let entry = self.influence.entry(layer).or_default();
        entry.extend(offsets);
        entry.sort();
        entry.dedup();
    }

    pub fn unregister(&mut self, layer: LayerId) {
        self.influence.remove(&layer);
    }

    pub fn offsets(&self, layer: LayerId) -> &[GridPos] {
        self.influence.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dirty positions for one layer's changes.
    ///
    /// On a dual-grid layer the changed source cell maps to the four dual
    /// cells around it instead of to itself.
    pub fn expand_layer(&self, layer: LayerId, changes: &LayerChanges) -> BTreeSet<GridPos> {
        let offsets = self.offsets(layer);
        let dual = changes.descriptor.dual_grid;
        let mut dirty = BTreeSet::new();
        for changed in changes.positions() {
            if dual {
                dirty.extend(changed.dual_cells());
            } else {
                dirty.insert(changed);
            }
            dirty.extend(offsets.iter().map(|&offset| changed - offset));
        }
        trace!(layer = %layer, changed = changes.changes.len(), dirty = dirty.len(), "expanded dirty set");
        dirty
    }

    /// Dirty positions for every layer touched by a drain
    pub fn expand(&self, report: &DrainReport) -> DirtySet {
        report
            .layers
            .iter()
            .filter(|(_, changes)| !changes.changes.is_empty())
            .map(|(&layer, changes)| (layer, self.expand_layer(layer, changes)))
            .collect()
    }
}
