//! Merging member layers' sprite selections into one terrain tile buffer

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bevy_intgrid_core::{GridPos, LayerId};
use bevy_intgrid_rules::OutputCommand;
use tracing::{debug, warn};

use crate::gpu::{TerrainIndex, TerrainTile};
use crate::terrain::{CompiledTerrain, TerrainHash, MAX_TERRAIN_LAYERS};

/// Maximum tiles drawn for one composited cell
pub const MAX_TILES_PER_CELL: usize = MAX_TERRAIN_LAYERS;

/// Contribution key: member draw order first, then rule group slot
type ContributionKey = (usize, u32);

/// GPU-ready output of one terrain.
///
/// `positions[i]` is drawn with `tiles[indices[i].range()]`. Ranges are
/// contiguous and laid out in row-major position order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainBuffers {
    pub hash: TerrainHash,
    pub positions: Vec<GridPos>,
    pub indices: Vec<TerrainIndex>,
    pub tiles: Vec<TerrainTile>,
}

impl TerrainBuffers {
    pub fn tile_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tiles)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Tiles drawn at `position`
    pub fn tiles_at(&self, position: GridPos) -> Option<&[TerrainTile]> {
        let i = self.positions.binary_search(&position).ok()?;
        self.tiles.get(self.indices[i].range())
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// How a call to [`TerrainCompositor::apply`] changed the buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainUpdate {
    /// No member contribution changed
    Unchanged,
    /// Tile records rewritten in place; indices untouched
    Patched { cells: usize },
    /// Buffers rebuilt and ranges compacted
    Relayout { cells: usize, tiles: usize },
}

impl TerrainUpdate {
    pub fn is_changed(&self) -> bool {
        !matches!(self, TerrainUpdate::Unchanged)
    }
}

/// Keeps one terrain's per-cell contributions and its laid-out buffers.
#[derive(Debug, Clone)]
pub struct TerrainCompositor {
    terrain: CompiledTerrain,
    contributions: BTreeMap<GridPos, BTreeMap<ContributionKey, TerrainTile>>,
    buffers: TerrainBuffers,
    slot_of: HashMap<GridPos, usize>,
}

impl TerrainCompositor {
    pub fn new(terrain: CompiledTerrain) -> Self {
        let buffers = TerrainBuffers {
            hash: terrain.hash,
            ..Default::default()
        };
        Self {
            terrain,
            contributions: BTreeMap::new(),
            buffers,
            slot_of: HashMap::new(),
        }
    }

    pub fn terrain(&self) -> &CompiledTerrain {
        &self.terrain
    }

    pub fn hash(&self) -> TerrainHash {
        self.terrain.hash
    }

    pub fn buffers(&self) -> &TerrainBuffers {
        &self.buffers
    }

    pub fn is_member(&self, layer: LayerId) -> bool {
        self.terrain.member_index(layer).is_some()
    }

    /// Fold an ordered command batch into the buffers.
    ///
    /// Commands for non-member layers are ignored. Later commands for the same
    /// (layer, slot, position) override earlier ones.
    pub fn apply(&mut self, commands: &[OutputCommand]) -> TerrainUpdate {
        let mut dirty = BTreeSet::new();

        for command in commands {
            let Some(member) = self.terrain.member_index(command.layer()) else {
                continue;
            };
            let key = (member, command.slot());
            let position = command.position();
            let changed = match command {
                OutputCommand::Sprite(sprite) => {
                    let tile = TerrainTile::from_sprite(sprite);
                    let cell = self.contributions.entry(position).or_default();
                    cell.insert(key, tile) != Some(tile)
                }
                OutputCommand::Remove(_) => match self.contributions.get_mut(&position) {
                    Some(cell) => {
                        let removed = cell.remove(&key).is_some();
                        if cell.is_empty() {
                            self.contributions.remove(&position);
                        }
                        removed
                    }
                    None => false,
                },
            };
            if changed {
                dirty.insert(position);
            }
        }

        self.refresh(&dirty)
    }

    /// Drop every contribution from `layer`.
    pub fn remove_layer(&mut self, layer: LayerId) -> TerrainUpdate {
        let Some(member) = self.terrain.member_index(layer) else {
            return TerrainUpdate::Unchanged;
        };

        let mut dirty = BTreeSet::new();
        self.contributions.retain(|pos, cell| {
            let before = cell.len();
            cell.retain(|(m, _), _| *m != member);
            if cell.len() != before {
                dirty.insert(*pos);
            }
            !cell.is_empty()
        });

        self.refresh(&dirty)
    }

    fn refresh(&mut self, dirty: &BTreeSet<GridPos>) -> TerrainUpdate {
        if dirty.is_empty() {
            return TerrainUpdate::Unchanged;
        }

        let mut patches = Vec::with_capacity(dirty.len());
        for pos in dirty {
            let tiles = self.cell_tiles(*pos);
            match self.slot_of.get(pos) {
                Some(&slot) if !tiles.is_empty() && self.buffers.indices[slot].count as usize == tiles.len() => {
                    patches.push((slot, tiles));
                }
                None if tiles.is_empty() => {}
                _ => return self.relayout(),
            }
        }

        let cells = patches.len();
        for (slot, tiles) in patches {
            let range = self.buffers.indices[slot].range();
            self.buffers.tiles[range].copy_from_slice(&tiles);
        }
        debug!(terrain = %self.terrain.name, cells, "patched terrain tiles in place");
        TerrainUpdate::Patched { cells }
    }

    fn relayout(&mut self) -> TerrainUpdate {
        let buffers = &mut self.buffers;
        buffers.positions.clear();
        buffers.indices.clear();
        buffers.tiles.clear();
        self.slot_of.clear();

        let positions: Vec<GridPos> = self.contributions.keys().copied().collect();
        for pos in positions {
            let tiles = self.cell_tiles(pos);
            let buffers = &mut self.buffers;
            self.slot_of.insert(pos, buffers.positions.len());
            buffers.positions.push(pos);
            buffers.indices.push(TerrainIndex {
                start_index: buffers.tiles.len() as u32,
                count: tiles.len() as u32,
            });
            buffers.tiles.extend_from_slice(&tiles);
        }

        let cells = self.buffers.positions.len();
        let tiles = self.buffers.tiles.len();
        debug!(terrain = %self.terrain.name, cells, tiles, "terrain buffers re-laid out");
        TerrainUpdate::Relayout { cells, tiles }
    }

    /// Tiles for a cell in draw order, truncated to [`MAX_TILES_PER_CELL`]
    fn cell_tiles(&self, pos: GridPos) -> Vec<TerrainTile> {
        let Some(cell) = self.contributions.get(&pos) else {
            return Vec::new();
        };
        if cell.len() > MAX_TILES_PER_CELL {
            warn!(
                terrain = %self.terrain.name,
                %pos,
                count = cell.len(),
                max = MAX_TILES_PER_CELL,
                "too many tiles in terrain cell; extra tiles dropped"
            );
        }
        cell.values().take(MAX_TILES_PER_CELL).copied().collect()
    }
}
