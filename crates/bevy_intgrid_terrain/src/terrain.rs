//! Terrain definitions: ordered groups of IntGrid layers composited together

use std::collections::{HashMap, HashSet};
use std::fmt;

use bevy_intgrid_core::{ConfigurationError, IntGridDefinition, LayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of member layers in one terrain
pub const MAX_TERRAIN_LAYERS: usize = 8;

/// An authored terrain: IntGrid layers whose matched tiles blend into one buffer.
///
/// Member order is draw order: earlier layers' tiles come first in each cell's range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainDefinition {
    pub id: Uuid,
    pub name: String,
    /// IntGrid ids, in draw order
    pub layers: Vec<Uuid>,
}

impl TerrainDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, grid: Uuid) -> Self {
        self.layers.push(grid);
        self
    }
}

/// Identity of a composited terrain: hash of its ordered member layer ids
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TerrainHash(pub u64);

impl TerrainHash {
    pub fn of_members(members: &[LayerId]) -> Self {
        let bytes: Vec<u8> = members.iter().flat_map(|m| m.0.to_le_bytes()).collect();
        Self(seahash::hash(&bytes))
    }
}

impl fmt::Display for TerrainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A validated terrain with members resolved to layer ids
#[derive(Debug, Clone)]
pub struct CompiledTerrain {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<LayerId>,
    pub hash: TerrainHash,
}

impl CompiledTerrain {
    /// Resolve member IntGrids and validate the member list.
    pub fn compile(
        definition: &TerrainDefinition,
        grids: &HashMap<Uuid, IntGridDefinition>,
    ) -> Result<Self, ConfigurationError> {
        if definition.layers.is_empty() {
            return Err(ConfigurationError::EmptyTerrain {
                terrain: definition.name.clone(),
            });
        }
        if definition.layers.len() > MAX_TERRAIN_LAYERS {
            return Err(ConfigurationError::TooManyTerrainLayers {
                terrain: definition.name.clone(),
                count: definition.layers.len(),
                max: MAX_TERRAIN_LAYERS,
            });
        }

        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(definition.layers.len());
        for grid_id in &definition.layers {
            if !seen.insert(*grid_id) {
                return Err(ConfigurationError::DuplicateTerrainLayer {
                    terrain: definition.name.clone(),
                    grid: *grid_id,
                });
            }
            let grid = grids
                .get(grid_id)
                .ok_or_else(|| ConfigurationError::UnknownIntGrid {
                    owner: definition.name.clone(),
                    grid: *grid_id,
                })?;
            members.push(grid.layer_id());
        }

        Ok(Self {
            id: definition.id,
            name: definition.name.clone(),
            hash: TerrainHash::of_members(&members),
            members,
        })
    }

    /// Draw-order index of `layer`, if it is a member
    pub fn member_index(&self, layer: LayerId) -> Option<usize> {
        self.members.iter().position(|m| *m == layer)
    }
}
