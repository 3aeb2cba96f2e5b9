//! Terrain compositing for bevy_intgrid.
//!
//! A [`TerrainDefinition`] names up to [`MAX_TERRAIN_LAYERS`] IntGrid layers.
//! The [`TerrainCompositor`] folds their emitted sprite commands into one flat
//! [`TerrainTile`] array with a [`TerrainIndex`] range per cell, ready for
//! instanced rendering.

mod compositor;
pub mod gpu;
mod terrain;

pub use compositor::{TerrainBuffers, TerrainCompositor, TerrainUpdate, MAX_TILES_PER_CELL};
pub use gpu::{pack_flags, TerrainIndex, TerrainTile};
pub use terrain::{CompiledTerrain, TerrainDefinition, TerrainHash, MAX_TERRAIN_LAYERS};
