//! Rule-based IntGrid auto-tiling for Bevy games
//!
//! Paint integer cells, get deterministic sprite placements and GPU-ready
//! terrain buffers back.
//!
//! ```rust,ignore
//! use bevy_intgrid::prelude::*;
//!
//! let project = load_project_from_path("assets/dungeon.intgrid.json")?;
//! let walls = project.grids().find(|g| g.name == "Walls").unwrap().clone();
//! let mut engine = IntGridEngine::new(project, EngineConfig::default())?;
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.set_global_seed(42);
//! buffer.set_int_grid_value(&walls, GridPos::new(0, 0), 1);
//! let output = engine.tick(&mut buffer)?;
//! for sprite in output.sprites() {
//!     // draw sprite.sprite at sprite.transform
//! }
//! ```
//!
//! # Features
//!
//! - `runtime` (default): project loading and [`IntGridEngine`](runtime::IntGridEngine)
//! - `bevy`: `IntGridPlugin`, which runs the engine every `PostUpdate`

pub use bevy_intgrid_core as grid;
pub use bevy_intgrid_rules as rules;
pub use bevy_intgrid_terrain as terrain;

#[cfg(feature = "runtime")]
pub use bevy_intgrid_runtime as runtime;

pub mod prelude {
    pub use bevy_intgrid_core::{
        CellChange, Color, CommandBuffer, GridPos, GridSnapshot, GridStore, IntGridDefinition,
        IntGridValue, LayerDescriptor, LayerId,
    };
    pub use bevy_intgrid_rules::{
        CellMatcher, OutputCommand, RemoveCommand, Rule, RuleGroup, RuleTransform, SpriteCommand,
        SpriteMesh,
    };
    pub use bevy_intgrid_terrain::{
        TerrainBuffers, TerrainDefinition, TerrainHash, TerrainIndex, TerrainTile,
    };

    #[cfg(feature = "runtime")]
    pub use bevy_intgrid_runtime::{
        load_project_from_path, load_project_from_str, CompiledProject, EngineConfig, EngineError,
        IntGridEngine, IntGridProject, LoadError, TickOutput,
    };

    #[cfg(feature = "bevy")]
    pub use bevy_intgrid_runtime::{IntGridPlugin, IntGridRuntime};
}
