//! Runtime for bevy_intgrid
//!
//! - [`load_project_from_path`] and friends parse and compile authored projects
//! - [`EngineConfig`] holds engine tuning, loaded from TOML
//! - [`IntGridEngine`] runs the drain, refresh, match and composite pipeline
//!
//! With the `bevy` feature, [`IntGridPlugin`] drives the engine once per frame.

mod config;
mod engine;
mod error;
mod loader;
#[cfg(feature = "bevy")]
mod plugin;

pub use config::EngineConfig;
pub use engine::{IntGridEngine, TerrainOutput, TickOutput};
pub use error::{EngineError, LoadError};
pub use loader::{
    load_project_from_bytes, load_project_from_path, load_project_from_str, save_project_to_path,
    CompiledProject, IntGridProject,
};
#[cfg(feature = "bevy")]
pub use plugin::{IntGridPlugin, IntGridRuntime};
