//! Bevy integration
//!
//! [`IntGridPlugin`] builds an [`IntGridEngine`] from a compiled project and
//! runs one pass per frame in `PostUpdate`, after gameplay systems have
//! queued their edits.
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use bevy_intgrid_runtime::{load_project_from_path, IntGridPlugin, IntGridRuntime};
//!
//! fn main() {
//!     let project = load_project_from_path("assets/dungeon.intgrid.json").unwrap();
//!     App::new()
//!         .add_plugins(IntGridPlugin::new(project))
//!         .add_systems(Update, dig)
//!         .run();
//! }
//!
//! fn dig(mut runtime: ResMut<IntGridRuntime>) {
//!     // runtime.commands.set(...)
//! }
//! ```

use bevy::prelude::*;
use bevy_intgrid_core::CommandBuffer;
use tracing::error;

use crate::{CompiledProject, EngineConfig, EngineError, IntGridEngine, TickOutput};

/// Engine, pending edits and the latest non-empty pass output
#[derive(Resource)]
pub struct IntGridRuntime {
    pub engine: IntGridEngine,
    /// Edits queued here are applied in the next `PostUpdate`
    pub commands: CommandBuffer,
    pub last_output: Option<TickOutput>,
    /// Error from the most recent pass. The failed edits stay queued in
    /// `commands` until the caller fixes or discards them.
    pub last_error: Option<EngineError>,
}

impl IntGridRuntime {
    pub fn new(engine: IntGridEngine) -> Self {
        let commands = CommandBuffer::with_layer_capacity(engine.config().default_layer_capacity);
        Self {
            engine,
            commands,
            last_output: None,
            last_error: None,
        }
    }

    /// Take the latest output if it is still current
    pub fn take_output(&mut self) -> Option<TickOutput> {
        let generation = self.engine.generation();
        self.last_output.take().filter(|o| o.generation == generation)
    }
}

pub struct IntGridPlugin {
    project: CompiledProject,
    config: EngineConfig,
}

impl IntGridPlugin {
    pub fn new(project: CompiledProject) -> Self {
        Self {
            project,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl Plugin for IntGridPlugin {
    /// # Panics
    ///
    /// If the project does not fit the engine config, or the matching thread
    /// pool cannot be built.
    fn build(&self, app: &mut App) {
        let engine = match IntGridEngine::new(self.project.clone(), self.config.clone()) {
            Ok(engine) => engine,
            Err(err) => panic!("failed to start IntGrid engine: {err}"),
        };
        app.insert_resource(IntGridRuntime::new(engine))
            .add_systems(PostUpdate, run_intgrid_pass);
    }
}

/// Drain queued edits and keep the pass output for consumers
fn run_intgrid_pass(mut runtime: ResMut<IntGridRuntime>) {
    let runtime = &mut *runtime;
    match runtime.engine.tick(&mut runtime.commands) {
        Ok(output) => {
            runtime.last_error = None;
            if !output.is_empty() {
                runtime.last_output = Some(output);
            }
        }
        Err(err) => {
            // Logged once per failure streak; the queued edits are retried every frame.
            if runtime.last_error.is_none() {
                error!("IntGrid pass failed: {err}");
            }
            runtime.last_error = Some(err);
        }
    }
}
