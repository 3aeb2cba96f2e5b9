//! The incremental auto-tiling engine
//!
//! One [`IntGridEngine::tick`] runs the whole pipeline for everything queued
//! since the previous tick:
//!
//! 1. drain the [`CommandBuffer`] into the [`GridStore`]
//! 2. expand the changed cells into a dirty set with the [`RefreshTracker`]
//! 3. match every dirty cell against every rule group bound to its layer,
//!    in fixed-size partitions over an immutable snapshot
//! 4. concatenate the partitions' commands in order
//! 5. fold the commands into each terrain's GPU buffers

use std::collections::{BTreeSet, HashMap};

use bevy_intgrid_core::{
    CommandBuffer, DirtySet, GridPos, GridSnapshot, GridStore, LayerDescriptor, LayerId,
    RefreshTracker,
};
use bevy_intgrid_rules::{
    CompiledRuleGroup, OutputCommand, RemoveCommand, RuleMatcher, SpriteCommand,
    SpriteCommandEmitter,
};
use bevy_intgrid_terrain::{TerrainBuffers, TerrainCompositor, TerrainHash, TerrainUpdate};
use rayon::prelude::*;
use tracing::{debug, debug_span, trace};

use crate::{CompiledProject, EngineConfig, EngineError};

/// A terrain whose buffers changed during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainOutput {
    pub hash: TerrainHash,
    pub update: TerrainUpdate,
}

/// Everything one pass produced.
///
/// Batches are stamped with the engine generation. A consumer holding an
/// unconsumed batch may drop it once [`IntGridEngine::generation`] has moved on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub generation: u64,
    pub seed: u32,
    /// Layer order, then group slot, then row-major position
    pub commands: Vec<OutputCommand>,
    pub terrain: Vec<TerrainOutput>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.terrain.is_empty()
    }

    pub fn sprites(&self) -> impl Iterator<Item = &SpriteCommand> {
        self.commands.iter().filter_map(OutputCommand::as_sprite)
    }

    pub fn removals(&self) -> impl Iterator<Item = &RemoveCommand> {
        self.commands.iter().filter_map(|c| match c {
            OutputCommand::Remove(r) => Some(r),
            OutputCommand::Sprite(_) => None,
        })
    }
}

/// One (group, cell) evaluation
struct WorkItem<'a> {
    group: &'a CompiledRuleGroup,
    descriptor: LayerDescriptor,
    position: GridPos,
}

/// Owns the grid store and drives matching and compositing.
pub struct IntGridEngine {
    config: EngineConfig,
    project: CompiledProject,
    store: GridStore,
    tracker: RefreshTracker,
    compositors: Vec<TerrainCompositor>,
    /// What each layer currently has drawn, by group slot
    drawn: HashMap<LayerId, BTreeSet<(u32, GridPos)>>,
    pool: Option<rayon::ThreadPool>,
    generation: u64,
    seed: u32,
}

impl IntGridEngine {
    pub fn new(project: CompiledProject, config: EngineConfig) -> Result<Self, EngineError> {
        let mut store = GridStore::with_layer_capacity(config.default_layer_capacity)
            .with_empty_value(config.empty_value);
        for grid in project.grids() {
            grid.check_empty_value(config.empty_value)?;
            store.ensure_layer(grid.descriptor())?;
        }

        let mut tracker = RefreshTracker::new();
        for group in project.groups() {
            tracker.register_offsets(group.layer, group.influence().iter().copied());
        }

        let compositors = project
            .terrains()
            .iter()
            .map(|t| TerrainCompositor::new((**t).clone()))
            .collect();

        let pool = if config.parallel && config.worker_threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.worker_threads)
                    .thread_name(|i| format!("intgrid-match-{i}"))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            project,
            store,
            tracker,
            compositors,
            drawn: HashMap::new(),
            pool,
            generation: 0,
            seed: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn project(&self) -> &CompiledProject {
        &self.project
    }

    pub fn store(&self) -> &GridStore {
        &self.store
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.store.snapshot()
    }

    /// Bumped by every pass that changed something
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Seed used by the most recent pass
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn terrain(&self, hash: TerrainHash) -> Option<&TerrainBuffers> {
        self.compositors
            .iter()
            .find(|c| c.hash() == hash)
            .map(TerrainCompositor::buffers)
    }

    pub fn terrains(&self) -> impl Iterator<Item = &TerrainBuffers> {
        self.compositors.iter().map(TerrainCompositor::buffers)
    }

    /// Number of cells with a visual drawn on `layer`, across all its groups
    pub fn drawn_count(&self, layer: LayerId) -> usize {
        self.drawn.get(&layer).map_or(0, BTreeSet::len)
    }

    /// Run one pass over everything queued in `buffer`.
    ///
    /// On error nothing is committed and the buffer keeps its commands.
    pub fn tick(&mut self, buffer: &mut CommandBuffer) -> Result<TickOutput, EngineError> {
        let report = self.store.drain(buffer)?;
        if report.is_empty() {
            return Ok(TickOutput {
                generation: self.generation,
                seed: self.seed,
                ..Default::default()
            });
        }

        self.generation += 1;
        self.seed = report.seed;
        let _span = debug_span!("intgrid_tick", generation = self.generation).entered();

        let dirty = self.tracker.expand(&report);
        let snapshot = self.store.snapshot();
        let commands = self.match_dirty(&dirty, &snapshot, report.seed);
        self.record_drawn(&commands);

        let mut terrain = Vec::new();
        for compositor in &mut self.compositors {
            let update = compositor.apply(&commands);
            if update.is_changed() {
                terrain.push(TerrainOutput {
                    hash: compositor.hash(),
                    update,
                });
            }
        }

        debug!(
            layers = report.layers.len(),
            touched = report.touched_positions(),
            commands = commands.len(),
            terrains = terrain.len(),
            "tick complete"
        );
        Ok(TickOutput {
            generation: self.generation,
            seed: report.seed,
            commands,
            terrain,
        })
    }

    /// Tear down a layer: its cells, its queued commands in `buffer`, and its
    /// terrain contributions.
    ///
    /// Returns a removal for every visual the layer had drawn.
    pub fn remove_layer(
        &mut self,
        layer: LayerId,
        buffer: &mut CommandBuffer,
    ) -> Result<TickOutput, EngineError> {
        let queued = buffer.discard_layer(layer);
        let stored = self.store.remove_layer(layer).is_some();
        let drawn = self.drawn.remove(&layer).unwrap_or_default();
        if !queued && !stored && drawn.is_empty() {
            return Err(EngineError::UnknownLayer(layer));
        }

        let groups = self.project.groups_for_layer(layer);
        let commands: Vec<OutputCommand> = drawn
            .into_iter()
            .filter_map(|(slot, position)| {
                groups.get(slot as usize).map(|group| {
                    OutputCommand::Remove(RemoveCommand {
                        layer,
                        group: group.id,
                        slot,
                        position,
                    })
                })
            })
            .collect();

        let terrain = self
            .compositors
            .iter_mut()
            .filter_map(|c| {
                let update = c.remove_layer(layer);
                update.is_changed().then(|| TerrainOutput {
                    hash: c.hash(),
                    update,
                })
            })
            .collect();

        self.generation += 1;
        debug!(layer = %layer, removed = commands.len(), "layer torn down");
        Ok(TickOutput {
            generation: self.generation,
            seed: self.seed,
            commands,
            terrain,
        })
    }

    fn match_dirty(&self, dirty: &DirtySet, snapshot: &GridSnapshot, seed: u32) -> Vec<OutputCommand> {
        let mut work = Vec::new();
        for (layer, positions) in dirty {
            let groups = self.project.groups_for_layer(*layer);
            if groups.is_empty() {
                continue;
            }
            let Some(descriptor) = snapshot.descriptor(*layer).copied() else {
                continue;
            };
            for group in groups {
                work.extend(positions.iter().map(|&position| WorkItem {
                    group,
                    descriptor,
                    position,
                }));
            }
        }

        let partition_size = self.config.partition_size.max(1);
        let empty_value = self.config.empty_value;
        debug!(
            dirty = work.len(),
            partitions = work.len().div_ceil(partition_size),
            parallel = self.config.parallel,
            "matching dirty cells"
        );

        let partitions: Vec<Vec<OutputCommand>> = if self.config.parallel {
            let run = || {
                work.par_chunks(partition_size)
                    .map(|items| match_partition(snapshot, seed, empty_value, items))
                    .collect::<Vec<_>>()
            };
            match &self.pool {
                Some(pool) => pool.install(run),
                None => run(),
            }
        } else {
            work.chunks(partition_size)
                .map(|items| match_partition(snapshot, seed, empty_value, items))
                .collect()
        };
        partitions.concat()
    }

    fn record_drawn(&mut self, commands: &[OutputCommand]) {
        for command in commands {
            let drawn = self.drawn.entry(command.layer()).or_default();
            let key = (command.slot(), command.position());
            match command {
                OutputCommand::Sprite(_) => {
                    drawn.insert(key);
                }
                OutputCommand::Remove(_) => {
                    drawn.remove(&key);
                }
            }
        }
    }
}

fn match_partition(
    snapshot: &GridSnapshot,
    seed: u32,
    empty_value: i32,
    items: &[WorkItem<'_>],
) -> Vec<OutputCommand> {
    let matcher = RuleMatcher::new(snapshot, seed).with_empty_value(empty_value);
    trace!(items = items.len(), "matching partition");
    items
        .iter()
        .map(|item| {
            SpriteCommandEmitter::new(&item.descriptor, item.group)
                .emit(item.position, matcher.evaluate(item.group, item.position))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntGridProject;
    use bevy_intgrid_core::{Color, IntGridDefinition, IntGridValue};
    use bevy_intgrid_rules::{CellMatcher, Rule, RuleGroup, SpriteMesh};

    fn single_cell_engine(config: EngineConfig) -> (IntGridDefinition, IntGridEngine) {
        let mut grid = IntGridDefinition::new("Walls");
        grid.add_value(IntGridValue::new("Wall", Color::BLACK));
        let project = IntGridProject {
            rule_groups: vec![RuleGroup::new("G", grid.id).with_rule(
                Rule::new("wall")
                    .with_cell((0, 0), CellMatcher::Value(1))
                    .with_result(SpriteMesh::new(0, [0.0, 0.0, 16.0, 16.0]), 1),
            )],
            int_grids: vec![grid.clone()],
            terrains: Vec::new(),
        };
        let engine = IntGridEngine::new(project.compile().unwrap(), config).unwrap();
        (grid, engine)
    }

    #[test]
    fn empty_tick_keeps_generation() {
        let (_, mut engine) = single_cell_engine(EngineConfig::default());
        let output = engine.tick(&mut CommandBuffer::new()).unwrap();
        assert!(output.is_empty());
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn drawn_cells_are_tracked_and_torn_down() {
        let (grid, mut engine) = single_cell_engine(EngineConfig::default().sequential());
        let mut buffer = CommandBuffer::new();
        buffer.set_int_grid_value(&grid, GridPos::new(0, 0), 1);
        buffer.set_int_grid_value(&grid, GridPos::new(2, 0), 1);
        let output = engine.tick(&mut buffer).unwrap();
        assert_eq!(output.sprites().count(), 2);
        assert_eq!(engine.drawn_count(grid.layer_id()), 2);

        buffer.set_int_grid_value(&grid, GridPos::new(5, 5), 1);
        let teardown = engine.remove_layer(grid.layer_id(), &mut buffer).unwrap();
        assert_eq!(teardown.removals().count(), 2);
        assert_eq!(teardown.generation, 2);
        assert!(buffer.is_empty());
        assert_eq!(engine.drawn_count(grid.layer_id()), 0);
        assert!(engine.store().layer(grid.layer_id()).is_none());

        assert!(matches!(
            engine.remove_layer(grid.layer_id(), &mut buffer),
            Err(EngineError::UnknownLayer(_))
        ));
    }

    #[test]
    fn mismatched_descriptor_fails_without_committing() {
        let (grid, mut engine) = single_cell_engine(EngineConfig::default());
        let mut buffer = CommandBuffer::new();
        buffer.set(&grid.descriptor().with_dual_grid(true), GridPos::ZERO, 1);

        assert!(matches!(engine.tick(&mut buffer), Err(EngineError::Grid(_))));
        assert_eq!(buffer.pending_sets(), 1);
        assert_eq!(engine.generation(), 0);
        assert!(engine.store().get(grid.layer_id(), GridPos::ZERO).is_none());
    }

    #[test]
    fn dedicated_pool_is_built_from_config() {
        let (grid, mut engine) = single_cell_engine(EngineConfig::default().with_worker_threads(2));
        let mut buffer = CommandBuffer::new();
        buffer.set_int_grid_value(&grid, GridPos::ZERO, 1);
        let output = engine.tick(&mut buffer).unwrap();
        assert_eq!(output.sprites().count(), 1);
    }
}
