//! Loading authored IntGrid projects
//!
//! A project file is JSON holding the IntGrid palettes, the rule groups bound
//! to them and the terrains compositing them. Loading validates and compiles
//! everything up front, so a broken rule fails here and never reaches a
//! matching pass.
//!
//! ```rust,ignore
//! use bevy_intgrid_runtime::{load_project_from_path, EngineConfig, IntGridEngine};
//!
//! let project = load_project_from_path("assets/dungeon.intgrid.json")?;
//! let mut engine = IntGridEngine::new(project, EngineConfig::default())?;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use bevy_intgrid_core::{ConfigurationError, IntGridDefinition, LayerDescriptor, LayerId};
use bevy_intgrid_rules::{CompiledRuleGroup, RuleGroup};
use bevy_intgrid_terrain::{CompiledTerrain, TerrainDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::LoadError;

/// Authored project data as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntGridProject {
    #[serde(default)]
    pub int_grids: Vec<IntGridDefinition>,
    /// Rule groups in load order. Groups sharing a layer keep this order.
    #[serde(default)]
    pub rule_groups: Vec<RuleGroup>,
    #[serde(default)]
    pub terrains: Vec<TerrainDefinition>,
}

impl IntGridProject {
    /// Give every unassigned palette entry a value
    pub fn assign_values(&mut self) {
        for grid in &mut self.int_grids {
            grid.assign_values();
        }
    }

    /// Validate and compile into immutable runtime tables.
    pub fn compile(&self) -> Result<CompiledProject, ConfigurationError> {
        check_unique("int grid", self.int_grids.iter().map(|g| g.id))?;
        check_unique("rule group", self.rule_groups.iter().map(|g| g.id))?;
        check_unique("terrain", self.terrains.iter().map(|t| t.id))?;

        let mut grids = HashMap::with_capacity(self.int_grids.len());
        for grid in &self.int_grids {
            grid.validate()?;
            grids.insert(grid.id, grid.clone());
        }

        let mut groups: BTreeMap<LayerId, Vec<Arc<CompiledRuleGroup>>> = BTreeMap::new();
        for group in &self.rule_groups {
            let grid = grids
                .get(&group.int_grid)
                .ok_or_else(|| ConfigurationError::UnknownIntGrid {
                    owner: group.name.clone(),
                    grid: group.int_grid,
                })?;
            if group.disabled {
                debug!(group = %group.name, "skipping disabled rule group");
                continue;
            }
            let compiled = CompiledRuleGroup::compile(group, grid)?;
            let layer_groups = groups.entry(compiled.layer).or_default();
            let slot = layer_groups.len() as u32;
            layer_groups.push(Arc::new(compiled.with_slot(slot)));
        }

        let terrains = self
            .terrains
            .iter()
            .map(|t| CompiledTerrain::compile(t, &grids).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        for terrain in &terrains {
            for member in &terrain.members {
                if !groups.contains_key(member) {
                    warn!(terrain = %terrain.name, layer = %member, "terrain member has no rule groups");
                }
            }
        }

        debug!(
            grids = grids.len(),
            layers = groups.len(),
            terrains = terrains.len(),
            "compiled IntGrid project"
        );
        Ok(CompiledProject {
            grids: Arc::new(grids),
            groups,
            terrains,
        })
    }
}

fn check_unique(kind: &'static str, ids: impl Iterator<Item = Uuid>) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigurationError::DuplicateId { kind, id });
        }
    }
    Ok(())
}

/// A validated project: shared, immutable rule and terrain tables.
///
/// Cloning is cheap; every table is reference counted.
#[derive(Debug, Clone, Default)]
pub struct CompiledProject {
    grids: Arc<HashMap<Uuid, IntGridDefinition>>,
    groups: BTreeMap<LayerId, Vec<Arc<CompiledRuleGroup>>>,
    terrains: Vec<Arc<CompiledTerrain>>,
}

impl CompiledProject {
    pub fn grid(&self, id: Uuid) -> Option<&IntGridDefinition> {
        self.grids.get(&id)
    }

    pub fn grids(&self) -> impl Iterator<Item = &IntGridDefinition> {
        self.grids.values()
    }

    /// Descriptor of the layer backing an IntGrid
    pub fn descriptor(&self, layer: LayerId) -> Option<LayerDescriptor> {
        self.grids
            .values()
            .find(|g| g.layer_id() == layer)
            .map(IntGridDefinition::descriptor)
    }

    /// Enabled rule groups reading `layer`, in slot order
    pub fn groups_for_layer(&self, layer: LayerId) -> &[Arc<CompiledRuleGroup>] {
        self.groups.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.groups.keys().copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Arc<CompiledRuleGroup>> {
        self.groups.values().flatten()
    }

    pub fn terrains(&self) -> &[Arc<CompiledTerrain>] {
        &self.terrains
    }
}

/// Load and compile a project from a JSON string
pub fn load_project_from_str(json: &str) -> Result<CompiledProject, LoadError> {
    let project: IntGridProject = serde_json::from_str(json)?;
    Ok(project.compile()?)
}

/// Load and compile a project from bytes
pub fn load_project_from_bytes(bytes: &[u8]) -> Result<CompiledProject, LoadError> {
    let project: IntGridProject = serde_json::from_slice(bytes)?;
    Ok(project.compile()?)
}

/// Load and compile a project file
pub fn load_project_from_path(path: impl AsRef<Path>) -> Result<CompiledProject, LoadError> {
    let bytes = std::fs::read(path)?;
    load_project_from_bytes(&bytes)
}

/// Assign pending palette values, then write the project as pretty JSON.
pub fn save_project_to_path(project: &mut IntGridProject, path: impl AsRef<Path>) -> Result<(), LoadError> {
    project.assign_values();
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_intgrid_core::{Color, IntGridValue};
    use bevy_intgrid_rules::{CellMatcher, Rule, SpriteMesh};

    fn walls() -> IntGridDefinition {
        let mut grid = IntGridDefinition::new("Walls");
        grid.add_value(IntGridValue::new("Wall", Color::BLACK));
        grid
    }

    fn rule(name: &str) -> Rule {
        Rule::new(name)
            .with_cell((0, 0), CellMatcher::Value(1))
            .with_result(SpriteMesh::new(0, [0.0, 0.0, 16.0, 16.0]), 1)
    }

    #[test]
    fn groups_on_one_layer_get_slots_in_load_order() {
        let grid = walls();
        let mut disabled = RuleGroup::new("Off", grid.id).with_rule(rule("r"));
        disabled.disabled = true;
        let project = IntGridProject {
            rule_groups: vec![
                RuleGroup::new("Base", grid.id).with_rule(rule("a")),
                disabled,
                RuleGroup::new("Decor", grid.id).with_rule(rule("b")),
            ],
            int_grids: vec![grid.clone()],
            terrains: Vec::new(),
        };

        let compiled = project.compile().unwrap();
        let groups = compiled.groups_for_layer(grid.layer_id());
        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].name.as_str(), groups[0].slot), ("Base", 0));
        assert_eq!((groups[1].name.as_str(), groups[1].slot), ("Decor", 1));
        assert_eq!(compiled.descriptor(grid.layer_id()), Some(grid.descriptor()));
    }

    #[test]
    fn invalid_rule_fails_the_whole_load() {
        let grid = walls();
        let project = IntGridProject {
            rule_groups: vec![RuleGroup::new("G", grid.id).with_rule(Rule::new("no results"))],
            int_grids: vec![grid],
            terrains: Vec::new(),
        };
        let json = serde_json::to_string(&project).unwrap();
        let err = load_project_from_str(&json).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Configuration(ConfigurationError::EmptyResultPool { ref rule }) if rule == "no results"
        ));
    }

    #[test]
    fn unknown_grid_and_duplicate_ids_are_rejected() {
        let grid = walls();
        let orphan = IntGridProject {
            rule_groups: vec![RuleGroup::new("Orphan", Uuid::new_v4())],
            ..Default::default()
        };
        assert!(matches!(
            orphan.compile(),
            Err(ConfigurationError::UnknownIntGrid { ref owner, .. }) if owner == "Orphan"
        ));

        let duplicated = IntGridProject {
            int_grids: vec![grid.clone(), grid],
            ..Default::default()
        };
        assert!(matches!(
            duplicated.compile(),
            Err(ConfigurationError::DuplicateId { kind: "int grid", .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(load_project_from_str("{ not json"), Err(LoadError::Json(_))));
    }

    #[test]
    fn save_assigns_values_and_reloads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("level.intgrid.json");

        let mut grid = IntGridDefinition::new("Ground");
        grid.values.push(IntGridValue::new("Grass", Color::rgb(0.2, 0.8, 0.2)));
        grid.values.push(IntGridValue::new("Dirt", Color::rgb(0.5, 0.3, 0.1)));
        let id = grid.id;
        let mut project = IntGridProject {
            int_grids: vec![grid],
            ..Default::default()
        };

        save_project_to_path(&mut project, &path).unwrap();
        let compiled = load_project_from_path(&path).unwrap();
        let values: Vec<i32> = compiled.grid(id).unwrap().values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_project_from_path(tmp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
