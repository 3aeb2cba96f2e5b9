//! IntGrid definitions: the palette of semantic values a layer can hold

use crate::{ConfigurationError, LayerDescriptor, LayerId, EMPTY_VALUE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Simple RGBA color for palette visualization (no Bevy dependency)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// One entry of an IntGrid palette (e.g. "Wall" = 1, "Water" = 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntGridValue {
    /// Cell value. `0` means "not yet assigned"; see [`IntGridDefinition::assign_values`].
    #[serde(default)]
    pub value: i32,
    pub name: String,
    #[serde(default)]
    pub color: Color,
    /// Optional preview texture path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

impl IntGridValue {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            value: EMPTY_VALUE,
            name: name.into(),
            color,
            texture: None,
        }
    }
}

/// A named sparse integer grid definition.
///
/// The `id` is the grid key: layer identity is hashed from it, so it must
/// stay stable for the lifetime of the asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntGridDefinition {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub values: Vec<IntGridValue>,
    /// Render matched tiles on the dual grid (offset by half a cell)
    #[serde(default)]
    pub dual_grid: bool,
    #[serde(default = "default_cell_size")]
    pub cell_size: [f32; 2],
    /// Next value handed out by [`assign_values`](Self::assign_values).
    /// Persisted so removed values are never reused.
    #[serde(default = "default_next_value")]
    pub next_value: i32,
}

fn default_cell_size() -> [f32; 2] {
    [1.0, 1.0]
}

fn default_next_value() -> i32 {
    1
}

impl IntGridDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            values: Vec::new(),
            dual_grid: false,
            cell_size: default_cell_size(),
            next_value: default_next_value(),
        }
    }

    pub fn with_dual_grid(mut self, dual_grid: bool) -> Self {
        self.dual_grid = dual_grid;
        self
    }

    pub fn with_cell_size(mut self, cell_size: [f32; 2]) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Add a palette entry and assign it a value immediately
    pub fn add_value(&mut self, entry: IntGridValue) -> i32 {
        self.values.push(entry);
        self.assign_values();
        self.values.last().map(|v| v.value).unwrap_or(EMPTY_VALUE)
    }

    /// Give every unassigned entry (value `0`) a fresh value.
    ///
    /// Values start at 1 and only ever increase, even across removals.
    pub fn assign_values(&mut self) {
        let highest = self.values.iter().map(|v| v.value).max().unwrap_or(0);
        self.next_value = self.next_value.max(highest + 1).max(1);
        for entry in &mut self.values {
            if entry.value == EMPTY_VALUE {
                entry.value = self.next_value;
                self.next_value += 1;
            }
        }
    }

    /// Look up a palette entry by value
    pub fn get_value(&self, value: i32) -> Option<&IntGridValue> {
        self.values.iter().find(|v| v.value == value)
    }

    pub fn contains_value(&self, value: i32) -> bool {
        self.get_value(value).is_some()
    }

    pub fn layer_id(&self) -> LayerId {
        LayerId::from_key(self.id)
    }

    pub fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(self.id)
            .with_dual_grid(self.dual_grid)
            .with_cell_size(self.cell_size)
    }

    /// Reject palette entries that collide with a custom erase sentinel.
    pub fn check_empty_value(&self, empty_value: i32) -> Result<(), ConfigurationError> {
        match self.values.iter().find(|v| v.value == empty_value) {
            Some(entry) => Err(ConfigurationError::ReservedIntGridValue {
                grid: self.name.clone(),
                name: entry.name.clone(),
                value: empty_value,
            }),
            None => Ok(()),
        }
    }

    /// Check the palette is usable: unique values, none assigned to empty.
    ///
    /// Call [`assign_values`](Self::assign_values) first; unassigned entries
    /// are rejected here.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for entry in &self.values {
            if entry.value == EMPTY_VALUE {
                return Err(ConfigurationError::ReservedIntGridValue {
                    grid: self.name.clone(),
                    name: entry.name.clone(),
                    value: entry.value,
                });
            }
            if !seen.insert(entry.value) {
                return Err(ConfigurationError::DuplicateIntGridValue {
                    grid: self.name.clone(),
                    value: entry.value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_empty_value_rejects_colliding_entry() {
        let mut grid = IntGridDefinition::new("Walls");
        grid.add_value(IntGridValue::new("Wall", Color::BLACK));
        grid.add_value(IntGridValue::new("Door", Color::WHITE));

        assert!(grid.check_empty_value(-1).is_ok());
        assert_eq!(
            grid.check_empty_value(2),
            Err(ConfigurationError::ReservedIntGridValue {
                grid: "Walls".to_string(),
                name: "Door".to_string(),
                value: 2,
            })
        );
    }

    #[test]
    fn test_assign_values_starts_at_one() {
        let mut grid = IntGridDefinition::new("Walls");
        grid.values.push(IntGridValue::new("Stone", Color::BLACK));
        grid.values.push(IntGridValue::new("Brick", Color::WHITE));
        grid.assign_values();

        let values: Vec<i32> = grid.values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(grid.next_value, 3);
    }

    #[test]
    fn test_assign_values_never_reuses_removed_values() {
        let mut grid = IntGridDefinition::new("Walls");
        grid.add_value(IntGridValue::new("A", Color::WHITE));
        grid.add_value(IntGridValue::new("B", Color::WHITE));
        grid.values.pop();

        let value = grid.add_value(IntGridValue::new("C", Color::WHITE));
        assert_eq!(value, 3, "value 2 was handed out before and must not be reused");
    }

    #[test]
    fn test_assign_values_keeps_explicit_values() {
        let mut grid = IntGridDefinition::new("Walls");
        let mut explicit = IntGridValue::new("Water", Color::WHITE);
        explicit.value = 7;
        grid.values.push(explicit);
        grid.values.push(IntGridValue::new("Sand", Color::WHITE));
        grid.assign_values();

        assert_eq!(grid.values[0].value, 7);
        assert_eq!(grid.values[1].value, 8);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut grid = IntGridDefinition::new("Walls");
        for name in ["A", "B"] {
            let mut v = IntGridValue::new(name, Color::WHITE);
            v.value = 4;
            grid.values.push(v);
        }
        assert_eq!(
            grid.validate(),
            Err(ConfigurationError::DuplicateIntGridValue {
                grid: "Walls".to_string(),
                value: 4
            })
        );
    }

    #[test]
    fn test_validate_rejects_unassigned() {
        let mut grid = IntGridDefinition::new("Walls");
        grid.values.push(IntGridValue::new("A", Color::WHITE));
        assert!(matches!(
            grid.validate(),
            Err(ConfigurationError::ReservedIntGridValue { .. })
        ));
    }

    #[test]
    fn test_descriptor_uses_key_not_name() {
        let grid = IntGridDefinition::new("Walls").with_dual_grid(true);
        let mut renamed = grid.clone();
        renamed.name = "Cliffs".to_string();
        assert_eq!(grid.descriptor(), renamed.descriptor());
        assert!(grid.descriptor().dual_grid);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "name": "Ground",
            "values": [{ "name": "Grass" }]
        }"#;
        let mut grid: IntGridDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(grid.cell_size, [1.0, 1.0]);
        assert!(!grid.dual_grid);
        grid.assign_values();
        assert_eq!(grid.values[0].value, 1);
    }
}
