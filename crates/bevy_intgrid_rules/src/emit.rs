//! Turning match outcomes into placement and removal commands

use bevy_intgrid_core::{GridPos, LayerDescriptor, LayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CompiledRuleGroup, RuleMatch, SpriteMesh};

/// Local transform of a placed sprite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteTransform {
    /// World position of the cell centre
    pub translation: [f32; 2],
    /// Counter-clockwise quarter turns (0-3)
    pub rotation: u8,
    pub flip_x: bool,
    pub flip_y: bool,
    /// Offset from `translation` to the sprite's geometric centre, after
    /// flipping and rotation, so the sprite pivot lands on the cell centre
    pub pivot_offset: [f32; 2],
}

/// Place (or replace) the visual at a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteCommand {
    pub layer: LayerId,
    pub group: Uuid,
    pub slot: u32,
    pub position: GridPos,
    pub sprite: SpriteMesh,
    pub transform: SpriteTransform,
    /// Weight of the selected result
    pub weight: u32,
    /// Authored index of the rule that matched
    pub rule_index: usize,
}

/// Clear whatever visual was drawn at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveCommand {
    pub layer: LayerId,
    pub group: Uuid,
    pub slot: u32,
    pub position: GridPos,
}

/// One entry of the output stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputCommand {
    Sprite(SpriteCommand),
    Remove(RemoveCommand),
}

impl OutputCommand {
    pub fn layer(&self) -> LayerId {
        match self {
            OutputCommand::Sprite(c) => c.layer,
            OutputCommand::Remove(c) => c.layer,
        }
    }

    pub fn position(&self) -> GridPos {
        match self {
            OutputCommand::Sprite(c) => c.position,
            OutputCommand::Remove(c) => c.position,
        }
    }

    pub fn slot(&self) -> u32 {
        match self {
            OutputCommand::Sprite(c) => c.slot,
            OutputCommand::Remove(c) => c.slot,
        }
    }

    pub fn as_sprite(&self) -> Option<&SpriteCommand> {
        match self {
            OutputCommand::Sprite(c) => Some(c),
            OutputCommand::Remove(_) => None,
        }
    }
}

/// Builds commands for one rule group on one layer.
#[derive(Debug, Clone, Copy)]
pub struct SpriteCommandEmitter<'a> {
    descriptor: &'a LayerDescriptor,
    group: &'a CompiledRuleGroup,
}

impl<'a> SpriteCommandEmitter<'a> {
    pub fn new(descriptor: &'a LayerDescriptor, group: &'a CompiledRuleGroup) -> Self {
        Self { descriptor, group }
    }

    /// A sprite command for a match, or a removal when nothing matched.
    pub fn emit(&self, position: GridPos, outcome: Option<RuleMatch<'_>>) -> OutputCommand {
        match outcome {
            Some(m) => OutputCommand::Sprite(self.sprite(position, &m)),
            None => OutputCommand::Remove(self.remove(position)),
        }
    }

    pub fn remove(&self, position: GridPos) -> RemoveCommand {
        RemoveCommand {
            layer: self.group.layer,
            group: self.group.id,
            slot: self.group.slot,
            position,
        }
    }

    fn sprite(&self, position: GridPos, m: &RuleMatch<'_>) -> SpriteCommand {
        let sprite = m.result.sprite;
        SpriteCommand {
            layer: self.group.layer,
            group: self.group.id,
            slot: self.group.slot,
            position,
            sprite,
            transform: local_transform(self.descriptor.cell_center(position), &sprite, m),
            weight: m.result.weight,
            rule_index: m.rule.authored_index,
        }
    }
}

/// Combine the sprite's own flips with the matched variant's symmetry.
fn local_transform(translation: [f32; 2], sprite: &SpriteMesh, m: &RuleMatch<'_>) -> SpriteTransform {
    let flip_x = sprite.flip_x ^ m.symmetry.flip_x();
    let flip_y = sprite.flip_y ^ m.symmetry.flip_y();
    let rotation = m.symmetry.rotation();

    let [w, h] = sprite.world_size();
    let mut offset = [(0.5 - sprite.pivot[0]) * w, (0.5 - sprite.pivot[1]) * h];
    if flip_x {
        offset[0] = -offset[0];
    }
    if flip_y {
        offset[1] = -offset[1];
    }

    SpriteTransform {
        translation,
        rotation,
        flip_x,
        flip_y,
        pivot_offset: rotate_quadrants(offset, rotation),
    }
}

fn rotate_quadrants([x, y]: [f32; 2], quadrants: u8) -> [f32; 2] {
    match quadrants % 4 {
        0 => [x, y],
        1 => [-y, x],
        2 => [-x, -y],
        _ => [y, -x],
    }
}
