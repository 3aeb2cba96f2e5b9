//! Data types for the rule-based matching engine.
//!
//! A [`RuleGroup`] is bound to one IntGrid and holds an ordered list of
//! [`Rule`]s. Rule order is a priority list: the first rule that matches a
//! cell (under any of its symmetry variants) decides that cell.

use bevy_intgrid_core::GridPos;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── RuleGroup ───────────────────────────────────────────────────────────────

/// An ordered list of rules evaluated against one IntGrid layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleGroup {
    /// Stable identifier for this group.
    pub id: Uuid,
    pub name: String,
    /// The [`IntGridDefinition::id`](bevy_intgrid_core::IntGridDefinition) this group reads.
    pub int_grid: Uuid,
    pub rules: Vec<Rule>,
    /// When `true`, the group is not loaded and produces no output.
    #[serde(default)]
    pub disabled: bool,
}

impl RuleGroup {
    pub fn new(name: impl Into<String>, int_grid: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            int_grid,
            rules: Vec::new(),
            disabled: false,
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

// ─── Rule ─────────────────────────────────────────────────────────────────────

/// A single matching rule.
///
/// The rule matches at an anchor position `p` when every pattern entry's
/// matcher accepts the value at `p + offset`, for the authored pattern or any
/// of the symmetry variants enabled by `transform`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier for this rule.
    pub id: Uuid,
    pub name: String,
    pub pattern: Vec<PatternEntry>,
    #[serde(default)]
    pub transform: RuleTransform,
    /// Exactly one result is chosen per match, by seeded weighted selection.
    pub results: Vec<RuleResult>,
    /// When `true`, the rule is skipped as if it were not in the group.
    #[serde(default)]
    pub disabled: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pattern: Vec::new(),
            transform: RuleTransform::None,
            results: Vec::new(),
            disabled: false,
        }
    }

    pub fn with_cell(mut self, offset: impl Into<GridPos>, matcher: CellMatcher) -> Self {
        self.pattern.push(PatternEntry {
            offset: offset.into(),
            matcher,
        });
        self
    }

    pub fn with_transform(mut self, transform: RuleTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_result(mut self, sprite: SpriteMesh, weight: u32) -> Self {
        self.results.push(RuleResult { sprite, weight });
        self
    }
}

/// One constrained cell of a rule's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Offset from the anchor cell
    pub offset: GridPos,
    pub matcher: CellMatcher,
}

/// Determines whether a single cell matches a condition.
///
/// Matchers compare the cell's value, reading missing cells as the layer's
/// empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellMatcher {
    /// Always matches. Use this to ignore a cell in the pattern.
    Any,
    /// Matches only if the cell is empty.
    Empty,
    /// Matches if the cell holds any value.
    NonEmpty,
    /// Matches if the cell holds exactly this value.
    Value(i32),
    /// Matches if the cell is empty OR holds a different value.
    NotValue(i32),
}

impl CellMatcher {
    /// Test this matcher against a cell value (`empty` when the cell is unset)
    pub fn matches(&self, value: i32, empty: i32) -> bool {
        match *self {
            CellMatcher::Any => true,
            CellMatcher::Empty => value == empty,
            CellMatcher::NonEmpty => value != empty,
            CellMatcher::Value(required) => value == required,
            CellMatcher::NotValue(excluded) => value != excluded,
        }
    }

    /// The palette value this matcher names, if any
    pub fn referenced_value(&self) -> Option<i32> {
        match *self {
            CellMatcher::Value(v) | CellMatcher::NotValue(v) => Some(v),
            _ => None,
        }
    }
}

// ─── Transforms ──────────────────────────────────────────────────────────────

/// Which symmetry variants of a pattern a rule also matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RuleTransform {
    /// Only the authored pattern.
    #[default]
    None,
    /// Authored pattern and its X-mirror.
    MirrorX,
    /// Authored pattern and its Y-mirror.
    MirrorY,
    /// Authored pattern, X-mirror, Y-mirror and both.
    MirrorXY,
    /// The four quarter-turn rotations.
    Rotated,
}

impl RuleTransform {
    /// Variants in evaluation order. The first matching variant wins.
    pub fn variants(self) -> &'static [Symmetry] {
        use Symmetry::*;
        match self {
            RuleTransform::None => &[Identity],
            RuleTransform::MirrorX => &[Identity, MirrorX],
            RuleTransform::MirrorY => &[Identity, MirrorY],
            RuleTransform::MirrorXY => &[Identity, MirrorX, MirrorY, MirrorXY],
            RuleTransform::Rotated => &[Identity, Rotate90, Rotate180, Rotate270],
        }
    }

    pub fn variant_count(self) -> usize {
        self.variants().len()
    }
}

/// A single symmetry applied to pattern offsets and to the emitted sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symmetry {
    Identity,
    MirrorX,
    MirrorY,
    MirrorXY,
    /// Counter-clockwise quarter turn
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Symmetry {
    /// Map an authored offset into this variant
    pub fn apply(self, offset: GridPos) -> GridPos {
        match self {
            Symmetry::Identity => offset,
            Symmetry::MirrorX => offset.mirror_x(),
            Symmetry::MirrorY => offset.mirror_y(),
            Symmetry::MirrorXY => offset.mirror_x().mirror_y(),
            Symmetry::Rotate90 => offset.rotate(1),
            Symmetry::Rotate180 => offset.rotate(2),
            Symmetry::Rotate270 => offset.rotate(3),
        }
    }

    pub fn flip_x(self) -> bool {
        matches!(self, Symmetry::MirrorX | Symmetry::MirrorXY)
    }

    pub fn flip_y(self) -> bool {
        matches!(self, Symmetry::MirrorY | Symmetry::MirrorXY)
    }

    /// Counter-clockwise quarter turns (0-3)
    pub fn rotation(self) -> u8 {
        match self {
            Symmetry::Rotate90 => 1,
            Symmetry::Rotate180 => 2,
            Symmetry::Rotate270 => 3,
            _ => 0,
        }
    }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// One possible visual when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub sprite: SpriteMesh,
    /// Selection weight. Must be at least 1. Default: 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// One placeable visual unit cut from an atlas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteMesh {
    /// Atlas texture index
    #[serde(default)]
    pub texture: u32,
    /// Atlas rectangle `[x, y, width, height]` in texels
    pub rect: [f32; 4],
    /// Normalized pivot, `[0.5, 0.5]` is the centre
    #[serde(default = "default_pivot")]
    pub pivot: [f32; 2],
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
    /// World units per texel on each axis
    #[serde(default = "default_rect_scale")]
    pub rect_scale: [f32; 2],
}

fn default_pivot() -> [f32; 2] {
    [0.5, 0.5]
}

fn default_rect_scale() -> [f32; 2] {
    [1.0, 1.0]
}

impl SpriteMesh {
    pub fn new(texture: u32, rect: [f32; 4]) -> Self {
        Self {
            texture,
            rect,
            pivot: default_pivot(),
            flip_x: false,
            flip_y: false,
            rect_scale: default_rect_scale(),
        }
    }

    pub fn with_pivot(mut self, pivot: [f32; 2]) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub fn with_rect_scale(mut self, rect_scale: [f32; 2]) -> Self {
        self.rect_scale = rect_scale;
        self
    }

    /// World size of the sprite
    pub fn world_size(&self) -> [f32; 2] {
        [
            self.rect[2] * self.rect_scale[0],
            self.rect[3] * self.rect_scale[1],
        ]
    }
}
