//! Rule-based IntGrid matching engine for bevy_intgrid.
//!
//! Authored [`RuleGroup`]s are validated and compiled into immutable
//! [`CompiledRuleGroup`] tables. A [`RuleMatcher`] evaluates a compiled group
//! at a cell against a [`GridSnapshot`](bevy_intgrid_core::GridSnapshot), and a
//! [`SpriteCommandEmitter`] turns the outcome into an [`OutputCommand`].
//!
//! This crate has no Bevy dependency. It operates on plain data from `bevy_intgrid_core`.

mod compile;
mod emit;
pub mod hash;
mod matcher;
mod types;

pub use compile::{validate_rule, CompiledRule, CompiledRuleGroup, CompiledVariant};
pub use emit::{OutputCommand, RemoveCommand, SpriteCommand, SpriteCommandEmitter, SpriteTransform};
pub use hash::{position_hash, select_weighted};
pub use matcher::{RuleMatch, RuleMatcher};
pub use types::{
    CellMatcher, PatternEntry, Rule, RuleGroup, RuleResult, RuleTransform, SpriteMesh, Symmetry,
};
