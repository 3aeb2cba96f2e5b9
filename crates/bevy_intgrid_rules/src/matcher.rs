//! The matcher: decides which rule and result apply at a cell.
//!
//! Matching only reads an immutable [`GridSnapshot`], so it is a pure
//! function of `(snapshot, rules, seed, position)` and can run on any number
//! of threads without affecting the outcome.

use bevy_intgrid_core::{GridPos, GridSnapshot, LayerId, EMPTY_VALUE};

use crate::hash::{position_hash, select_weighted};
use crate::{CompiledRule, CompiledRuleGroup, CompiledVariant, RuleResult, Symmetry};

/// The outcome of a successful match.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'g> {
    pub rule: &'g CompiledRule,
    pub symmetry: Symmetry,
    pub result_index: usize,
    pub result: &'g RuleResult,
}

/// Evaluates rule groups against a snapshot with a fixed seed.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher<'s> {
    snapshot: &'s GridSnapshot,
    seed: u32,
    empty_value: i32,
}

impl<'s> RuleMatcher<'s> {
    pub fn new(snapshot: &'s GridSnapshot, seed: u32) -> Self {
        Self {
            snapshot,
            seed,
            empty_value: EMPTY_VALUE,
        }
    }

    /// Override the value missing cells read as
    pub fn with_empty_value(mut self, empty_value: i32) -> Self {
        self.empty_value = empty_value;
        self
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Evaluate `group` at `pos`.
    ///
    /// Rules are tried in order, and each rule's variants in their fixed
    /// order. The first variant that matches decides the cell; later rules
    /// are never consulted. Returns `None` when no rule matches.
    pub fn evaluate<'g>(&self, group: &'g CompiledRuleGroup, pos: GridPos) -> Option<RuleMatch<'g>> {
        for rule in &group.rules {
            let Some(variant) = rule
                .variants
                .iter()
                .find(|v| self.variant_matches(group.layer, v, pos))
            else {
                continue;
            };

            let hash = position_hash(self.seed, pos);
            let result_index = select_weighted(&rule.results, rule.total_weight, hash)?;
            return Some(RuleMatch {
                rule,
                symmetry: variant.symmetry,
                result_index,
                result: &rule.results[result_index],
            });
        }
        None
    }

    fn variant_matches(&self, layer: LayerId, variant: &CompiledVariant, pos: GridPos) -> bool {
        variant.entries.iter().all(|&(offset, matcher)| {
            let value = self.snapshot.value_or(layer, pos + offset, self.empty_value);
            matcher.matches(value, self.empty_value)
        })
    }
}
