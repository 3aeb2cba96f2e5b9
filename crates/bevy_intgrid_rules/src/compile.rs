//! Validation and compilation of authored rule groups
//!
//! Authoring data is checked once, at load time. A [`CompiledRuleGroup`] is
//! immutable, precomputes every symmetry variant's offsets, and is shared by
//! `Arc` between passes and worker threads.

use std::collections::HashSet;

use bevy_intgrid_core::{ConfigurationError, GridPos, IntGridDefinition, LayerId};
use tracing::warn;
use uuid::Uuid;

use crate::{CellMatcher, Rule, RuleGroup, RuleResult, Symmetry};

/// One symmetry variant of a rule, with its offsets already transformed.
#[derive(Debug, Clone)]
pub struct CompiledVariant {
    pub symmetry: Symmetry,
    /// Constrained entries only; `Any` entries are dropped.
    pub entries: Vec<(GridPos, CellMatcher)>,
}

/// A validated, enabled rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: Uuid,
    pub name: String,
    /// Position of the rule in the authored group, counting disabled rules
    pub authored_index: usize,
    pub variants: Vec<CompiledVariant>,
    pub results: Vec<RuleResult>,
    pub total_weight: u64,
}

/// An immutable rule table bound to one layer.
#[derive(Debug, Clone)]
pub struct CompiledRuleGroup {
    pub id: Uuid,
    pub name: String,
    pub int_grid: Uuid,
    pub layer: LayerId,
    /// Position of this group among the groups bound to the same layer
    pub slot: u32,
    pub rules: Vec<CompiledRule>,
    influence: Vec<GridPos>,
}

impl CompiledRuleGroup {
    /// Validate `group` against its IntGrid and compile it.
    ///
    /// Rejects empty result pools, zero weights and patterns constraining the
    /// same offset twice. Matchers naming values missing from the palette
    /// are allowed but logged.
    pub fn compile(group: &RuleGroup, grid: &IntGridDefinition) -> Result<Self, ConfigurationError> {
        if group.int_grid != grid.id {
            return Err(ConfigurationError::UnknownIntGrid {
                owner: group.name.clone(),
                grid: group.int_grid,
            });
        }

        let mut rules = Vec::with_capacity(group.rules.len());
        for (authored_index, rule) in group.rules.iter().enumerate() {
            validate_rule(rule)?;
            if rule.disabled {
                continue;
            }
            warn_unknown_values(rule, grid);
            rules.push(compile_rule(rule, authored_index));
        }

        let mut influence: Vec<GridPos> = rules
            .iter()
            .flat_map(|r| r.variants.iter())
            .flat_map(|v| v.entries.iter().map(|(offset, _)| *offset))
            .collect();
        influence.sort();
        influence.dedup();

        Ok(Self {
            id: group.id,
            name: group.name.clone(),
            int_grid: group.int_grid,
            layer: grid.layer_id(),
            slot: 0,
            rules,
            influence,
        })
    }

    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    /// Every offset read by any variant of any rule in the group
    pub fn influence(&self) -> &[GridPos] {
        &self.influence
    }
}

/// Reject a rule that can never be evaluated safely.
pub fn validate_rule(rule: &Rule) -> Result<(), ConfigurationError> {
    if rule.results.is_empty() {
        return Err(ConfigurationError::EmptyResultPool {
            rule: rule.name.clone(),
        });
    }
    if let Some(index) = rule.results.iter().position(|r| r.weight == 0) {
        return Err(ConfigurationError::ZeroWeight {
            rule: rule.name.clone(),
            index,
        });
    }
    let mut seen = HashSet::with_capacity(rule.pattern.len());
    for entry in &rule.pattern {
        if !seen.insert(entry.offset) {
            return Err(ConfigurationError::DuplicateOffset {
                rule: rule.name.clone(),
                offset: entry.offset,
            });
        }
    }
    Ok(())
}

fn compile_rule(rule: &Rule, authored_index: usize) -> CompiledRule {
    let variants = rule
        .transform
        .variants()
        .iter()
        .map(|&symmetry| CompiledVariant {
            symmetry,
            entries: rule
                .pattern
                .iter()
                .filter(|e| e.matcher != CellMatcher::Any)
                .map(|e| (symmetry.apply(e.offset), e.matcher))
                .collect(),
        })
        .collect();

    CompiledRule {
        id: rule.id,
        name: rule.name.clone(),
        authored_index,
        variants,
        results: rule.results.clone(),
        total_weight: rule.results.iter().map(|r| r.weight as u64).sum(),
    }
}

fn warn_unknown_values(rule: &Rule, grid: &IntGridDefinition) {
    for entry in &rule.pattern {
        if let Some(value) = entry.matcher.referenced_value() {
            if value != bevy_intgrid_core::EMPTY_VALUE && !grid.contains_value(value) {
                warn!(
                    rule = %rule.name,
                    grid = %grid.name,
                    value,
                    "rule references a value missing from the IntGrid palette"
                );
            }
        }
    }
}
