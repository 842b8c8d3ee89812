//! Restriction pass — classify every block definition and gate it behind a
//! placeholder component where the rules say so.
//!
//! Each block ends in exactly one of three states:
//!
//! | Match | Rule placeholder | Result |
//! |-------|------------------|--------|
//! | none | — | default placeholder prepended, counted as unmatched |
//! | rule | unset | untouched, counted as free to build |
//! | rule | set | rule's placeholder prepended, counted as restricted |
//!
//! Placeholder entries always come with a paired attribute recalculation
//! (see [`crate::integrity::prepend_component`]).
//!
//! The default placeholder and the deconstruct item are looked up before any
//! block is touched; if either is missing the pass fails and nothing changes.
//! A rule naming a component the host cannot find only skips that block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::{BlockDescriptor, ComponentHandle, DefinitionId, ItemHandle, SizeClass};
use crate::builtin;
use crate::integrity::prepend_component;
use crate::rules::{Rule, RuleTable};

/// Session constants for the restriction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionConfig {
    /// Component subtype given to blocks no rule covers.
    pub default_placeholder: String,
    /// Item a placeholder turns into when ground down.
    pub deconstruct_item: DefinitionId,
    /// Large grid count multiplier when a rule has no explicit large count.
    pub large_grid_multiplier: u32,
}

impl Default for RestrictionConfig {
    fn default() -> Self {
        Self {
            default_placeholder: builtin::DEFAULT_PLACEHOLDER.to_string(),
            deconstruct_item: DefinitionId::new(
                builtin::DECONSTRUCT_ITEM_TYPE,
                builtin::DECONSTRUCT_ITEM_SUBTYPE,
            ),
            large_grid_multiplier: builtin::LARGE_GRID_MULTIPLIER,
        }
    }
}

impl RestrictionConfig {
    /// Placeholder count for a block no rule covers.
    pub fn default_count(&self, size: SizeClass) -> u32 {
        match size {
            SizeClass::Small => 1,
            SizeClass::Large => self.large_grid_multiplier,
        }
    }
}

/// Definition lookups the host has to provide.
pub trait DefinitionCatalogue {
    /// Component definition by subtype.
    fn component(&self, subtype: &str) -> Option<ComponentHandle>;

    /// Physical item definition by full id.
    fn item(&self, id: &DefinitionId) -> Option<ItemHandle>;
}

/// Global dependencies the pass cannot run without.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unable to load default placeholder component: {0}")]
    MissingDefaultPlaceholder(String),

    #[error("unable to load deconstruct item: {0}")]
    MissingDeconstructItem(DefinitionId),
}

/// How the rule table classifies a block, before anything is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'r> {
    Unmatched,
    FreeToBuild(&'r Rule),
    Restricted(&'r Rule),
}

/// What the pass did to one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    FreeToBuild,
    Restricted { component: String, count: u32 },
    Unmatched { count: u32 },
    /// The rule's placeholder could not be resolved; block left untouched.
    Skipped { missing: String },
}

impl Outcome {
    /// Whether the block's component list was changed.
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Restricted { .. } | Self::Unmatched { .. })
    }
}

/// A block the pass had to leave alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBlock {
    pub block: DefinitionId,
    pub missing_component: String,
}

/// Tally of a finished pass. `outcomes` is parallel to the input slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Every block offered to the pass, skipped ones included.
    pub total: usize,
    pub free_to_build: usize,
    pub restricted: usize,
    pub unmatched: usize,
    pub skipped: Vec<SkippedBlock>,
    pub outcomes: Vec<Outcome>,
}

impl ResolutionReport {
    fn record(&mut self, block: &BlockDescriptor, outcome: Outcome) {
        self.total += 1;
        match &outcome {
            Outcome::FreeToBuild => self.free_to_build += 1,
            Outcome::Restricted { .. } => self.restricted += 1,
            Outcome::Unmatched { .. } => self.unmatched += 1,
            Outcome::Skipped { missing } => self.skipped.push(SkippedBlock {
                block: block.id(),
                missing_component: missing.clone(),
            }),
        }
        self.outcomes.push(outcome);
    }
}

/// Applies a rule table to the host's block definitions.
pub struct RestrictionResolver<'a> {
    rules: &'a RuleTable,
    config: &'a RestrictionConfig,
}

impl<'a> RestrictionResolver<'a> {
    pub fn new(rules: &'a RuleTable, config: &'a RestrictionConfig) -> Self {
        Self { rules, config }
    }

    pub fn classify(&self, block: &BlockDescriptor) -> Classification<'a> {
        match self.rules.find_match(block) {
            None => Classification::Unmatched,
            Some(rule) if rule.is_restricted() => Classification::Restricted(rule),
            Some(rule) => Classification::FreeToBuild(rule),
        }
    }

    /// Run the pass over every block.
    ///
    /// Fails without touching any block if the default placeholder or the
    /// deconstruct item cannot be resolved.
    pub fn resolve_all<C: DefinitionCatalogue + ?Sized>(
        &self,
        catalogue: &C,
        blocks: &mut [BlockDescriptor],
    ) -> Result<ResolutionReport, ResolveError> {
        let default_placeholder = catalogue
            .component(&self.config.default_placeholder)
            .ok_or_else(|| {
                log::error!(
                    "BuildRestrictions: Unable to load default placeholder component: {}",
                    self.config.default_placeholder
                );
                ResolveError::MissingDefaultPlaceholder(self.config.default_placeholder.clone())
            })?;

        let deconstruct_item = catalogue
            .item(&self.config.deconstruct_item)
            .ok_or_else(|| {
                log::error!(
                    "BuildRestrictions: Unable to load deconstruct item: {}",
                    self.config.deconstruct_item
                );
                ResolveError::MissingDeconstructItem(self.config.deconstruct_item.clone())
            })?;

        let mut report = ResolutionReport::default();
        for block in blocks.iter_mut() {
            let outcome = self.apply(catalogue, block, &default_placeholder, &deconstruct_item);
            report.record(block, outcome);
        }

        log::info!(
            "BuildRestrictions: Found {} blocks, {} are free to build, {} have specific restrictions, {} unspecified, {} skipped",
            report.total,
            report.free_to_build,
            report.restricted,
            report.unmatched,
            report.skipped.len()
        );

        Ok(report)
    }

    fn apply<C: DefinitionCatalogue + ?Sized>(
        &self,
        catalogue: &C,
        block: &mut BlockDescriptor,
        default_placeholder: &ComponentHandle,
        deconstruct_item: &ItemHandle,
    ) -> Outcome {
        match self.classify(block) {
            Classification::FreeToBuild(_) => Outcome::FreeToBuild,
            Classification::Unmatched => {
                log::warn!(
                    "BuildRestrictions: Unspecified block: {} / {}",
                    block.block_type,
                    block.subtype
                );
                let count = self.config.default_count(block.size);
                prepend_component(
                    block,
                    default_placeholder.clone(),
                    count,
                    Some(deconstruct_item.clone()),
                );
                Outcome::Unmatched { count }
            }
            Classification::Restricted(rule) => {
                // is_restricted guarantees a non-empty name
                let required = rule.required.as_deref().unwrap_or_default();
                let Some(component) = catalogue.component(required) else {
                    log::warn!(
                        "BuildRestrictions: Unable to load placeholder component {} for {} / {}",
                        required,
                        block.block_type,
                        block.subtype
                    );
                    return Outcome::Skipped {
                        missing: required.to_string(),
                    };
                };
                let count = rule.placeholder_count(block.size, self.config.large_grid_multiplier);
                log::debug!(
                    "BuildRestrictions: {} / {} requires {} x{}",
                    block.block_type,
                    block.subtype,
                    required,
                    count
                );
                prepend_component(block, component, count, Some(deconstruct_item.clone()));
                Outcome::Restricted {
                    component: required.to_string(),
                    count,
                }
            }
        }
    }
}
