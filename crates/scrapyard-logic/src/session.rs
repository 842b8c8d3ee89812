//! Session lifecycle — build the rule table once, apply it, and undo it.
//!
//! A [`BuildRestrictionsSession`] is created at session start from the loaded
//! [`Settings`] and carries everything the pass reads. Nothing is looked up
//! globally. The session remembers the original build list of every block it
//! changed, by position in the host's slice, so that unloading leaves the host
//! definitions as it found them even when two definitions share an id.

use std::collections::HashMap;

use crate::blocks::{BlockDescriptor, ComponentEntry, DefinitionId, DerivedAttributes};
use crate::builtin::builtin_rules;
use crate::restrictions::{
    DefinitionCatalogue, ResolutionReport, ResolveError, RestrictionConfig, RestrictionResolver,
};
use crate::rules::{Rule, RuleTable};
use crate::settings::Settings;

/// Pre-pass state of a block the session changed.
#[derive(Debug, Clone)]
struct Original {
    id: DefinitionId,
    components: Vec<ComponentEntry>,
    attributes: DerivedAttributes,
}

pub struct BuildRestrictionsSession {
    settings: Settings,
    config: RestrictionConfig,
    base_rules: Vec<Rule>,
    rules: RuleTable,
    journal: HashMap<usize, Original>,
}

impl BuildRestrictionsSession {
    /// Session with the built-in rules and constants, user exemptions first.
    pub fn new(settings: Settings) -> Self {
        Self::with_rules(settings, RestrictionConfig::default(), builtin_rules())
    }

    /// Session with custom base rules. Exemptions from `settings` still go first.
    pub fn with_rules(settings: Settings, config: RestrictionConfig, rules: Vec<Rule>) -> Self {
        let base_rules = rules.clone();
        let rules = RuleTable::with_overrides(settings.exemption_rules(), rules);
        log::debug!(
            "BuildRestrictions: rule table has {} rules ({} exemptions)",
            rules.len(),
            settings.exemption_patterns.len()
        );
        Self {
            settings,
            config,
            base_rules,
            rules,
            journal: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &RestrictionConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Number of blocks currently carrying a placeholder from this session.
    pub fn applied_count(&self) -> usize {
        self.journal.len()
    }

    /// Run the restriction pass over the host's block definitions.
    ///
    /// Changes from an earlier call are reverted first, so running this
    /// twice never stacks placeholders. On a fatal error no block is left
    /// changed by this session.
    pub fn load_data<C: DefinitionCatalogue + ?Sized>(
        &mut self,
        catalogue: &C,
        blocks: &mut [BlockDescriptor],
    ) -> Result<ResolutionReport, ResolveError> {
        if !self.journal.is_empty() {
            self.unload_data(blocks);
        }

        let before: Vec<Original> = blocks
            .iter()
            .map(|b| Original {
                id: b.id(),
                components: b.components.clone(),
                attributes: b.attributes,
            })
            .collect();

        let resolver = RestrictionResolver::new(&self.rules, &self.config);
        let report = resolver.resolve_all(catalogue, blocks)?;

        let outcomes = before.into_iter().zip(&report.outcomes).enumerate();
        for (index, (original, outcome)) in outcomes {
            if outcome.mutated() {
                self.journal.insert(index, original);
            }
        }

        Ok(report)
    }

    /// Restore every block this session changed. Returns how many were restored.
    ///
    /// `blocks` must be the same slice, in the same order, that was handed to
    /// [`load_data`](Self::load_data). A journalled position that is out of
    /// range or now holds a different definition is left alone and logged.
    pub fn unload_data(&mut self, blocks: &mut [BlockDescriptor]) -> usize {
        let mut restored = 0;
        let mut lost = 0;
        for (index, original) in self.journal.drain() {
            match blocks.get_mut(index) {
                Some(block) if block.id() == original.id => {
                    block.components = original.components;
                    block.attributes = original.attributes;
                    restored += 1;
                }
                _ => lost += 1,
            }
        }

        if lost > 0 {
            log::warn!(
                "BuildRestrictions: {} changed block(s) were not offered back for restore",
                lost
            );
        }
        log::info!("BuildRestrictions: restored {} blocks", restored);
        restored
    }

    /// Swap in new settings and re-run the pass.
    pub fn reload<C: DefinitionCatalogue + ?Sized>(
        &mut self,
        settings: Settings,
        catalogue: &C,
        blocks: &mut [BlockDescriptor],
    ) -> Result<ResolutionReport, ResolveError> {
        self.unload_data(blocks);
        self.rules =
            RuleTable::with_overrides(settings.exemption_rules(), self.base_rules.clone());
        self.settings = settings;
        self.load_data(catalogue, blocks)
    }
}
