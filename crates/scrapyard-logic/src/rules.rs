//! Ordered block matching rules — first match wins.
//!
//! A rule names a block type (by handle, or by type string for blocks this
//! crate has no handle for), optionally narrows it with a case-insensitive
//! subtype substring, and says which placeholder component the block must be
//! started from. A rule without a placeholder marks the block free to build.
//!
//! Order is part of the contract: specific rules sit above the generic
//! catch-all for the same type, so an atmospheric thruster rule must come
//! before the plain thruster rule.
//!
//! ```
//! use scrapyard_logic::blocks::{BlockDescriptor, BlockType, SizeClass};
//! use scrapyard_logic::rules::{Rule, RuleTable};
//!
//! let table = RuleTable::new(vec![
//!     Rule::require(BlockType::Thrust, "Frame").with_subtype("Atmospheric"),
//!     Rule::allow(BlockType::Thrust),
//! ]);
//! let block = BlockDescriptor::new(BlockType::Thrust, "AtmosphericLarge", SizeClass::Large);
//! let rule = table.find_match(&block).unwrap();
//! assert_eq!(rule.required.as_deref(), Some("Frame"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::blocks::{strip_type_prefix, BlockDescriptor, BlockType, BlockTypeId, SizeClass};

/// Which block type a rule targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    ByHandle(BlockType),
    /// Bare type name, compared against the descriptor's type name.
    ByString(String),
}

impl RuleType {
    /// String form, stripping the host prefix if the caller left it on.
    pub fn by_string(name: &str) -> Self {
        Self::ByString(strip_type_prefix(name).to_string())
    }

    pub fn matches(&self, block_type: &BlockTypeId) -> bool {
        match self {
            Self::ByHandle(handle) => block_type.handle() == Some(*handle),
            Self::ByString(name) => block_type.name() == name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ByHandle(handle) => handle.name(),
            Self::ByString(name) => name,
        }
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub block_type: RuleType,
    /// Case-insensitive substring the subtype must contain. `None` or empty
    /// matches every subtype of the type.
    pub subtype: Option<String>,
    /// Subtype of the placeholder component. `None` means free to build.
    pub required: Option<String>,
    /// Placeholder count for small grids (1 if unset).
    pub quantity: Option<u32>,
    /// Placeholder count for large grids (quantity × large multiplier if unset).
    pub quantity_large: Option<u32>,
}

impl Rule {
    fn new(block_type: RuleType, required: Option<String>) -> Self {
        Self {
            block_type,
            subtype: None,
            required,
            quantity: None,
            quantity_large: None,
        }
    }

    /// Blocks of this type can be built without a placeholder.
    pub fn allow(block_type: BlockType) -> Self {
        Self::new(RuleType::ByHandle(block_type), None)
    }

    /// Blocks of this type must be started from the given placeholder component.
    pub fn require(block_type: BlockType, component: impl Into<String>) -> Self {
        Self::new(RuleType::ByHandle(block_type), Some(component.into()))
    }

    /// Free-to-build rule keyed by type string, as produced by user exemptions.
    pub fn exempt(type_name: &str, subtype: Option<&str>) -> Self {
        let mut rule = Self::new(RuleType::by_string(type_name), None);
        rule.subtype = subtype.filter(|s| !s.is_empty()).map(str::to_string);
        rule
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_large_quantity(mut self, quantity: u32) -> Self {
        self.quantity_large = Some(quantity);
        self
    }

    /// Whether this rule governs the given block.
    pub fn matches(&self, block: &BlockDescriptor) -> bool {
        if !self.block_type.matches(&block.block_type) {
            return false;
        }
        match self.subtype.as_deref() {
            None | Some("") => true,
            Some(needle) => block
                .subtype
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.required.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Number of placeholder components a block of the given size needs.
    ///
    /// Zero counts in the rule are treated as unset.
    pub fn placeholder_count(&self, size: SizeClass, large_multiplier: u32) -> u32 {
        let quantity = self.quantity.filter(|&q| q > 0).unwrap_or(1);
        match size {
            SizeClass::Small => quantity,
            SizeClass::Large => self
                .quantity_large
                .filter(|&q| q > 0)
                .unwrap_or_else(|| quantity.saturating_mul(large_multiplier)),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_type.name())?;
        if let Some(subtype) = self.subtype.as_deref().filter(|s| !s.is_empty()) {
            write!(f, "/{}", subtype)?;
        }
        match self.required.as_deref() {
            Some(required) if !required.is_empty() => write!(f, " -> {}", required),
            _ => f.write_str(" -> free"),
        }
    }
}

/// Ordered rule list. Earlier rules outrank later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build a table with `overrides` placed ahead of `rules`, keeping the
    /// relative order of both.
    pub fn with_overrides(overrides: Vec<Rule>, rules: Vec<Rule>) -> Self {
        let mut combined = overrides;
        combined.extend(rules);
        Self { rules: combined }
    }

    /// First rule that governs the block, if any.
    pub fn find_match(&self, block: &BlockDescriptor) -> Option<&Rule> {
        self.find_match_index(block).map(|(_, rule)| rule)
    }

    /// Like [`find_match`](Self::find_match), also returning the rule's position.
    pub fn find_match_index(&self, block: &BlockDescriptor) -> Option<(usize, &Rule)> {
        self.rules.iter().enumerate().find(|(_, r)| r.matches(block))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(block_type: impl Into<BlockTypeId>, subtype: &str, size: SizeClass) -> BlockDescriptor {
        BlockDescriptor::new(block_type, subtype, size)
    }

    #[test]
    fn test_specific_rule_before_generic() {
        let table = RuleTable::new(vec![
            Rule::require(BlockType::Thrust, "Frame")
                .with_subtype("Atmospheric")
                .with_quantity(1),
            Rule::require(BlockType::Thrust, "Frame").with_quantity(1),
        ]);
        let b = block(BlockType::Thrust, "AtmosphericLarge", SizeClass::Large);
        let (idx, rule) = table.find_match_index(&b).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(rule.subtype.as_deref(), Some("Atmospheric"));

        let ion = block(BlockType::Thrust, "LargeBlockLargeThrust", SizeClass::Large);
        assert_eq!(table.find_match_index(&ion).unwrap().0, 1);
    }

    #[test]
    fn test_subtype_match_is_case_insensitive() {
        let rule = Rule::require(BlockType::Thrust, "Frame").with_subtype("HYDROGEN");
        assert!(rule.matches(&block(BlockType::Thrust, "SmallBlockSmallHydrogenThrust", SizeClass::Small)));
        assert!(!rule.matches(&block(BlockType::Thrust, "SmallBlockSmallThrust", SizeClass::Small)));
    }

    #[test]
    fn test_empty_subtype_matches_everything() {
        let rule = Rule::allow(BlockType::CubeBlock).with_subtype("");
        assert!(rule.matches(&block(BlockType::CubeBlock, "Armor", SizeClass::Small)));
    }

    #[test]
    fn test_type_must_match() {
        let rule = Rule::allow(BlockType::CubeBlock);
        assert!(!rule.matches(&block(BlockType::Gyro, "LargeBlockGyro", SizeClass::Large)));
    }

    #[test]
    fn test_string_rule_matches_known_and_unknown_types() {
        let known = Rule::exempt("CubeBlock", Some("BlockSubtype"));
        assert!(known.matches(&block(BlockType::CubeBlock, "MyBlockSubtypeA", SizeClass::Small)));

        let modded = Rule::exempt("MyObjectBuilder_ModdedShield", None);
        assert_eq!(modded.block_type, RuleType::ByString("ModdedShield".into()));
        assert!(modded.matches(&block(BlockTypeId::from_name("ModdedShield"), "Any", SizeClass::Large)));
        assert!(!modded.matches(&block(BlockType::CubeBlock, "Any", SizeClass::Large)));
    }

    #[test]
    fn test_no_match_returns_none() {
        let table = RuleTable::new(vec![Rule::allow(BlockType::CubeBlock)]);
        assert!(table
            .find_match(&block(BlockType::Reactor, "LargeBlockSmallGenerator", SizeClass::Large))
            .is_none());
    }

    #[test]
    fn test_overrides_go_first() {
        let table = RuleTable::with_overrides(
            vec![Rule::exempt("Thrust", None)],
            vec![Rule::require(BlockType::Thrust, "Frame")],
        );
        let rule = table
            .find_match(&block(BlockType::Thrust, "LargeBlockLargeThrust", SizeClass::Large))
            .unwrap();
        assert!(!rule.is_restricted());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_placeholder_count() {
        let rule = Rule::require(BlockType::Thrust, "Frame").with_quantity(2);
        assert_eq!(rule.placeholder_count(SizeClass::Small, 5), 2);
        assert_eq!(rule.placeholder_count(SizeClass::Large, 5), 10);

        let rule = rule.with_large_quantity(7);
        assert_eq!(rule.placeholder_count(SizeClass::Large, 5), 7);
        assert_eq!(rule.placeholder_count(SizeClass::Large, 100), 7);

        let bare = Rule::require(BlockType::Thrust, "Frame");
        assert_eq!(bare.placeholder_count(SizeClass::Small, 5), 1);
        assert_eq!(bare.placeholder_count(SizeClass::Large, 5), 5);
    }

    #[test]
    fn test_zero_quantity_treated_as_unset() {
        let rule = Rule::require(BlockType::Thrust, "Frame")
            .with_quantity(0)
            .with_large_quantity(0);
        assert_eq!(rule.placeholder_count(SizeClass::Small, 5), 1);
        assert_eq!(rule.placeholder_count(SizeClass::Large, 5), 5);
    }

    #[test]
    fn test_display() {
        let rule = Rule::require(BlockType::Thrust, "ScrapConstructionFrame").with_subtype("Atmospheric");
        assert_eq!(rule.to_string(), "Thrust/Atmospheric -> ScrapConstructionFrame");
        assert_eq!(Rule::allow(BlockType::Gyro).to_string(), "Gyro -> free");
    }

    proptest! {
        #[test]
        fn prop_earlier_matching_rule_wins(
            subtype in "[A-Za-z]{0,12}",
            prefix_len in 0usize..12,
            filler in 0usize..6,
        ) {
            let needle: String = subtype.chars().take(prefix_len).collect();
            let first = Rule::require(BlockType::Thrust, "First").with_subtype(needle);
            let second = Rule::require(BlockType::Thrust, "Second");

            let mut rules: Vec<Rule> = (0..filler)
                .map(|_| Rule::allow(BlockType::Gyro))
                .collect();
            let first_index = rules.len();
            rules.push(first);
            rules.push(second);

            let table = RuleTable::new(rules);
            let b = block(BlockType::Thrust, &subtype, SizeClass::Small);
            let (idx, rule) = table.find_match_index(&b).unwrap();
            prop_assert_eq!(idx, first_index);
            prop_assert_eq!(rule.required.as_deref(), Some("First"));
        }
    }
}
