//! Scrapyard Headless Restriction Harness
//!
//! Plays the game host for the build-restriction logic: loads a JSON block
//! catalogue, loads world settings, runs the restriction pass and checks the
//! result. Runs entirely in-process — no game, no networking, no rendering.
//!
//! Usage:
//!   cargo run -p scrapyard-simtest
//!   cargo run -p scrapyard-simtest -- --verbose
//!   cargo run -p scrapyard-simtest -- --world ./my-world --catalogue blocks.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use scrapyard_logic::blocks::{
    BlockDescriptor, BlockType, BlockTypeId, ComponentDefinition, ComponentEntry, ComponentHandle,
    DefinitionId, DerivedAttributes, ItemDefinition, ItemHandle, SizeClass,
};
use scrapyard_logic::builtin::builtin_rules;
use scrapyard_logic::integrity::recalculate;
use scrapyard_logic::restrictions::{DefinitionCatalogue, Outcome, RestrictionConfig};
use scrapyard_logic::rules::RuleType;
use scrapyard_logic::session::BuildRestrictionsSession;
use scrapyard_logic::settings::{
    load_settings, FsWorldStorage, MemoryVariables, SessionRole, Settings,
};
use serde::Deserialize;

// ── Block catalogue (vanilla-like sample data) ──────────────────────────
const CATALOGUE_JSON: &str = include_str!("../../../data/block_catalogue.json");

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    components: Vec<ComponentSpec>,
    items: Vec<ItemDefinition>,
    blocks: Vec<BlockSpec>,
}

#[derive(Debug, Deserialize)]
struct ComponentSpec {
    subtype: String,
    mass: f32,
    max_integrity: f32,
}

#[derive(Debug, Deserialize)]
struct BlockSpec {
    type_id: BlockTypeId,
    subtype: String,
    size: SizeClass,
    /// (component subtype, count) in build order.
    components: Vec<(String, u32)>,
    critical_group_index: usize,
    build_time_seconds: f32,
    #[serde(default = "unit_ratio")]
    max_integrity_ratio: f32,
    #[serde(default = "unit_ratio")]
    deformation_ratio: f32,
}

fn unit_ratio() -> f32 {
    1.0
}

/// In-memory stand-in for the host's definition manager.
struct JsonHost {
    components: HashMap<String, ComponentHandle>,
    items: HashMap<DefinitionId, ItemHandle>,
}

impl JsonHost {
    fn new(file: &CatalogueFile) -> Self {
        let mut components = HashMap::new();
        let mut items = HashMap::new();
        for spec in &file.components {
            let definition =
                ComponentDefinition::new(spec.subtype.clone(), spec.mass, spec.max_integrity);
            items.insert(definition.id.clone(), Arc::new(definition.as_item()));
            components.insert(spec.subtype.clone(), Arc::new(definition));
        }
        for item in &file.items {
            items.insert(item.id.clone(), Arc::new(item.clone()));
        }
        Self { components, items }
    }

    /// Build a block definition the way the host does at load time.
    fn describe(&self, spec: &BlockSpec) -> Result<BlockDescriptor, String> {
        let mut block =
            BlockDescriptor::new(spec.type_id.clone(), spec.subtype.clone(), spec.size);
        for (subtype, count) in &spec.components {
            let definition = self
                .component(subtype)
                .ok_or_else(|| format!("{}: unknown component {}", block.id(), subtype))?;
            block.components.push(ComponentEntry::new(definition, *count));
        }

        // Seed so the derived rate reproduces the requested weld time.
        let seed = DerivedAttributes {
            max_integrity: spec.build_time_seconds,
            integrity_accrual_rate: 1.0,
            critical_group_index: spec.critical_group_index,
            ..DerivedAttributes::default()
        };
        block.attributes = recalculate(&seed, &block.components);
        block.attributes.max_integrity_ratio = spec.max_integrity_ratio;
        block.attributes.deformation_ratio = spec.deformation_ratio;
        Ok(block)
    }
}

impl DefinitionCatalogue for JsonHost {
    fn component(&self, subtype: &str) -> Option<ComponentHandle> {
        self.components.get(subtype).cloned()
    }

    fn item(&self, id: &DefinitionId) -> Option<ItemHandle> {
        self.items.get(id).cloned()
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    world: PathBuf,
    catalogue: Option<PathBuf>,
}

fn parse_args() -> Options {
    let mut opts = Options {
        verbose: false,
        world: std::env::temp_dir().join("scrapyard-simtest-world"),
        catalogue: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" | "-v" => opts.verbose = true,
            "--world" => {
                if let Some(dir) = args.next() {
                    opts.world = PathBuf::from(dir);
                }
            }
            "--catalogue" => opts.catalogue = args.next().map(PathBuf::from),
            other => log::warn!("ignoring unknown argument {}", other),
        }
    }
    opts
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose" || a == "-v");
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    let opts = parse_args();

    println!("=== Scrapyard Build Restriction Harness ===\n");

    let json = match &opts.catalogue {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                log::error!("cannot read {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => CATALOGUE_JSON.to_string(),
    };

    let mut results = Vec::new();

    // 1. Catalogue
    let Some((host, blocks)) = validate_catalogue(&json, &mut results) else {
        report(&results, opts.verbose);
        std::process::exit(1);
    };

    // 2. Built-in rule table
    results.extend(validate_rule_table(opts.verbose));

    // 3. Settings
    let settings = validate_settings(&opts, &mut results);

    // 4. Restriction pass + restore
    results.extend(validate_restriction_pass(&host, &blocks, settings, opts.verbose));

    report(&results, opts.verbose);
}

fn report(results: &[TestResult], verbose: bool) {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Catalogue ────────────────────────────────────────────────────────

fn validate_catalogue(
    json: &str,
    results: &mut Vec<TestResult>,
) -> Option<(JsonHost, Vec<BlockDescriptor>)> {
    println!("--- Block Catalogue ---");

    let file: CatalogueFile = match serde_json::from_str(json) {
        Ok(f) => f,
        Err(e) => {
            results.push(TestResult {
                name: "catalogue_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return None;
        }
    };

    results.push(TestResult {
        name: "catalogue_not_empty".into(),
        passed: !file.blocks.is_empty() && !file.components.is_empty(),
        detail: format!(
            "{} components, {} items, {} blocks",
            file.components.len(),
            file.items.len(),
            file.blocks.len()
        ),
    });

    let bad_integrity: Vec<_> = file
        .components
        .iter()
        .filter(|c| c.max_integrity <= 0.0)
        .map(|c| c.subtype.as_str())
        .collect();
    results.push(TestResult {
        name: "catalogue_positive_integrity".into(),
        passed: bad_integrity.is_empty(),
        detail: if bad_integrity.is_empty() {
            "all components carry integrity".into()
        } else {
            format!("zero integrity: {}", bad_integrity.join(", "))
        },
    });

    let host = JsonHost::new(&file);
    let config = RestrictionConfig::default();
    let has_placeholder = host.component(&config.default_placeholder).is_some();
    let has_scrap = host.item(&config.deconstruct_item).is_some();
    results.push(TestResult {
        name: "catalogue_global_dependencies".into(),
        passed: has_placeholder && has_scrap,
        detail: format!(
            "{}={} {}={}",
            config.default_placeholder, has_placeholder, config.deconstruct_item, has_scrap
        ),
    });

    let mut blocks = Vec::new();
    let mut errors = Vec::new();
    for spec in &file.blocks {
        match host.describe(spec) {
            Ok(b) => blocks.push(b),
            Err(e) => errors.push(e),
        }
    }
    results.push(TestResult {
        name: "catalogue_blocks_resolve".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!("{} block definitions built", blocks.len())
        } else {
            errors.join("; ")
        },
    });

    Some((host, blocks))
}

// ── 2. Rule Table ───────────────────────────────────────────────────────

fn validate_rule_table(verbose: bool) -> Vec<TestResult> {
    println!("--- Built-in Rules ---");
    let mut results = Vec::new();
    let rules = builtin_rules();

    let uncovered: Vec<_> = BlockType::all()
        .iter()
        .filter(|t| {
            !rules
                .iter()
                .any(|r| r.block_type == RuleType::ByHandle(**t))
        })
        .map(|t| t.name())
        .collect();
    results.push(TestResult {
        name: "rules_cover_known_types".into(),
        passed: uncovered.is_empty(),
        detail: if uncovered.is_empty() {
            format!("{} rules cover {} block types", rules.len(), BlockType::all().len())
        } else {
            format!("no rule for: {}", uncovered.join(", "))
        },
    });

    // A catch-all rule must never shadow a later subtype rule of the same type.
    let mut shadowed = Vec::new();
    for (i, later) in rules.iter().enumerate() {
        if later.subtype.is_none() {
            continue;
        }
        if rules[..i]
            .iter()
            .any(|earlier| earlier.block_type == later.block_type && earlier.subtype.is_none())
        {
            shadowed.push(later.to_string());
        }
    }
    results.push(TestResult {
        name: "rules_specific_before_generic".into(),
        passed: shadowed.is_empty(),
        detail: if shadowed.is_empty() {
            "no subtype rule is shadowed".into()
        } else {
            format!("shadowed: {}", shadowed.join(", "))
        },
    });

    if verbose {
        let restricted = rules.iter().filter(|r| r.is_restricted()).count();
        println!(
            "  {} free, {} restricted",
            rules.len() - restricted,
            restricted
        );
    }

    results
}

// ── 3. Settings ─────────────────────────────────────────────────────────

fn validate_settings(opts: &Options, results: &mut Vec<TestResult>) -> Settings {
    println!("--- World Settings ---");
    let storage = FsWorldStorage::new(&opts.world);
    let mut shared = MemoryVariables::default();

    let authority = load_settings(SessionRole::Authority, &storage, &mut shared);
    results.push(TestResult {
        name: "settings_authority_load".into(),
        passed: true,
        detail: format!(
            "{} exemption(s) from {}",
            authority.exemption_patterns.len(),
            storage.root().display()
        ),
    });

    let participant = load_settings(SessionRole::Participant, &storage, &mut shared);
    results.push(TestResult {
        name: "settings_shared_mirror".into(),
        passed: participant == authority,
        detail: "participant sees the authority's settings".into(),
    });

    let valid = authority.exemption_rules().len();
    results.push(TestResult {
        name: "settings_exemptions_parse".into(),
        passed: valid == authority.exemption_patterns.len(),
        detail: format!(
            "{}/{} exemption patterns valid",
            valid,
            authority.exemption_patterns.len()
        ),
    });

    authority
}

// ── 4. Restriction Pass ─────────────────────────────────────────────────

fn validate_restriction_pass(
    host: &JsonHost,
    original: &[BlockDescriptor],
    settings: Settings,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Restriction Pass ---");
    let mut results = Vec::new();
    let mut session = BuildRestrictionsSession::new(settings);
    let mut blocks = original.to_vec();

    let report = match session.load_data(host, &mut blocks) {
        Ok(r) => r,
        Err(e) => {
            results.push(TestResult {
                name: "pass_completes".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "pass_counts_add_up".into(),
        passed: report.free_to_build + report.restricted + report.unmatched + report.skipped.len()
            == report.total
            && report.total == original.len(),
        detail: format!(
            "{} total: free={} restricted={} unmatched={} skipped={}",
            report.total,
            report.free_to_build,
            report.restricted,
            report.unmatched,
            report.skipped.len()
        ),
    });

    let placeholder = &session.config().default_placeholder;
    let mut misplaced = Vec::new();
    let mut drifted = Vec::new();
    let mut out_of_range = Vec::new();

    for ((before, after), outcome) in original.iter().zip(&blocks).zip(&report.outcomes) {
        let name = after.id().to_string();
        let shift = after.components.len() - before.components.len();

        let placeholder_ok = match outcome {
            Outcome::Unmatched { count } => {
                shift == 1
                    && after.components[0].definition.id.subtype == *placeholder
                    && after.components[0].count == *count
            }
            Outcome::Restricted { component, count } => {
                shift == 1
                    && after.components[0].definition.id.subtype == *component
                    && after.components[0].count == *count
            }
            Outcome::FreeToBuild | Outcome::Skipped { .. } => after == before,
        };
        if !placeholder_ok {
            misplaced.push(name.clone());
        }

        let before_time = before.attributes.max_integrity / before.attributes.integrity_accrual_rate;
        let after_time = after.attributes.max_integrity / after.attributes.integrity_accrual_rate;
        if ((after_time - before_time) / before_time).abs() > 1e-4
            || after.attributes.critical_group_index
                != before.attributes.critical_group_index + shift
        {
            drifted.push(name.clone());
        }

        let a = &after.attributes;
        if !(0.0..=1.0).contains(&a.critical_integrity_ratio)
            || !(0.0..=1.0).contains(&a.ownership_integrity_ratio)
        {
            out_of_range.push(name.clone());
        }

        if verbose {
            println!(
                "    {:48} {:?} mass {:.1} -> {:.1}, integrity {:.0} -> {:.0}",
                name,
                outcome,
                before.attributes.mass,
                a.mass,
                before.attributes.max_integrity,
                a.max_integrity
            );
        }
    }

    results.push(TestResult {
        name: "pass_placeholder_first".into(),
        passed: misplaced.is_empty(),
        detail: if misplaced.is_empty() {
            "placeholders prepended exactly where expected".into()
        } else {
            format!("wrong build list: {}", misplaced.join(", "))
        },
    });
    results.push(TestResult {
        name: "pass_build_time_preserved".into(),
        passed: drifted.is_empty(),
        detail: if drifted.is_empty() {
            "weld time and critical component unchanged".into()
        } else {
            format!("drifted: {}", drifted.join(", "))
        },
    });
    results.push(TestResult {
        name: "pass_ratios_in_range".into(),
        passed: out_of_range.is_empty(),
        detail: if out_of_range.is_empty() {
            "critical/ownership ratios within [0, 1]".into()
        } else {
            format!("out of range: {}", out_of_range.join(", "))
        },
    });

    let restored = session.unload_data(&mut blocks);
    results.push(TestResult {
        name: "unload_restores_definitions".into(),
        passed: blocks.as_slice() == original,
        detail: format!("{} block(s) restored", restored),
    });

    results
}
