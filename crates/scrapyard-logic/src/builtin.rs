//! Built-in build restrictions and session constants.
//!
//! The table is evaluated top to bottom. Blocks listed without a placeholder
//! can be built freely; blocks listed with one must be started from it. Any
//! block type missing from the table gets [`DEFAULT_PLACEHOLDER`].

use crate::blocks::BlockType::{self, *};
use crate::rules::Rule;

/// Placeholder component for restricted and unlisted blocks.
pub const DEFAULT_PLACEHOLDER: &str = "ScrapConstructionFrame";

/// Type name of the item a placeholder deconstructs into.
pub const DECONSTRUCT_ITEM_TYPE: &str = "Ore";

/// Subtype of the item a placeholder deconstructs into.
pub const DECONSTRUCT_ITEM_SUBTYPE: &str = "Scrap";

/// Placeholder multiplier for large grid blocks without an explicit large count.
pub const LARGE_GRID_MULTIPLIER: u32 = 5;

/// Block types that can be built without restriction, in table order.
const ALLOWED: &[BlockType] = &[
    // Armor, decorative and other function-less blocks
    CubeBlock,
    // Lighting
    InteriorLight,
    ReflectorLight,
    EmissiveBlock,
    Searchlight,
    Ladder2,
    // Conveyors and connector
    Conveyor,
    ConveyorConnector,
    ShipConnector,
    // Mechanical
    PistonBase,
    ExtendedPistonBase,
    PistonTop,
    MotorRotor,
    MotorStator,
    MotorAdvancedRotor,
    MotorAdvancedStator,
    MergeBlock,
    MotorSuspension,
    Wheel,
    LandingGear,
    Gyro,
    // Cockpits and remote control
    Cockpit,
    RemoteControl,
    // Doors and buttons
    Door,
    AirtightHangarDoor,
    AirtightSlideDoor,
    ButtonPanel,
    // Terminal blocks and LCDs
    TerminalBlock,
    LCDPanelsBlock,
    TextPanel,
    // Weapons
    LargeMissileTurret,
    LargeGatlingTurret,
    SmallMissileLauncher,
    SmallMissileLauncherReload,
    SmallGatlingGun,
    InteriorTurret,
    Warhead,
    Decoy,
    // Deco
    Kitchen,
    Planter,
    Jukebox,
    ExhaustBlock,
    HeatVentBlock,
    Passage,
    // Misc
    SensorBlock,
    CameraBlock,
    SoundBlock,
];

/// Block types that need the default placeholder, in table order.
const RESTRICTED_HEAD: &[BlockType] = &[
    // Programmable block, timers and automation
    MyProgrammableBlock,
    TimerBlock,
    EventControllerBlock,
    TurretControlBlock,
    Projector,
    // AI blocks
    BasicMissionBlock,
    FlightMovementBlock,
    PathRecorderBlock,
    DefensiveCombatBlock,
    OffensiveCombatBlock,
    EmotionControllerBlock,
    // Beacon and antennas
    Beacon,
    RadioAntenna,
    LaserAntenna,
    BroadcastController,
    TransponderBlock,
    // Cargo and conveyor additions
    CargoContainer,
    ConveyorSorter,
    Collector,
    Parachute,
    // Ship tools
    Drill,
    ShipGrinder,
    ShipWelder,
    OreDetector,
    AirVent,
    // Power
    SolarPanel,
    WindTurbine,
    Reactor,
    HydrogenEngine,
    BatteryBlock,
    // H2/O2
    OxygenTank,
    OxygenGenerator,
    OxygenFarm,
    // Cryo and medical
    CryoChamber,
    MedicalRoom,
    // Gravity
    GravityGenerator,
    GravityGeneratorSphere,
    VirtualMass,
    SpaceBall,
    // Production
    Assembler,
    Refinery,
    SurvivalKit,
    UpgradeModule,
];

/// Restricted block types that follow the thruster rules.
const RESTRICTED_TAIL: &[BlockType] = &[
    VendingMachine,
    StoreBlock,
    ContractBlock,
    SafeZoneBlock,
    JumpDrive,
];

/// The built-in rule table.
pub fn builtin_rules() -> Vec<Rule> {
    let mut rules: Vec<Rule> = ALLOWED.iter().map(|&t| Rule::allow(t)).collect();

    rules.extend(
        RESTRICTED_HEAD
            .iter()
            .map(|&t| Rule::require(t, DEFAULT_PLACEHOLDER)),
    );

    // Subtype rules have to precede the catch-all thruster rule (ion).
    rules.push(Rule::require(Thrust, DEFAULT_PLACEHOLDER).with_subtype("Atmospheric"));
    rules.push(Rule::require(Thrust, DEFAULT_PLACEHOLDER).with_subtype("Hydrogen"));
    rules.push(Rule::require(Thrust, DEFAULT_PLACEHOLDER));

    rules.extend(
        RESTRICTED_TAIL
            .iter()
            .map(|&t| Rule::require(t, DEFAULT_PLACEHOLDER)),
    );

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockDescriptor, SizeClass};
    use crate::rules::{RuleTable, RuleType};
    use std::collections::HashSet;

    #[test]
    fn test_every_known_type_is_covered() {
        let covered: HashSet<BlockType> = builtin_rules()
            .iter()
            .filter_map(|r| match r.block_type {
                RuleType::ByHandle(t) => Some(t),
                RuleType::ByString(_) => None,
            })
            .collect();
        for t in BlockType::all() {
            assert!(covered.contains(t), "{} has no built-in rule", t);
        }
    }

    #[test]
    fn test_generic_rules_listed_once() {
        let mut seen = HashSet::new();
        for rule in builtin_rules().iter().filter(|r| r.subtype.is_none()) {
            assert!(
                seen.insert(rule.block_type.clone()),
                "duplicate catch-all rule for {}",
                rule.block_type.name()
            );
        }
    }

    #[test]
    fn test_thruster_subtype_rules_precede_catch_all() {
        let rules = builtin_rules();
        let thrust: Vec<_> = rules
            .iter()
            .filter(|r| r.block_type == RuleType::ByHandle(Thrust))
            .collect();
        assert_eq!(thrust.len(), 3);
        assert_eq!(thrust[0].subtype.as_deref(), Some("Atmospheric"));
        assert_eq!(thrust[1].subtype.as_deref(), Some("Hydrogen"));
        assert_eq!(thrust[2].subtype, None);
    }

    #[test]
    fn test_armor_is_free_and_reactor_is_restricted() {
        let table = RuleTable::new(builtin_rules());
        let armor = BlockDescriptor::new(CubeBlock, "LargeBlockArmorBlock", SizeClass::Large);
        assert!(!table.find_match(&armor).unwrap().is_restricted());

        let reactor = BlockDescriptor::new(Reactor, "LargeBlockLargeGenerator", SizeClass::Large);
        let rule = table.find_match(&reactor).unwrap();
        assert_eq!(rule.required.as_deref(), Some(DEFAULT_PLACEHOLDER));
    }
}
