//! Block definition data model — block kinds, component lists, derived attributes.
//!
//! These are plain-data mirrors of the host's cube block definitions. The host
//! owns the real records; the restriction pass only touches `components` and
//! `attributes` on a [`BlockDescriptor`] and hands the mutation back.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Prefix the host puts in front of every object builder type name.
pub const TYPE_PREFIX: &str = "MyObjectBuilder_";

/// Subtype of the component that makes a block claimable once welded in.
pub const OWNERSHIP_COMPONENT: &str = "Computer";

/// Type name used for component definitions.
pub const COMPONENT_TYPE: &str = "Component";

macro_rules! block_types {
    ($($variant:ident),+ $(,)?) => {
        /// Known cube block kinds, in handle form.
        ///
        /// Variant names match the host type names without the
        /// `MyObjectBuilder_` prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum BlockType {
            $($variant,)+
        }

        impl BlockType {
            pub fn all() -> &'static [BlockType] {
                &[$(Self::$variant,)+]
            }

            /// Type name without the host prefix.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }
    };
}

block_types! {
    // Structural and decorative
    CubeBlock,
    InteriorLight,
    ReflectorLight,
    EmissiveBlock,
    Searchlight,
    Ladder2,
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
    // Control and access
    Cockpit,
    RemoteControl,
    Door,
    AirtightHangarDoor,
    AirtightSlideDoor,
    ButtonPanel,
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
    SensorBlock,
    CameraBlock,
    SoundBlock,
    // Automation
    MyProgrammableBlock,
    TimerBlock,
    EventControllerBlock,
    TurretControlBlock,
    Projector,
    BasicMissionBlock,
    FlightMovementBlock,
    PathRecorderBlock,
    DefensiveCombatBlock,
    OffensiveCombatBlock,
    EmotionControllerBlock,
    // Communication
    Beacon,
    RadioAntenna,
    LaserAntenna,
    BroadcastController,
    TransponderBlock,
    // Logistics and tools
    CargoContainer,
    ConveyorSorter,
    Collector,
    Parachute,
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
    // Gas and life support
    OxygenTank,
    OxygenGenerator,
    OxygenFarm,
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
    // Propulsion and misc
    Thrust,
    VendingMachine,
    StoreBlock,
    ContractBlock,
    SafeZoneBlock,
    JumpDrive,
}

impl BlockType {
    /// Look up a block kind by type name, with or without the host prefix.
    pub fn from_name(name: &str) -> Option<BlockType> {
        let bare = strip_type_prefix(name);
        Self::all().iter().copied().find(|t| t.name() == bare)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Remove the host's object builder prefix from a type name, if present.
pub fn strip_type_prefix(name: &str) -> &str {
    name.strip_prefix(TYPE_PREFIX).unwrap_or(name)
}

/// Coarse category of a block definition as the host reports it.
///
/// Mods can register block types this crate has never heard of; those keep
/// their type name so string rules can still target them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockTypeId {
    Known(BlockType),
    Unknown(String),
}

impl BlockTypeId {
    pub fn from_name(name: &str) -> Self {
        match BlockType::from_name(name) {
            Some(t) => Self::Known(t),
            None => Self::Unknown(strip_type_prefix(name).to_string()),
        }
    }

    /// Type name without the host prefix.
    pub fn name(&self) -> &str {
        match self {
            Self::Known(t) => t.name(),
            Self::Unknown(name) => name,
        }
    }

    pub fn handle(&self) -> Option<BlockType> {
        match self {
            Self::Known(t) => Some(*t),
            Self::Unknown(_) => None,
        }
    }
}

impl From<BlockType> for BlockTypeId {
    fn from(t: BlockType) -> Self {
        Self::Known(t)
    }
}

impl From<String> for BlockTypeId {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<BlockTypeId> for String {
    fn from(id: BlockTypeId) -> Self {
        id.name().to_string()
    }
}

impl fmt::Display for BlockTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully qualified definition id: host type name plus subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId {
    pub type_name: String,
    pub subtype: String,
}

impl DefinitionId {
    pub fn new(type_name: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            subtype: subtype.into(),
        }
    }

    /// Id of a component definition with the given subtype.
    pub fn component(subtype: impl Into<String>) -> Self {
        Self::new(COMPONENT_TYPE, subtype)
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.subtype)
    }
}

/// Grid size a block is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SizeClass {
    #[default]
    Small,
    Large,
}

/// A physical item that can sit in an inventory (ore, ingot, component).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: DefinitionId,
    /// Mass in kg per unit.
    pub mass: f32,
}

/// A component kind that blocks are welded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub id: DefinitionId,
    /// Mass in kg per unit.
    pub mass: f32,
    /// Integrity points contributed per unit.
    pub max_integrity: f32,
}

impl ComponentDefinition {
    pub fn new(subtype: impl Into<String>, mass: f32, max_integrity: f32) -> Self {
        Self {
            id: DefinitionId::component(subtype),
            mass,
            max_integrity,
        }
    }

    /// Whether welding this component in makes the block ownable.
    pub fn grants_ownership(&self) -> bool {
        self.id.subtype == OWNERSHIP_COMPONENT
    }

    /// The component viewed as an inventory item.
    pub fn as_item(&self) -> ItemDefinition {
        ItemDefinition {
            id: self.id.clone(),
            mass: self.mass,
        }
    }
}

/// Shared handle to a component definition owned by the host catalogue.
pub type ComponentHandle = Arc<ComponentDefinition>;

/// Shared handle to an item definition owned by the host catalogue.
pub type ItemHandle = Arc<ItemDefinition>;

/// One stage of a block's build list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEntry {
    pub definition: ComponentHandle,
    pub count: u32,
    /// What the grinder hands back when this stage is taken apart.
    pub deconstruct_item: ItemHandle,
}

impl ComponentEntry {
    /// Entry that deconstructs back into its own component.
    pub fn new(definition: ComponentHandle, count: u32) -> Self {
        let deconstruct_item = Arc::new(definition.as_item());
        Self {
            definition,
            count,
            deconstruct_item,
        }
    }

    pub fn with_deconstruct_item(mut self, item: ItemHandle) -> Self {
        self.deconstruct_item = item;
        self
    }
}

/// Physical values the host derives from a block's component list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedAttributes {
    pub mass: f32,
    pub max_integrity: f32,
    pub max_integrity_ratio: f32,
    pub deformation_ratio: f32,
    /// Integrity points gained per second of welding.
    pub integrity_accrual_rate: f32,
    pub critical_integrity_ratio: f32,
    pub ownership_integrity_ratio: f32,
    /// Index into the component list where the block becomes functional.
    pub critical_group_index: usize,
}

impl Default for DerivedAttributes {
    fn default() -> Self {
        Self {
            mass: 0.0,
            max_integrity: 0.0,
            max_integrity_ratio: 1.0,
            deformation_ratio: 1.0,
            integrity_accrual_rate: 0.0,
            critical_integrity_ratio: 0.0,
            ownership_integrity_ratio: 0.0,
            critical_group_index: 0,
        }
    }
}

/// A cube block definition as seen by the restriction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDescriptor {
    pub block_type: BlockTypeId,
    pub subtype: String,
    pub size: SizeClass,
    pub components: Vec<ComponentEntry>,
    pub attributes: DerivedAttributes,
}

impl BlockDescriptor {
    pub fn new(block_type: impl Into<BlockTypeId>, subtype: impl Into<String>, size: SizeClass) -> Self {
        Self {
            block_type: block_type.into(),
            subtype: subtype.into(),
            size,
            components: Vec::new(),
            attributes: DerivedAttributes::default(),
        }
    }

    pub fn id(&self) -> DefinitionId {
        DefinitionId::new(self.block_type.name(), self.subtype.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_names_round_trip() {
        for t in BlockType::all() {
            assert_eq!(BlockType::from_name(t.name()), Some(*t));
        }
    }

    #[test]
    fn test_from_name_accepts_host_prefix() {
        assert_eq!(
            BlockType::from_name("MyObjectBuilder_Thrust"),
            Some(BlockType::Thrust)
        );
        assert_eq!(BlockType::from_name("Thrust"), Some(BlockType::Thrust));
        assert_eq!(BlockType::from_name("thrust"), None);
    }

    #[test]
    fn test_unknown_type_keeps_bare_name() {
        let id = BlockTypeId::from_name("MyObjectBuilder_ModdedShield");
        assert_eq!(id, BlockTypeId::Unknown("ModdedShield".into()));
        assert_eq!(id.name(), "ModdedShield");
        assert_eq!(id.handle(), None);
    }

    #[test]
    fn test_block_type_id_serde_as_string() {
        let id: BlockTypeId = serde_json::from_str("\"MyObjectBuilder_Gyro\"").unwrap();
        assert_eq!(id, BlockTypeId::Known(BlockType::Gyro));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Gyro\"");
    }

    #[test]
    fn test_ownership_component() {
        assert!(ComponentDefinition::new("Computer", 0.2, 2.0).grants_ownership());
        assert!(!ComponentDefinition::new("SteelPlate", 20.0, 24.0).grants_ownership());
    }

    #[test]
    fn test_entry_deconstructs_to_itself_by_default() {
        let plate = Arc::new(ComponentDefinition::new("SteelPlate", 20.0, 24.0));
        let entry = ComponentEntry::new(plate.clone(), 3);
        assert_eq!(entry.deconstruct_item.id, plate.id);
    }

    #[test]
    fn test_descriptor_id_display() {
        let block = BlockDescriptor::new(BlockType::Thrust, "LargeBlockLargeAtmosphericThrust", SizeClass::Large);
        assert_eq!(block.id().to_string(), "Thrust/LargeBlockLargeAtmosphericThrust");
    }
}
