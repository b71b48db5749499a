#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the battle map editor.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative scene, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then reports [`Event`] values describing what
//! changed. Systems read immutable views of the scene and respond with new
//! command batches. [`SceneSnapshot`] is the owned, serializable capture of
//! every editable field and is shared by undo/redo, persistence and peer
//! replication.

use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod wire;

/// Default number of map columns for a fresh scene.
pub const DEFAULT_MAP_WIDTH: u32 = 25;
/// Default number of map rows for a fresh scene.
pub const DEFAULT_MAP_HEIGHT: u32 = 20;
/// Default number of feet represented by a single grid cell.
pub const DEFAULT_GRID_SCALE: u32 = 5;

/// Commands that express all permissible scene mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replaces the map dimensions, grid scale and distance rule.
    ConfigureMap {
        /// Configuration the scene should adopt.
        config: MapConfig,
    },
    /// Inserts a new character token into the scene.
    AddCharacter {
        /// Fully described character to insert.
        character: Character,
    },
    /// Relocates a character token to the provided cell.
    MoveCharacter {
        /// Identifier of the character being moved.
        id: CharacterId,
        /// Destination cell.
        to: CellCoord,
    },
    /// Removes every listed character from the scene.
    RemoveCharacters {
        /// Identifiers of the characters to remove.
        ids: Vec<CharacterId>,
    },
    /// Overwrites a player's current hit points.
    SetHitPoints {
        /// Identifier of the player character.
        id: CharacterId,
        /// New hit point value; negative values clamp to zero.
        hp: i64,
    },
    /// Applies damage (negative delta) or healing (positive delta) to a player.
    AdjustHitPoints {
        /// Identifier of the player character.
        id: CharacterId,
        /// Signed change to apply to the current hit points.
        delta: i64,
    },
    /// Adjusts the damage accumulator carried by a non-player character.
    AdjustDamage {
        /// Identifier of the non-player character.
        id: CharacterId,
        /// Signed change to apply to the damage taken so far.
        delta: i64,
    },
    /// Overwrites a character's initiative value.
    SetInitiative {
        /// Identifier of the character.
        id: CharacterId,
        /// Raw initiative value before capping.
        value: i32,
    },
    /// Stores a rolled initiative result together with its breakdown.
    RecordInitiativeRoll {
        /// Identifier of the character that rolled.
        id: CharacterId,
        /// Breakdown of the roll; the capped value becomes the initiative.
        roll: InitiativeRoll,
    },
    /// Places a terrain tile, evicting whatever tile occupied the cell.
    PlaceTerrain {
        /// Kind of terrain to paint.
        kind: TerrainKind,
        /// Cell receiving the tile.
        cell: CellCoord,
    },
    /// Removes the tile of the given kind from the cell, if present.
    EraseTerrain {
        /// Kind of terrain to erase.
        kind: TerrainKind,
        /// Cell to erase from.
        cell: CellCoord,
    },
    /// Removes a specific terrain tile.
    RemoveTerrain {
        /// Identifier of the tile to remove.
        id: TerrainId,
    },
    /// Removes every terrain tile from the scene.
    ClearTerrain,
    /// Records a completed distance measurement.
    AddMeasurement {
        /// Cell the measurement started from.
        start: CellCoord,
        /// Cell the measurement ended at.
        end: CellCoord,
        /// Distance between the cells in feet.
        distance: u32,
    },
    /// Deletes a single measurement.
    RemoveMeasurement {
        /// Identifier of the measurement to remove.
        id: MeasurementId,
    },
    /// Deletes every measurement.
    ClearMeasurements,
    /// Registers a user-defined terrain object.
    DefineCustomObject {
        /// Definition to register or replace.
        object: CustomObject,
    },
    /// Unregisters a custom object and removes every tile referencing it.
    RemoveCustomObject {
        /// Identifier of the definition to remove.
        id: ObjectId,
    },
    /// Switches the active editing tool.
    SelectTool {
        /// Tool that becomes active.
        tool: Tool,
    },
    /// Switches between sorted and hand-ordered initiative.
    SetInitiativeMode {
        /// Mode that becomes active.
        mode: InitiativeMode,
    },
    /// Moves a character one slot within the manual initiative order.
    ShiftInitiative {
        /// Identifier of the character being shifted.
        id: CharacterId,
        /// Direction of the shift.
        shift: OrderShift,
    },
    /// Passes the turn to the next combatant.
    AdvanceTurn,
    /// Returns the turn to the previous combatant.
    RewindTurn,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the map configuration changed.
    MapConfigured {
        /// Configuration now in effect.
        config: MapConfig,
    },
    /// Confirms that a character was inserted.
    CharacterAdded {
        /// Identifier of the new character.
        id: CharacterId,
    },
    /// Confirms that a character moved between two cells.
    CharacterMoved {
        /// Identifier of the moved character.
        id: CharacterId,
        /// Cell the character occupied before moving.
        from: CellCoord,
        /// Cell the character occupies after moving.
        to: CellCoord,
    },
    /// Confirms that characters were removed.
    CharactersRemoved {
        /// Identifiers that were actually removed.
        ids: Vec<CharacterId>,
    },
    /// Reports a player's new hit point total.
    HitPointsChanged {
        /// Identifier of the player.
        id: CharacterId,
        /// Hit points after the change.
        hp: u32,
    },
    /// Reports a non-player character's new damage total.
    DamageChanged {
        /// Identifier of the non-player character.
        id: CharacterId,
        /// Damage after the change.
        damage: u32,
    },
    /// Reports a character's new initiative value.
    InitiativeChanged {
        /// Identifier of the character.
        id: CharacterId,
        /// Initiative after capping.
        initiative: i32,
    },
    /// Reports that a command referenced a character that does not exist.
    CharacterMissing {
        /// Identifier that could not be resolved.
        id: CharacterId,
    },
    /// Reports that a health command targeted the wrong health channel.
    HealthChannelMismatch {
        /// Identifier of the character whose channel did not match.
        id: CharacterId,
    },
    /// Confirms that a terrain tile was placed.
    TerrainPlaced {
        /// Identifier assigned to the new tile.
        id: TerrainId,
        /// Kind of the new tile.
        kind: TerrainKind,
        /// Cell holding the new tile.
        cell: CellCoord,
        /// Tile that previously occupied the cell, if any.
        evicted: Option<TerrainId>,
    },
    /// Confirms that a terrain tile was removed.
    TerrainRemoved {
        /// Identifier of the removed tile.
        id: TerrainId,
    },
    /// Confirms that all terrain was cleared.
    TerrainCleared {
        /// Number of tiles that were removed.
        removed: usize,
    },
    /// Confirms that a measurement was recorded.
    MeasurementAdded {
        /// Identifier assigned to the measurement.
        id: MeasurementId,
        /// Distance in feet.
        distance: u32,
    },
    /// Confirms that a measurement was deleted.
    MeasurementRemoved {
        /// Identifier of the deleted measurement.
        id: MeasurementId,
    },
    /// Confirms that every measurement was deleted.
    MeasurementsCleared,
    /// Confirms that a custom object was registered.
    CustomObjectDefined {
        /// Identifier of the definition.
        id: ObjectId,
    },
    /// Reports that a custom object could not be registered.
    CustomObjectRejected {
        /// Identifier that was refused.
        id: ObjectId,
    },
    /// Confirms that a custom object definition was removed.
    CustomObjectRemoved {
        /// Identifier of the removed definition.
        id: ObjectId,
        /// Number of tiles removed alongside the definition.
        tiles_removed: usize,
    },
    /// Confirms that the active tool changed.
    ToolSelected {
        /// Tool now active.
        tool: Tool,
    },
    /// Confirms that the initiative mode changed.
    InitiativeModeChanged {
        /// Mode now active.
        mode: InitiativeMode,
    },
    /// Reports that the manual initiative order changed.
    InitiativeOrderChanged {
        /// Manual order after the change.
        order: Vec<CharacterId>,
    },
    /// Reports the current turn pointer after advancing or rewinding.
    TurnChanged {
        /// Index of the active combatant within the turn order.
        turn: u32,
        /// Current combat round, starting at one.
        round: u32,
    },
    /// Confirms that the live scene was overwritten from a snapshot.
    SceneRestored {
        /// Identifier of the snapshot that was restored.
        id: SnapshotId,
    },
}

impl Event {
    /// Reports whether the event changed state that guests replicate.
    #[must_use]
    pub fn replicates(&self) -> bool {
        !matches!(
            self,
            Event::CharacterMissing { .. }
                | Event::HealthChannelMismatch { .. }
                | Event::CustomObjectRejected { .. }
                | Event::ToolSelected { .. }
        )
    }
}

/// Location of a single square on the battle map.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    #[serde(rename = "x")]
    column: u32,
    #[serde(rename = "y")]
    row: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Absolute column and row offsets between two cells.
    #[must_use]
    pub const fn offset_to(&self, other: CellCoord) -> (u32, u32) {
        (
            self.column.abs_diff(other.column),
            self.row.abs_diff(other.row),
        )
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a fresh, collision-resistant identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wraps an existing identifier string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the textual identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

generated_id!(
    /// Unique identifier assigned to a character token.
    CharacterId
);
generated_id!(
    /// Unique identifier assigned to a terrain tile.
    TerrainId
);
generated_id!(
    /// Unique identifier assigned to a measurement.
    MeasurementId
);

/// Identifier of a custom object definition, derived from its label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wraps an existing object identifier without normalising it.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derives the identifier from a human readable label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self(slugify(label))
    }

    /// Borrows the textual identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercases the label and collapses every run of non-alphanumeric
/// characters into a single dash, trimming dashes at either end.
#[must_use]
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    for ch in label.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Identifier stamped onto every captured scene snapshot.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SnapshotId(u64);

impl SnapshotId {
    /// Creates a snapshot identifier from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw identifier value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly increasing snapshot identifiers for one host session.
#[derive(Clone, Debug)]
pub struct SnapshotSequence {
    next: u64,
}

impl SnapshotSequence {
    /// Seeds the sequence from the wall clock in milliseconds.
    #[must_use]
    pub fn from_clock() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX / 2))
            .unwrap_or_default();
        Self { next: millis }
    }

    /// Creates a sequence whose first identifier is `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Issues the next identifier.
    pub fn next_id(&mut self) -> SnapshotId {
        let id = SnapshotId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// Guarantees that every identifier issued afterwards exceeds `floor`.
    pub fn advance_past(&mut self, floor: SnapshotId) {
        if self.next <= floor.0 {
            self.next = floor.0.saturating_add(1);
        }
    }
}

/// Error returned when a textual tag does not name a known variant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{tag}`")]
pub struct UnknownTag {
    kind: &'static str,
    tag: String,
}

/// Rule used to convert grid offsets into feet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceRule {
    /// Every step, diagonal or not, costs one square.
    #[default]
    #[serde(rename = "5e")]
    FiveE,
    /// Diagonal steps alternate between one and two squares.
    #[serde(rename = "5105")]
    FiveTenFive,
    /// Straight-line distance rounded to the nearest foot.
    #[serde(rename = "euclidean")]
    Euclidean,
}

impl DistanceRule {
    /// Every supported rule in presentation order.
    pub const ALL: [DistanceRule; 3] = [
        DistanceRule::FiveE,
        DistanceRule::FiveTenFive,
        DistanceRule::Euclidean,
    ];

    /// Textual tag used on the wire and in configuration files.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            DistanceRule::FiveE => "5e",
            DistanceRule::FiveTenFive => "5105",
            DistanceRule::Euclidean => "euclidean",
        }
    }
}

impl FromStr for DistanceRule {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.tag() == value.trim())
            .ok_or_else(|| UnknownTag {
                kind: "distance rule",
                tag: value.to_owned(),
            })
    }
}

impl fmt::Display for DistanceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Editable map settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    /// Number of columns in the map.
    pub width: u32,
    /// Number of rows in the map.
    pub height: u32,
    /// Feet represented by one cell.
    pub grid_scale: u32,
    /// Rule applied to measurements and movement costs.
    pub distance_rule: DistanceRule,
}

impl MapConfig {
    /// Reports whether the cell lies inside the map.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Pins the cell onto the closest cell inside the map.
    #[must_use]
    pub fn clamp(&self, cell: CellCoord) -> CellCoord {
        CellCoord::new(
            cell.column().min(self.width.saturating_sub(1)),
            cell.row().min(self.height.saturating_sub(1)),
        )
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            grid_scale: DEFAULT_GRID_SCALE,
            distance_rule: DistanceRule::FiveE,
        }
    }
}

/// Terrain kinds that ship with the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinTerrain {
    /// Impassable wall.
    Wall,
    /// Door.
    Door,
    /// Difficult terrain that doubles movement cost.
    Difficult,
    /// Water.
    Water,
    /// Generic furniture.
    Furniture,
}

impl BuiltinTerrain {
    /// Every built-in terrain kind.
    pub const ALL: [BuiltinTerrain; 5] = [
        BuiltinTerrain::Wall,
        BuiltinTerrain::Door,
        BuiltinTerrain::Difficult,
        BuiltinTerrain::Water,
        BuiltinTerrain::Furniture,
    ];

    /// Reserved tag of the terrain kind.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            BuiltinTerrain::Wall => "wall",
            BuiltinTerrain::Door => "door",
            BuiltinTerrain::Difficult => "difficult",
            BuiltinTerrain::Water => "water",
            BuiltinTerrain::Furniture => "furniture",
        }
    }

    /// Resolves a reserved tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// Kind of a terrain tile: a built-in tag or a reference to a custom object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TerrainKind {
    /// One of the reserved terrain kinds.
    Builtin(BuiltinTerrain),
    /// A user-defined object.
    Custom(ObjectId),
}

impl TerrainKind {
    /// Convenience constructor for walls.
    pub const WALL: TerrainKind = TerrainKind::Builtin(BuiltinTerrain::Wall);
    /// Convenience constructor for difficult terrain.
    pub const DIFFICULT: TerrainKind = TerrainKind::Builtin(BuiltinTerrain::Difficult);

    /// Textual tag used on the wire.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            TerrainKind::Builtin(kind) => kind.tag(),
            TerrainKind::Custom(id) => id.as_str(),
        }
    }

    /// Reports whether the tile blocks movement.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        matches!(self, TerrainKind::Builtin(BuiltinTerrain::Wall))
    }

    /// Reports whether the tile doubles movement cost.
    #[must_use]
    pub const fn is_difficult(&self) -> bool {
        matches!(self, TerrainKind::Builtin(BuiltinTerrain::Difficult))
    }
}

impl From<String> for TerrainKind {
    fn from(tag: String) -> Self {
        match BuiltinTerrain::from_tag(&tag) {
            Some(kind) => TerrainKind::Builtin(kind),
            None => TerrainKind::Custom(ObjectId(tag)),
        }
    }
}

impl From<TerrainKind> for String {
    fn from(kind: TerrainKind) -> Self {
        match kind {
            TerrainKind::Builtin(kind) => kind.tag().to_owned(),
            TerrainKind::Custom(id) => id.0,
        }
    }
}

impl fmt::Display for TerrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Terrain painted onto a single cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainTile {
    /// Unique identifier of the tile.
    pub id: TerrainId,
    /// Kind of terrain.
    #[serde(rename = "type")]
    pub kind: TerrainKind,
    /// Cell covered by the tile.
    #[serde(flatten)]
    pub cell: CellCoord,
}

/// Non-player flavour used for styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcKind {
    /// Regular opponent.
    Standard,
    /// Boss opponent.
    Boss,
    /// Friendly non-player character.
    Ally,
}

/// Advantage state applied to an initiative roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollFlag {
    /// Highest of two dice.
    #[serde(rename = "adv")]
    Advantage,
    /// Lowest of two dice.
    #[serde(rename = "dis")]
    Disadvantage,
}

/// Breakdown of the most recent initiative roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRoll {
    /// Raw d20 result that was kept.
    pub die: u8,
    /// Modifier that was added.
    #[serde(rename = "mod")]
    pub modifier: i32,
    /// Die plus modifier before capping.
    pub total: i32,
    /// Total after capping.
    pub capped: i32,
    /// Advantage or disadvantage, when applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<RollFlag>,
}

/// Health view of a character: players track hit points, non-players track damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Health {
    /// Current and maximum hit points of a player.
    HitPoints {
        /// Current hit points.
        current: u32,
        /// Maximum hit points.
        max: u32,
    },
    /// Damage accumulated by a non-player character.
    Damage(u32),
}

/// A player or non-player token on the map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Unique identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Cell occupied by the token.
    #[serde(flatten)]
    pub position: CellCoord,
    /// Current hit points; unused for non-players.
    pub hp: u32,
    /// Maximum hit points; unused for non-players.
    pub max_hp: u32,
    /// Initiative value, capped at the initiative ceiling.
    pub initiative: i32,
    /// Modifier added to initiative rolls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_mod: Option<i32>,
    /// Whether the token belongs to a player.
    pub is_player: bool,
    /// Token colour.
    pub color: String,
    /// Armour class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ac: Option<u32>,
    /// Damage taken by a non-player character.
    #[serde(default)]
    pub damage: u32,
    /// Non-player flavour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_type: Option<NpcKind>,
    /// Damage resistances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resistances: Vec<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Breakdown of the last initiative roll.
    #[serde(
        default,
        rename = "lastInitRoll",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_roll: Option<InitiativeRoll>,
}

impl Character {
    /// Creates a player character at full health.
    #[must_use]
    pub fn player(name: impl Into<String>, position: CellCoord, max_hp: u32, color: &str) -> Self {
        Self {
            id: CharacterId::generate(),
            name: name.into(),
            position,
            hp: max_hp,
            max_hp,
            initiative: 0,
            initiative_mod: None,
            is_player: true,
            color: color.to_owned(),
            ac: None,
            damage: 0,
            npc_type: None,
            resistances: Vec::new(),
            notes: None,
            last_roll: None,
        }
    }

    /// Creates an undamaged non-player character.
    #[must_use]
    pub fn npc(name: impl Into<String>, position: CellCoord, color: &str) -> Self {
        Self {
            is_player: false,
            hp: 0,
            max_hp: 0,
            npc_type: Some(NpcKind::Standard),
            ..Self::player(name, position, 0, color)
        }
    }

    /// Health channel that applies to the character.
    #[must_use]
    pub const fn health(&self) -> Health {
        if self.is_player {
            Health::HitPoints {
                current: self.hp,
                max: self.max_hp,
            }
        } else {
            Health::Damage(self.damage)
        }
    }

    /// Hit points above the maximum, if the player was healed past it.
    #[must_use]
    pub const fn overheal(&self) -> u32 {
        if self.is_player {
            self.hp.saturating_sub(self.max_hp)
        } else {
            0
        }
    }
}

/// A completed distance measurement between two cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MeasurementRecord", into = "MeasurementRecord")]
pub struct Measurement {
    /// Unique identifier.
    pub id: MeasurementId,
    /// Cell the measurement started from.
    pub start: CellCoord,
    /// Cell the measurement ended at.
    pub end: CellCoord,
    /// Distance in feet.
    pub distance: u32,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementRecord {
    id: MeasurementId,
    start_x: u32,
    start_y: u32,
    end_x: u32,
    end_y: u32,
    distance: u32,
}

impl From<MeasurementRecord> for Measurement {
    fn from(record: MeasurementRecord) -> Self {
        Self {
            id: record.id,
            start: CellCoord::new(record.start_x, record.start_y),
            end: CellCoord::new(record.end_x, record.end_y),
            distance: record.distance,
        }
    }
}

impl From<Measurement> for MeasurementRecord {
    fn from(measurement: Measurement) -> Self {
        Self {
            id: measurement.id,
            start_x: measurement.start.column(),
            start_y: measurement.start.row(),
            end_x: measurement.end.column(),
            end_y: measurement.end.row(),
            distance: measurement.distance,
        }
    }
}

/// User-defined paintable object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomObject {
    /// Slug identifier referenced by terrain tiles.
    pub id: ObjectId,
    /// Human readable label.
    pub label: String,
    /// Short glyph drawn on the tile.
    pub icon: String,
    /// Fill colour.
    pub color: String,
    /// Optional emoji drawn instead of the icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl CustomObject {
    /// Creates a definition whose identifier is the slug of its label.
    #[must_use]
    pub fn new(label: &str, icon: &str, color: &str) -> Self {
        Self {
            id: ObjectId::from_label(label),
            label: label.trim().to_owned(),
            icon: icon.to_owned(),
            color: color.to_owned(),
            emoji: None,
        }
    }
}

/// Editing tool the host currently wields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tool {
    /// Select and drag tokens.
    #[default]
    Select,
    /// Measure distances.
    Measure,
    /// Paint the given terrain kind.
    Paint(TerrainKind),
}

impl From<String> for Tool {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "select" => Tool::Select,
            "measure" => Tool::Measure,
            _ => Tool::Paint(TerrainKind::from(tag)),
        }
    }
}

impl From<Tool> for String {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Select => "select".to_owned(),
            Tool::Measure => "measure".to_owned(),
            Tool::Paint(kind) => kind.into(),
        }
    }
}

/// How the turn order is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitiativeMode {
    /// Sorted by initiative, highest first.
    #[default]
    Auto,
    /// Explicit, hand-maintained ordering.
    Manual,
}

/// Direction of a manual initiative reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderShift {
    /// Towards the front of the order.
    Up,
    /// Towards the back of the order.
    Down,
}

/// Owned capture of every editable field of a scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    /// Character tokens.
    pub characters: Vec<Character>,
    /// Terrain tiles, at most one per cell.
    pub terrain: Vec<TerrainTile>,
    /// Completed measurements.
    pub measurements: Vec<Measurement>,
    /// Map columns.
    pub map_width: u32,
    /// Map rows.
    pub map_height: u32,
    /// Feet per cell.
    pub grid_scale: u32,
    /// Current combat round.
    pub round: u32,
    /// Index of the active combatant.
    pub current_turn: u32,
    /// Tool active when the snapshot was taken.
    pub selected_tool: Tool,
    /// Custom object definitions.
    pub custom_objects: Vec<CustomObject>,
    /// Identifier of the snapshot.
    pub id: SnapshotId,
    /// Distance rule in effect.
    #[serde(default)]
    pub distance_rule: DistanceRule,
    /// Initiative mode in effect.
    #[serde(default)]
    pub initiative_mode: InitiativeMode,
    /// Manual initiative order.
    #[serde(default)]
    pub initiative_order: Vec<CharacterId>,
}

impl SceneSnapshot {
    /// Map configuration recorded in the snapshot.
    #[must_use]
    pub const fn map_config(&self) -> MapConfig {
        MapConfig {
            width: self.map_width,
            height: self.map_height,
            grid_scale: self.grid_scale,
            distance_rule: self.distance_rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Treasure Chest!! "), "treasure-chest");
        assert_eq!(slugify("--Big__Tree--"), "big-tree");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn terrain_kind_parses_builtin_and_custom_tags() {
        assert_eq!(TerrainKind::from("wall".to_owned()), TerrainKind::WALL);
        assert_eq!(
            TerrainKind::from("chest".to_owned()),
            TerrainKind::Custom(ObjectId::new("chest"))
        );
        assert!(TerrainKind::WALL.is_wall());
        assert!(!TerrainKind::Custom(ObjectId::new("wall-ish")).is_wall());
    }

    #[test]
    fn tool_serializes_as_plain_tag() {
        let tool = Tool::Paint(TerrainKind::DIFFICULT);
        let json = serde_json::to_string(&tool).expect("tool serializes");
        assert_eq!(json, "\"difficult\"");
        let parsed: Tool = serde_json::from_str("\"measure\"").expect("tool parses");
        assert_eq!(parsed, Tool::Measure);
    }

    #[test]
    fn terrain_tile_uses_flat_coordinates() {
        let tile = TerrainTile {
            id: TerrainId::new("t1"),
            kind: TerrainKind::WALL,
            cell: CellCoord::new(3, 4),
        };
        let value = serde_json::to_value(&tile).expect("tile serializes");
        assert_eq!(
            value,
            serde_json::json!({ "id": "t1", "type": "wall", "x": 3, "y": 4 })
        );
    }

    #[test]
    fn measurement_uses_split_coordinates() {
        let json = r#"{"id":"m","startX":1,"startY":2,"endX":4,"endY":6,"distance":20}"#;
        let measurement: Measurement = serde_json::from_str(json).expect("measurement parses");
        assert_eq!(measurement.start, CellCoord::new(1, 2));
        assert_eq!(measurement.end, CellCoord::new(4, 6));
    }

    #[test]
    fn sequence_is_strictly_increasing() {
        let mut sequence = SnapshotSequence::starting_at(10);
        let first = sequence.next_id();
        let second = sequence.next_id();
        assert!(second > first, "identifiers must increase");

        sequence.advance_past(SnapshotId::new(100));
        assert_eq!(sequence.next_id(), SnapshotId::new(101));

        sequence.advance_past(SnapshotId::new(5));
        assert_eq!(sequence.next_id(), SnapshotId::new(102));
    }

    #[test]
    fn map_config_clamps_out_of_range_cells() {
        let config = MapConfig::default();
        assert_eq!(
            config.clamp(CellCoord::new(100, 3)),
            CellCoord::new(DEFAULT_MAP_WIDTH - 1, 3)
        );
        assert!(!config.contains(CellCoord::new(DEFAULT_MAP_WIDTH, 0)));
    }

    #[test]
    fn npc_reports_damage_channel() {
        let mut goblin = Character::npc("Goblin 1", CellCoord::new(0, 0), "#EF4444");
        goblin.damage = 7;
        assert_eq!(goblin.health(), Health::Damage(7));

        let mut hero = Character::player("Aria", CellCoord::new(1, 1), 31, "#F59E0B");
        hero.hp = 35;
        assert_eq!(hero.overheal(), 4);
    }
}
