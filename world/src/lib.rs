#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative scene state for the battle map editor.

use battlemap_core::{
    BuiltinTerrain, Character, CharacterId, Command, CustomObject, Event, Health, InitiativeMode,
    MapConfig, Measurement, MeasurementId, SceneSnapshot, TerrainId, TerrainKind, TerrainTile,
    Tool,
};
use battlemap_system_initiative::{
    advance_turn, cap_initiative, reconcile_order, rewind_turn, shift_in_order,
    sorted_by_initiative, turn_order,
};

/// Represents the authoritative battle map scene.
#[derive(Clone, Debug)]
pub struct World {
    config: MapConfig,
    characters: Vec<Character>,
    terrain: Vec<TerrainTile>,
    measurements: Vec<Measurement>,
    custom_objects: Vec<CustomObject>,
    selected_tool: Tool,
    round: u32,
    current_turn: u32,
    initiative_mode: InitiativeMode,
    initiative_order: Vec<CharacterId>,
}

impl World {
    /// Creates an empty scene with the default map configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    /// Creates an empty scene using the provided map configuration.
    #[must_use]
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            config,
            characters: Vec::new(),
            terrain: Vec::new(),
            measurements: Vec::new(),
            custom_objects: Vec::new(),
            selected_tool: Tool::Select,
            round: 1,
            current_turn: 0,
            initiative_mode: InitiativeMode::Auto,
            initiative_order: Vec::new(),
        }
    }

    fn character_mut(&mut self, id: &CharacterId) -> Option<&mut Character> {
        self.characters
            .iter_mut()
            .find(|character| &character.id == id)
    }

    fn reconcile_initiative(&mut self, out_events: &mut Vec<Event>) {
        let ids: Vec<CharacterId> = self
            .characters
            .iter()
            .map(|character| character.id.clone())
            .collect();
        let order = reconcile_order(&self.initiative_order, &ids);
        if order != self.initiative_order {
            self.initiative_order = order;
            out_events.push(Event::InitiativeOrderChanged {
                order: self.initiative_order.clone(),
            });
        }
    }

    fn remove_terrain_where<F>(&mut self, predicate: F) -> Vec<TerrainId>
    where
        F: Fn(&TerrainTile) -> bool,
    {
        let mut removed = Vec::new();
        self.terrain.retain(|tile| {
            if predicate(tile) {
                removed.push(tile.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMap { config } => {
            world.config = config;
            out_events.push(Event::MapConfigured { config });
        }
        Command::AddCharacter { character } => {
            let id = character.id.clone();
            world.characters.push(character);
            out_events.push(Event::CharacterAdded { id });
            world.reconcile_initiative(out_events);
        }
        Command::MoveCharacter { id, to } => {
            let Some(character) = world.character_mut(&id) else {
                report_missing(id, out_events);
                return;
            };
            let from = character.position;
            if from == to {
                return;
            }
            character.position = to;
            out_events.push(Event::CharacterMoved { id, from, to });
        }
        Command::RemoveCharacters { ids } => {
            let mut removed = Vec::new();
            world.characters.retain(|character| {
                if ids.contains(&character.id) {
                    removed.push(character.id.clone());
                    false
                } else {
                    true
                }
            });
            if removed.is_empty() {
                return;
            }
            out_events.push(Event::CharactersRemoved { ids: removed });
            world.reconcile_initiative(out_events);
        }
        Command::SetHitPoints { id, hp } => {
            adjust_hit_points(world, id, out_events, |_| hp);
        }
        Command::AdjustHitPoints { id, delta } => {
            adjust_hit_points(world, id, out_events, |current| {
                current.saturating_add(delta)
            });
        }
        Command::AdjustDamage { id, delta } => {
            let Some(character) = world.character_mut(&id) else {
                report_missing(id, out_events);
                return;
            };
            let Health::Damage(current) = character.health() else {
                out_events.push(Event::HealthChannelMismatch { id });
                return;
            };
            character.damage = clamp_to_u32(i64::from(current).saturating_add(delta));
            out_events.push(Event::DamageChanged {
                id,
                damage: character.damage,
            });
        }
        Command::SetInitiative { id, value } => {
            let Some(character) = world.character_mut(&id) else {
                report_missing(id, out_events);
                return;
            };
            character.initiative = cap_initiative(value);
            out_events.push(Event::InitiativeChanged {
                id,
                initiative: character.initiative,
            });
        }
        Command::RecordInitiativeRoll { id, roll } => {
            let Some(character) = world.character_mut(&id) else {
                report_missing(id, out_events);
                return;
            };
            character.initiative = cap_initiative(roll.capped);
            character.last_roll = Some(roll);
            out_events.push(Event::InitiativeChanged {
                id,
                initiative: character.initiative,
            });
        }
        Command::PlaceTerrain { kind, cell } => {
            let evicted = world
                .remove_terrain_where(|tile| tile.cell == cell)
                .into_iter()
                .next();
            let id = TerrainId::generate();
            world.terrain.push(TerrainTile {
                id: id.clone(),
                kind: kind.clone(),
                cell,
            });
            out_events.push(Event::TerrainPlaced {
                id,
                kind,
                cell,
                evicted,
            });
        }
        Command::EraseTerrain { kind, cell } => {
            for id in world.remove_terrain_where(|tile| tile.cell == cell && tile.kind == kind) {
                out_events.push(Event::TerrainRemoved { id });
            }
        }
        Command::RemoveTerrain { id } => {
            for id in world.remove_terrain_where(|tile| tile.id == id) {
                out_events.push(Event::TerrainRemoved { id });
            }
        }
        Command::ClearTerrain => {
            let removed = world.terrain.len();
            world.terrain.clear();
            out_events.push(Event::TerrainCleared { removed });
        }
        Command::AddMeasurement {
            start,
            end,
            distance,
        } => {
            let id = MeasurementId::generate();
            world.measurements.push(Measurement {
                id: id.clone(),
                start,
                end,
                distance,
            });
            out_events.push(Event::MeasurementAdded { id, distance });
        }
        Command::RemoveMeasurement { id } => {
            let before = world.measurements.len();
            world.measurements.retain(|measurement| measurement.id != id);
            if world.measurements.len() != before {
                out_events.push(Event::MeasurementRemoved { id });
            }
        }
        Command::ClearMeasurements => {
            world.measurements.clear();
            out_events.push(Event::MeasurementsCleared);
        }
        Command::DefineCustomObject { object } => {
            let id = object.id.clone();
            if id.as_str().is_empty() || BuiltinTerrain::from_tag(id.as_str()).is_some() {
                tracing::debug!(object = %id, "refusing custom object that shadows a built-in");
                out_events.push(Event::CustomObjectRejected { id });
                return;
            }
            match world
                .custom_objects
                .iter_mut()
                .find(|existing| existing.id == id)
            {
                Some(existing) => *existing = object,
                None => world.custom_objects.push(object),
            }
            out_events.push(Event::CustomObjectDefined { id });
        }
        Command::RemoveCustomObject { id } => {
            let before = world.custom_objects.len();
            world.custom_objects.retain(|object| object.id != id);
            if world.custom_objects.len() == before {
                return;
            }
            let kind = TerrainKind::Custom(id.clone());
            let tiles_removed = world.remove_terrain_where(|tile| tile.kind == kind).len();
            if world.selected_tool == Tool::Paint(kind) {
                world.selected_tool = Tool::Select;
                out_events.push(Event::ToolSelected { tool: Tool::Select });
            }
            out_events.push(Event::CustomObjectRemoved { id, tiles_removed });
        }
        Command::SelectTool { tool } => {
            world.selected_tool = tool.clone();
            out_events.push(Event::ToolSelected { tool });
        }
        Command::SetInitiativeMode { mode } => {
            if world.initiative_mode == mode {
                return;
            }
            if mode == InitiativeMode::Manual {
                world.initiative_order = sorted_by_initiative(&world.characters);
                out_events.push(Event::InitiativeOrderChanged {
                    order: world.initiative_order.clone(),
                });
            }
            world.initiative_mode = mode;
            out_events.push(Event::InitiativeModeChanged { mode });
        }
        Command::ShiftInitiative { id, shift } => {
            if shift_in_order(&mut world.initiative_order, &id, shift) {
                out_events.push(Event::InitiativeOrderChanged {
                    order: world.initiative_order.clone(),
                });
            }
        }
        Command::AdvanceTurn => {
            let combatants = query::turn_order(world).len();
            let (turn, round) = advance_turn(world.current_turn, world.round, combatants);
            world.current_turn = turn;
            world.round = round;
            out_events.push(Event::TurnChanged { turn, round });
        }
        Command::RewindTurn => {
            world.current_turn = rewind_turn(world.current_turn);
            out_events.push(Event::TurnChanged {
                turn: world.current_turn,
                round: world.round,
            });
        }
    }
}

/// Overwrites every editable field of the world from an owned clone of the snapshot.
pub fn restore(world: &mut World, snapshot: &SceneSnapshot, out_events: &mut Vec<Event>) {
    let snapshot = snapshot.clone();
    world.config = snapshot.map_config();
    world.characters = snapshot.characters;
    world.terrain = snapshot.terrain;
    world.measurements = snapshot.measurements;
    world.custom_objects = snapshot.custom_objects;
    world.selected_tool = snapshot.selected_tool;
    world.round = snapshot.round;
    world.current_turn = snapshot.current_turn;
    world.initiative_mode = snapshot.initiative_mode;
    world.initiative_order = snapshot.initiative_order;
    world.reconcile_initiative(out_events);
    out_events.push(Event::SceneRestored { id: snapshot.id });
}

fn adjust_hit_points<F>(world: &mut World, id: CharacterId, out_events: &mut Vec<Event>, next: F)
where
    F: FnOnce(i64) -> i64,
{
    let Some(character) = world.character_mut(&id) else {
        report_missing(id, out_events);
        return;
    };
    let Health::HitPoints { current, .. } = character.health() else {
        out_events.push(Event::HealthChannelMismatch { id });
        return;
    };
    character.hp = clamp_to_u32(next(i64::from(current)));
    out_events.push(Event::HitPointsChanged {
        id,
        hp: character.hp,
    });
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn report_missing(id: CharacterId, out_events: &mut Vec<Event>) {
    tracing::debug!(character = %id, "command referenced an unknown character");
    out_events.push(Event::CharacterMissing { id });
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use battlemap_core::{
        CellCoord, Character, CharacterId, CustomObject, InitiativeMode, MapConfig, Measurement,
        SceneSnapshot, SnapshotId, TerrainTile, Tool,
    };

    /// Active map configuration.
    #[must_use]
    pub fn config(world: &World) -> MapConfig {
        world.config
    }

    /// Every character in insertion order.
    #[must_use]
    pub fn characters(world: &World) -> &[Character] {
        &world.characters
    }

    /// Looks up a character by identifier.
    #[must_use]
    pub fn character<'a>(world: &'a World, id: &CharacterId) -> Option<&'a Character> {
        world.characters.iter().find(|character| &character.id == id)
    }

    /// Every terrain tile.
    #[must_use]
    pub fn terrain(world: &World) -> &[TerrainTile] {
        &world.terrain
    }

    /// Tile occupying the cell, if any.
    #[must_use]
    pub fn terrain_at(world: &World, cell: CellCoord) -> Option<&TerrainTile> {
        world.terrain.iter().find(|tile| tile.cell == cell)
    }

    /// Every recorded measurement.
    #[must_use]
    pub fn measurements(world: &World) -> &[Measurement] {
        &world.measurements
    }

    /// Registered custom object definitions.
    #[must_use]
    pub fn custom_objects(world: &World) -> &[CustomObject] {
        &world.custom_objects
    }

    /// Tool that is currently active.
    #[must_use]
    pub fn selected_tool(world: &World) -> &Tool {
        &world.selected_tool
    }

    /// Current combat round.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.round
    }

    /// Index of the active combatant within [`turn_order`].
    #[must_use]
    pub fn current_turn(world: &World) -> u32 {
        world.current_turn
    }

    /// Active initiative mode.
    #[must_use]
    pub fn initiative_mode(world: &World) -> InitiativeMode {
        world.initiative_mode
    }

    /// Manual initiative order, maintained in both modes.
    #[must_use]
    pub fn initiative_order(world: &World) -> &[CharacterId] {
        &world.initiative_order
    }

    /// Turn order for the active initiative mode.
    #[must_use]
    pub fn turn_order(world: &World) -> Vec<CharacterId> {
        battlemap_system_initiative::turn_order(
            &world.characters,
            world.initiative_mode,
            &world.initiative_order,
        )
    }

    /// Character whose turn it currently is.
    #[must_use]
    pub fn active_character(world: &World) -> Option<&Character> {
        let order = turn_order(world);
        let id = order.get(usize::try_from(world.current_turn).ok()?)?;
        character(world, id)
    }

    /// Reports whether a wall occupies the cell.
    #[must_use]
    pub fn is_wall_at(world: &World, cell: CellCoord) -> bool {
        terrain_at(world, cell).is_some_and(|tile| tile.kind.is_wall())
    }

    /// Reports whether difficult terrain occupies the cell.
    #[must_use]
    pub fn is_difficult_at(world: &World, cell: CellCoord) -> bool {
        terrain_at(world, cell).is_some_and(|tile| tile.kind.is_difficult())
    }

    /// Reports whether a character stands on the cell.
    #[must_use]
    pub fn is_occupied(world: &World, cell: CellCoord) -> bool {
        world
            .characters
            .iter()
            .any(|character| character.position == cell)
    }

    /// Captures every editable field into an owned snapshot stamped with `id`.
    #[must_use]
    pub fn capture(world: &World, id: SnapshotId) -> SceneSnapshot {
        SceneSnapshot {
            characters: world.characters.clone(),
            terrain: world.terrain.clone(),
            measurements: world.measurements.clone(),
            map_width: world.config.width,
            map_height: world.config.height,
            grid_scale: world.config.grid_scale,
            round: world.round,
            current_turn: world.current_turn,
            selected_tool: world.selected_tool.clone(),
            custom_objects: world.custom_objects.clone(),
            id,
            distance_rule: world.config.distance_rule,
            initiative_mode: world.initiative_mode,
            initiative_order: world.initiative_order.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battlemap_core::{CellCoord, SnapshotId};

    #[test]
    fn placing_terrain_evicts_existing_tile() {
        let mut world = World::new();
        let mut events = Vec::new();
        let cell = CellCoord::new(2, 3);
        apply(
            &mut world,
            Command::PlaceTerrain {
                kind: TerrainKind::WALL,
                cell,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTerrain {
                kind: TerrainKind::DIFFICULT,
                cell,
            },
            &mut events,
        );

        let tiles: Vec<_> = query::terrain(&world)
            .iter()
            .filter(|tile| tile.cell == cell)
            .collect();
        assert_eq!(tiles.len(), 1, "a cell holds at most one tile");
        assert!(query::is_difficult_at(&world, cell));
        assert!(!query::is_wall_at(&world, cell));
        assert!(matches!(
            events.last(),
            Some(Event::TerrainPlaced {
                evicted: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn capture_then_restore_is_identity() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AddCharacter {
                character: Character::player("Aria", CellCoord::new(1, 1), 31, "#F59E0B"),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTerrain {
                kind: TerrainKind::WALL,
                cell: CellCoord::new(4, 4),
            },
            &mut events,
        );

        let snapshot = query::capture(&world, SnapshotId::new(9));
        restore(&mut world, &snapshot, &mut events);
        assert_eq!(query::capture(&world, SnapshotId::new(9)), snapshot);
    }

    #[test]
    fn hit_points_clamp_at_zero_and_healing_is_uncapped() {
        let mut world = World::new();
        let mut events = Vec::new();
        let hero = Character::player("Maelin", CellCoord::new(0, 0), 31, "#3B82F6");
        let id = hero.id.clone();
        apply(&mut world, Command::AddCharacter { character: hero }, &mut events);

        apply(
            &mut world,
            Command::AdjustHitPoints {
                id: id.clone(),
                delta: -50,
            },
            &mut events,
        );
        assert_eq!(query::character(&world, &id).map(|c| c.hp), Some(0));

        apply(
            &mut world,
            Command::AdjustHitPoints {
                id: id.clone(),
                delta: 40,
            },
            &mut events,
        );
        let hero = query::character(&world, &id).expect("hero exists");
        assert_eq!(hero.hp, 40);
        assert_eq!(hero.overheal(), 9);
    }
}
