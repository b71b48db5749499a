#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Editing session that owns one battle map scene.
//!
//! [`EditorSession`] is the single writer of its [`World`]. Every action
//! translates user intent into [`Command`] batches, records an undo entry
//! before mutating, applies the batch and finally broadcasts a fresh snapshot
//! to connected guests when the resulting events touch replicated state.

use battlemap_core::{
    CellCoord, Character, CharacterId, Command, CustomObject, Event, InitiativeMode, MapConfig,
    MeasurementId, ObjectId, OrderShift, SceneSnapshot, SnapshotId, SnapshotSequence, TerrainId,
    TerrainKind, Tool,
};
use battlemap_storage::{MapStore, StoreError};
use battlemap_system_history::{History, DEFAULT_HISTORY_DEPTH};
use battlemap_system_initiative::{
    roster::{bulk_commands, find_open_spawn_slots, plan_bulk_npcs, BulkNpcRequest, DEFAULT_PARTY},
    Initiative, RollPreset,
};
use battlemap_system_measurement::MeasureTool;
use battlemap_system_movement::{MovePreview, MoveTool};
use battlemap_system_peer_sync::{
    host_status_label, session_id_for, HostSession, LoopbackNetwork, SessionId, SessionIdStore,
};
use battlemap_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod paint;
pub mod presets;

pub use paint::PaintButton;
use paint::{PaintStroke, StrokeMode};

/// Settings applied to a new editing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    /// Map configuration of the blank scene.
    pub map: MapConfig,
    /// Number of undo steps retained.
    pub history_depth: usize,
    /// Seed for initiative dice; `None` draws from system entropy.
    pub initiative_seed: Option<u64>,
    /// First snapshot identifier; `None` seeds from the wall clock.
    pub first_snapshot_id: Option<u64>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            history_depth: DEFAULT_HISTORY_DEPTH,
            initiative_seed: None,
            first_snapshot_id: None,
        }
    }
}

/// Parses free-form numeric input, treating anything unparsable as zero.
#[must_use]
pub fn coerce_number(text: &str) -> i64 {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return value;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

/// Host-side controller for one map.
#[derive(Debug)]
pub struct EditorSession {
    map_name: String,
    world: World,
    history: History,
    sequence: SnapshotSequence,
    measure: MeasureTool,
    mover: MoveTool,
    stroke: Option<PaintStroke>,
    initiative: Initiative,
    selection: Vec<CharacterId>,
    host: Option<HostSession>,
}

impl EditorSession {
    /// Opens a blank map stocked with the default custom objects.
    #[must_use]
    pub fn new(map_name: impl Into<String>, options: EditorOptions) -> Self {
        let sequence = options
            .first_snapshot_id
            .map_or_else(SnapshotSequence::from_clock, SnapshotSequence::starting_at);
        let initiative = options
            .initiative_seed
            .map_or_else(Initiative::default, Initiative::from_seed);

        let mut world = World::with_config(options.map);
        let mut events = Vec::new();
        for object in presets::default_custom_objects() {
            world::apply(
                &mut world,
                Command::DefineCustomObject { object },
                &mut events,
            );
        }

        Self {
            map_name: map_name.into(),
            world,
            history: History::with_capacity(options.history_depth),
            sequence,
            measure: MeasureTool::default(),
            mover: MoveTool::default(),
            stroke: None,
            initiative,
            selection: Vec::new(),
            host: None,
        }
    }

    /// Opens the map, restoring its saved document when one exists.
    ///
    /// The initial load is not recorded in the undo history.
    pub fn open<S>(
        map_name: impl Into<String>,
        options: EditorOptions,
        store: &S,
    ) -> Result<Self, StoreError>
    where
        S: MapStore + ?Sized,
    {
        let mut session = Self::new(map_name, options);
        if let Some(snapshot) = store.load(&session.map_name)? {
            let _ = session.restore_document(snapshot);
        }
        Ok(session)
    }

    /// Name the map is saved and hosted under.
    #[must_use]
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Read-only view of the live scene, for use with [`query`].
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Characters currently selected in the host interface.
    #[must_use]
    pub fn selection(&self) -> &[CharacterId] {
        &self.selection
    }

    /// Captures the live scene under a fresh identifier.
    pub fn take_snapshot(&mut self) -> SceneSnapshot {
        query::capture(&self.world, self.sequence.next_id())
    }

    /// Records the live scene as an undo entry and invalidates redo.
    pub fn save_snapshot(&mut self) {
        let snapshot = self.take_snapshot();
        self.history.record(snapshot);
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Returns the scene to the state before the most recent action.
    ///
    /// Returns `false` without touching the scene when nothing can be undone.
    pub fn undo(&mut self) -> bool {
        let current = self.take_snapshot();
        let Some(previous) = self.history.undo(current) else {
            return false;
        };
        let _ = self.restore_untracked(&previous);
        true
    }

    /// Re-applies the most recently undone action.
    ///
    /// Returns `false` without touching the scene when nothing can be redone.
    pub fn redo(&mut self) -> bool {
        let current = self.take_snapshot();
        let Some(next) = self.history.redo(current) else {
            return false;
        };
        let _ = self.restore_untracked(&next);
        true
    }

    /// Replaces the map dimensions, grid scale and distance rule.
    pub fn configure_map(&mut self, config: MapConfig) -> Vec<Event> {
        self.commit(vec![Command::ConfigureMap { config }])
    }

    /// Adds a character, pinning its position inside the map.
    pub fn add_character(&mut self, mut character: Character) -> Vec<Event> {
        character.position = query::config(&self.world).clamp(character.position);
        self.commit(vec![Command::AddCharacter { character }])
    }

    /// Spawns the default party on the first open cells from `anchor`.
    pub fn add_default_party(&mut self, anchor: CellCoord) -> Vec<Event> {
        let config = query::config(&self.world);
        let slots = find_open_spawn_slots(
            DEFAULT_PARTY.len(),
            anchor,
            config.width,
            config.height,
            |cell| self.is_blocked(cell),
        );
        let commands = DEFAULT_PARTY
            .iter()
            .zip(slots)
            .map(|(member, cell)| Command::AddCharacter {
                character: member.spawn(cell),
            })
            .collect();
        self.commit(commands)
    }

    /// Adds a numbered group of non-player characters.
    pub fn add_bulk_npcs(&mut self, request: &BulkNpcRequest) -> Vec<Event> {
        let config = query::config(&self.world);
        let world = &self.world;
        let npcs = plan_bulk_npcs(
            request,
            query::characters(world),
            (config.width, config.height),
            |cell| query::is_wall_at(world, cell) || query::is_occupied(world, cell),
            self.initiative.rng_mut(),
        );
        let mut commands = Vec::new();
        bulk_commands(npcs, &mut commands);
        self.commit(commands)
    }

    /// Removes the listed characters.
    pub fn delete_characters(&mut self, ids: &[CharacterId]) -> Vec<Event> {
        let present: Vec<CharacterId> = ids
            .iter()
            .filter(|id| query::character(&self.world, id).is_some())
            .cloned()
            .collect();
        if present.is_empty() {
            return Vec::new();
        }
        self.selection.retain(|id| !present.contains(id));
        self.commit(vec![Command::RemoveCharacters { ids: present }])
    }

    /// Removes every non-player character.
    pub fn clear_npcs(&mut self) -> Vec<Event> {
        let ids = self.character_ids(|character| !character.is_player);
        self.delete_characters(&ids)
    }

    /// Removes every player character.
    pub fn clear_pcs(&mut self) -> Vec<Event> {
        let ids = self.character_ids(|character| character.is_player);
        self.delete_characters(&ids)
    }

    /// Toggles a character in the selection.
    pub fn toggle_selection(&mut self, id: &CharacterId) {
        if let Some(index) = self.selection.iter().position(|selected| selected == id) {
            let _ = self.selection.remove(index);
        } else if query::character(&self.world, id).is_some() {
            self.selection.push(id.clone());
        }
    }

    /// Picks up a character for a drag-and-drop move.
    pub fn grab_character(&mut self, id: &CharacterId) -> bool {
        let Some(character) = query::character(&self.world, id) else {
            return false;
        };
        self.mover.grab(character.id.clone(), character.position);
        true
    }

    /// Movement overlay for dropping the held character on `hovered`.
    #[must_use]
    pub fn drag_preview(&self, hovered: CellCoord) -> Option<MovePreview> {
        let config = query::config(&self.world);
        self.mover.preview(
            config.clamp(hovered),
            &config,
            |cell| query::is_wall_at(&self.world, cell),
            |cell| query::is_difficult_at(&self.world, cell),
        )
    }

    /// Drops the held character as far towards `target` as walls allow.
    pub fn drop_character(&mut self, target: CellCoord) -> Vec<Event> {
        let target = query::config(&self.world).clamp(target);
        let world = &self.world;
        let mut commands = Vec::new();
        self.mover
            .release(target, |cell| query::is_wall_at(world, cell), &mut commands);
        self.commit(commands)
    }

    /// Moves a character in one step; equivalent to grab then drop.
    ///
    /// A move that would not leave the current cell records nothing.
    pub fn move_character(&mut self, id: &CharacterId, target: CellCoord) -> Vec<Event> {
        if !self.grab_character(id) {
            return Vec::new();
        }
        self.drop_character(target)
    }

    /// Overwrites a player's hit points from raw text input.
    pub fn set_hp(&mut self, id: &CharacterId, text: &str) -> Vec<Event> {
        self.commit(vec![Command::SetHitPoints {
            id: id.clone(),
            hp: coerce_number(text),
        }])
    }

    /// Applies damage from raw text input; negative amounts heal.
    ///
    /// Players lose hit points while non-players accumulate damage.
    pub fn apply_damage(&mut self, id: &CharacterId, text: &str) -> Vec<Event> {
        let amount = coerce_number(text);
        let Some(character) = query::character(&self.world, id) else {
            return Vec::new();
        };
        let command = if character.is_player {
            Command::AdjustHitPoints {
                id: id.clone(),
                delta: amount.saturating_neg(),
            }
        } else {
            Command::AdjustDamage {
                id: id.clone(),
                delta: amount,
            }
        };
        self.commit(vec![command])
    }

    /// Heals from raw text input.
    pub fn heal(&mut self, id: &CharacterId, text: &str) -> Vec<Event> {
        let amount = coerce_number(text);
        self.apply_damage(id, &amount.saturating_neg().to_string())
    }

    /// Overwrites a character's initiative from raw text input.
    pub fn set_initiative(&mut self, id: &CharacterId, text: &str) -> Vec<Event> {
        let value = coerce_number(text).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        self.commit(vec![Command::SetInitiative {
            id: id.clone(),
            value: i32::try_from(value).unwrap_or_default(),
        }])
    }

    /// Rolls initiative for every character covered by the preset.
    pub fn roll_initiative(&mut self, preset: RollPreset) -> Vec<Event> {
        let mut commands = Vec::new();
        self.initiative.roll_for_scope(
            preset,
            query::characters(&self.world),
            &self.selection,
            &mut commands,
        );
        self.commit(commands)
    }

    /// Handles a click with the measuring tool.
    ///
    /// The first click anchors; the second records the measurement.
    pub fn measure_click(&mut self, cell: CellCoord) -> Vec<Event> {
        let config = query::config(&self.world);
        let mut commands = Vec::new();
        self.measure.click(
            config.clamp(cell),
            config.distance_rule,
            config.grid_scale,
            &mut commands,
        );
        self.commit(commands)
    }

    /// Live distance from the pending anchor to `hovered`.
    #[must_use]
    pub fn measure_preview(&self, hovered: CellCoord) -> Option<u32> {
        let config = query::config(&self.world);
        self.measure
            .preview(config.clamp(hovered), config.distance_rule, config.grid_scale)
    }

    /// Deletes one measurement.
    pub fn remove_measurement(&mut self, id: &MeasurementId) -> Vec<Event> {
        if !query::measurements(&self.world)
            .iter()
            .any(|measurement| &measurement.id == id)
        {
            return Vec::new();
        }
        self.commit(vec![Command::RemoveMeasurement { id: id.clone() }])
    }

    /// Deletes every measurement and drops any pending anchor.
    pub fn clear_measurements(&mut self) -> Vec<Event> {
        self.measure.cancel();
        self.commit(vec![Command::ClearMeasurements])
    }

    /// Starts a paint gesture on `cell` with the active paint tool.
    ///
    /// The whole gesture shares one undo entry. A primary press on a cell
    /// already holding the tool's kind erases for the rest of the gesture;
    /// a secondary press always erases.
    pub fn begin_paint(&mut self, cell: CellCoord, button: PaintButton) -> Vec<Event> {
        let Tool::Paint(kind) = query::selected_tool(&self.world).clone() else {
            return Vec::new();
        };
        if !query::config(&self.world).contains(cell) {
            return Vec::new();
        }
        let holds_kind = self.holds_kind(&kind, cell);
        let mode = match button {
            PaintButton::Secondary => StrokeMode::Erase,
            PaintButton::Primary if holds_kind => StrokeMode::Erase,
            PaintButton::Primary => StrokeMode::Paint,
        };
        if self.stroke.is_none() {
            self.save_snapshot();
        }
        let command = mode.command(kind.clone(), cell);
        self.stroke = Some(PaintStroke::new(kind, mode, cell));
        self.run(vec![command])
    }

    /// Continues the active paint gesture onto `cell`.
    pub fn extend_paint(&mut self, cell: CellCoord) -> Vec<Event> {
        if !query::config(&self.world).contains(cell) {
            return Vec::new();
        }
        let Some(stroke) = self.stroke.as_mut() else {
            return Vec::new();
        };
        if !stroke.enter(cell) {
            return Vec::new();
        }
        let (kind, mode) = (stroke.kind().clone(), stroke.mode());
        let holds_kind = self.holds_kind(&kind, cell);
        let needed = match mode {
            StrokeMode::Paint => !holds_kind,
            StrokeMode::Erase => holds_kind,
        };
        if !needed {
            return Vec::new();
        }
        self.run(vec![mode.command(kind, cell)])
    }

    /// Finishes the active paint gesture.
    pub fn end_paint(&mut self) {
        self.stroke = None;
    }

    /// Deletes a single terrain tile.
    pub fn remove_terrain(&mut self, id: &TerrainId) -> Vec<Event> {
        if !query::terrain(&self.world).iter().any(|tile| &tile.id == id) {
            return Vec::new();
        }
        self.commit(vec![Command::RemoveTerrain { id: id.clone() }])
    }

    /// Deletes every terrain tile.
    pub fn clear_terrain(&mut self) -> Vec<Event> {
        self.commit(vec![Command::ClearTerrain])
    }

    /// Registers a custom object whose identifier is the slug of `label`.
    pub fn define_custom_object(&mut self, label: &str, icon: &str, color: &str) -> Vec<Event> {
        self.commit(vec![Command::DefineCustomObject {
            object: CustomObject::new(label, icon, color),
        }])
    }

    /// Removes a custom object along with every tile painted with it.
    pub fn remove_custom_object(&mut self, id: &ObjectId) -> Vec<Event> {
        if !query::custom_objects(&self.world)
            .iter()
            .any(|object| &object.id == id)
        {
            return Vec::new();
        }
        self.commit(vec![Command::RemoveCustomObject { id: id.clone() }])
    }

    /// Switches the active tool, abandoning half-finished gestures.
    pub fn select_tool(&mut self, tool: Tool) -> Vec<Event> {
        self.measure.cancel();
        self.mover.cancel();
        self.stroke = None;
        self.run(vec![Command::SelectTool { tool }])
    }

    /// Passes the turn to the next combatant.
    pub fn next_turn(&mut self) -> Vec<Event> {
        self.run(vec![Command::AdvanceTurn])
    }

    /// Returns the turn to the previous combatant.
    pub fn previous_turn(&mut self) -> Vec<Event> {
        self.run(vec![Command::RewindTurn])
    }

    /// Switches between sorted and hand-maintained turn order.
    pub fn set_initiative_mode(&mut self, mode: InitiativeMode) -> Vec<Event> {
        self.run(vec![Command::SetInitiativeMode { mode }])
    }

    /// Moves a character one slot within the manual turn order.
    pub fn shift_initiative(&mut self, id: &CharacterId, shift: OrderShift) -> Vec<Event> {
        self.run(vec![Command::ShiftInitiative {
            id: id.clone(),
            shift,
        }])
    }

    /// Writes the live scene to the store under the map name.
    pub fn save_map<S>(&mut self, store: &mut S) -> Result<SnapshotId, StoreError>
    where
        S: MapStore + ?Sized,
    {
        let snapshot = self.take_snapshot();
        store.save(&self.map_name, &snapshot)?;
        Ok(snapshot.id)
    }

    /// Replaces the live scene with the saved document, if one exists.
    ///
    /// Loading is undoable. The tool resets to select and initiative to auto.
    pub fn load_map<S>(&mut self, store: &S) -> Result<bool, StoreError>
    where
        S: MapStore + ?Sized,
    {
        let Some(snapshot) = store.load(&self.map_name)? else {
            tracing::info!(map = %self.map_name, "no saved document to load");
            return Ok(false);
        };
        self.save_snapshot();
        let _ = self.restore_document(snapshot);
        Ok(true)
    }

    /// Replaces the live scene with an imported snapshot, recording an undo entry.
    pub fn import_scene(&mut self, snapshot: SceneSnapshot) -> Vec<Event> {
        self.save_snapshot();
        self.restore_document(snapshot)
    }

    /// Starts hosting the map on `network` under its persisted session id.
    pub fn host<S>(&mut self, network: &LoopbackNetwork, ids: &mut S) -> SessionId
    where
        S: SessionIdStore + ?Sized,
    {
        let mut rng = ChaCha8Rng::from_entropy();
        let session_id = session_id_for(&self.map_name, ids, &mut rng);
        let mailbox = network.listen(&session_id);
        self.host = Some(HostSession::new(session_id.clone(), mailbox));
        tracing::info!(map = %self.map_name, session = %session_id, "hosting map");
        self.broadcast();
        session_id
    }

    /// Processes pending transport notifications, returning how many were handled.
    pub fn pump_network(&mut self) -> usize {
        self.host.as_mut().map_or(0, HostSession::pump)
    }

    /// Active host session, if the map is being shared.
    #[must_use]
    pub fn host_session(&self) -> Option<&HostSession> {
        self.host.as_ref()
    }

    /// Status badge for the host toolbar.
    #[must_use]
    pub fn host_status(&self) -> Option<String> {
        self.host
            .as_ref()
            .map(|host| host_status_label(host.signalling_online(), host.peer_count()))
    }

    fn commit(&mut self, commands: Vec<Command>) -> Vec<Event> {
        if commands.is_empty() {
            return Vec::new();
        }
        let before = self.take_snapshot();
        let events = self.run(commands);
        if events.iter().any(Event::replicates) {
            self.history.record(before);
        } else {
            tracing::debug!(map = %self.map_name, "action changed nothing, history untouched");
        }
        events
    }

    fn run(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        if events.iter().any(Event::replicates) {
            self.broadcast();
        }
        events
    }

    fn restore_untracked(&mut self, snapshot: &SceneSnapshot) -> Vec<Event> {
        self.measure.cancel();
        self.mover.cancel();
        self.stroke = None;
        let mut events = Vec::new();
        world::restore(&mut self.world, snapshot, &mut events);
        let present: Vec<CharacterId> = self
            .selection
            .iter()
            .filter(|id| query::character(&self.world, id).is_some())
            .cloned()
            .collect();
        self.selection = present;
        self.broadcast();
        events
    }

    fn restore_document(&mut self, mut snapshot: SceneSnapshot) -> Vec<Event> {
        self.sequence.advance_past(snapshot.id);
        snapshot.selected_tool = Tool::Select;
        snapshot.initiative_mode = InitiativeMode::Auto;
        tracing::info!(map = %self.map_name, snapshot = %snapshot.id, "restored document");
        self.restore_untracked(&snapshot)
    }

    fn broadcast(&mut self) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        let snapshot = query::capture(&self.world, self.sequence.next_id());
        let delivered = host.broadcast(&snapshot);
        tracing::debug!(snapshot = %snapshot.id, delivered, "broadcast scene");
    }

    fn character_ids<F>(&self, predicate: F) -> Vec<CharacterId>
    where
        F: Fn(&Character) -> bool,
    {
        query::characters(&self.world)
            .iter()
            .filter(|character| predicate(character))
            .map(|character| character.id.clone())
            .collect()
    }

    fn is_blocked(&self, cell: CellCoord) -> bool {
        query::is_wall_at(&self.world, cell) || query::is_occupied(&self.world, cell)
    }

    fn holds_kind(&self, kind: &TerrainKind, cell: CellCoord) -> bool {
        query::terrain_at(&self.world, cell).is_some_and(|tile| &tile.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_number_treats_garbage_as_zero() {
        assert_eq!(coerce_number("12"), 12);
        assert_eq!(coerce_number(" -4 "), -4);
        assert_eq!(coerce_number("7.9"), 7);
        assert_eq!(coerce_number("abc"), 0);
        assert_eq!(coerce_number(""), 0);
        assert_eq!(coerce_number("NaN"), 0);
    }
}
