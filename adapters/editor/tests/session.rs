use battlemap_core::{
    CellCoord, Character, CharacterId, Event, ObjectId, RollFlag, SceneSnapshot, SnapshotId,
    TerrainKind, Tool,
};
use battlemap_editor::{EditorOptions, EditorSession, PaintButton};
use battlemap_storage::MemoryMapStore;
use battlemap_system_initiative::roster::{BulkNpcRequest, Palette};
use battlemap_system_peer_sync::{
    GuestSession, LoopbackNetwork, MemorySessionIds, PeerMetadata, ReplicaUpdate,
};
use battlemap_world::query;

fn session() -> EditorSession {
    EditorSession::new(
        "crypt",
        EditorOptions {
            initiative_seed: Some(7),
            first_snapshot_id: Some(1),
            ..EditorOptions::default()
        },
    )
}

fn scene(editor: &EditorSession) -> SceneSnapshot {
    query::capture(editor.world(), SnapshotId::new(0))
}

fn add_player(editor: &mut EditorSession, name: &str, cell: CellCoord) -> CharacterId {
    let character = Character::player(name, cell, 20, "#3B82F6");
    let id = character.id.clone();
    let _ = editor.add_character(character);
    id
}

fn add_npc(editor: &mut EditorSession, name: &str, cell: CellCoord) -> CharacterId {
    let character = Character::npc(name, cell, "#EF4444");
    let id = character.id.clone();
    let _ = editor.add_character(character);
    id
}

fn wall_cells(editor: &EditorSession) -> Vec<CellCoord> {
    let mut cells: Vec<CellCoord> = query::terrain(editor.world())
        .iter()
        .filter(|tile| tile.kind.is_wall())
        .map(|tile| tile.cell)
        .collect();
    cells.sort();
    cells
}

#[test]
fn undo_then_redo_walks_back_and_forth() {
    let mut editor = session();
    let initial = scene(&editor);

    let aria = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    let _ = editor.move_character(&aria, CellCoord::new(4, 1));
    let _ = editor.set_hp(&aria, "5");
    let finished = scene(&editor);

    for _ in 0..3 {
        assert!(editor.undo());
    }
    assert_eq!(scene(&editor), initial);
    assert!(!editor.undo(), "history is exhausted");

    for _ in 0..3 {
        assert!(editor.redo());
    }
    assert_eq!(scene(&editor), finished);
    assert!(!editor.redo());
}

#[test]
fn new_action_discards_redo() {
    let mut editor = session();
    let _ = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    assert!(editor.undo());
    assert!(editor.can_redo());

    let _ = add_npc(&mut editor, "Zombie", CellCoord::new(3, 3));
    assert!(!editor.can_redo());
}

#[test]
fn paint_drag_is_undone_in_one_step() {
    let mut editor = session();
    let _ = editor.select_tool(Tool::Paint(TerrainKind::WALL));
    assert!(!editor.can_undo(), "tool changes are not recorded");

    let _ = editor.begin_paint(CellCoord::new(1, 1), PaintButton::Primary);
    let _ = editor.extend_paint(CellCoord::new(2, 1));
    assert!(editor.extend_paint(CellCoord::new(2, 1)).is_empty());
    let _ = editor.extend_paint(CellCoord::new(3, 1));
    editor.end_paint();
    assert_eq!(
        wall_cells(&editor),
        vec![
            CellCoord::new(1, 1),
            CellCoord::new(2, 1),
            CellCoord::new(3, 1)
        ]
    );

    assert!(editor.undo());
    assert!(wall_cells(&editor).is_empty());
    assert!(!editor.can_undo());
}

#[test]
fn primary_press_on_painted_cell_erases_for_whole_gesture() {
    let mut editor = session();
    let _ = editor.select_tool(Tool::Paint(TerrainKind::WALL));
    for column in 1..=3 {
        let _ = editor.begin_paint(CellCoord::new(column, 1), PaintButton::Primary);
        editor.end_paint();
    }

    let _ = editor.begin_paint(CellCoord::new(2, 1), PaintButton::Primary);
    let _ = editor.extend_paint(CellCoord::new(3, 1));
    assert!(
        editor.extend_paint(CellCoord::new(4, 1)).is_empty(),
        "erasing never paints empty cells"
    );
    editor.end_paint();
    assert_eq!(wall_cells(&editor), vec![CellCoord::new(1, 1)]);

    let _ = editor.begin_paint(CellCoord::new(1, 1), PaintButton::Secondary);
    editor.end_paint();
    assert!(wall_cells(&editor).is_empty());
}

#[test]
fn painting_without_a_paint_tool_does_nothing() {
    let mut editor = session();
    assert!(editor
        .begin_paint(CellCoord::new(1, 1), PaintButton::Primary)
        .is_empty());
    assert!(!editor.can_undo());
}

#[test]
fn move_stops_before_walls_and_noop_records_nothing() {
    let mut editor = session();
    let _ = editor.select_tool(Tool::Paint(TerrainKind::WALL));
    let _ = editor.begin_paint(CellCoord::new(3, 1), PaintButton::Primary);
    editor.end_paint();
    let _ = editor.select_tool(Tool::Select);

    let aria = add_player(&mut editor, "Aria", CellCoord::new(0, 1));
    let events = editor.move_character(&aria, CellCoord::new(5, 1));
    assert_eq!(
        events,
        vec![Event::CharacterMoved {
            id: aria.clone(),
            from: CellCoord::new(0, 1),
            to: CellCoord::new(2, 1),
        }]
    );

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.can_undo());
    assert!(editor.redo());
    assert!(editor.redo());
    assert!(editor.redo());

    assert!(editor
        .move_character(&aria, CellCoord::new(6, 1))
        .is_empty());
    assert!(editor.undo(), "the last recorded action is still the move");
    assert_eq!(
        query::character(editor.world(), &aria).map(|c| c.position),
        Some(CellCoord::new(0, 1))
    );
}

#[test]
fn out_of_bounds_drop_is_clamped() {
    let mut editor = session();
    let aria = add_player(&mut editor, "Aria", CellCoord::new(20, 10));
    let _ = editor.move_character(&aria, CellCoord::new(400, 10));
    assert_eq!(
        query::character(editor.world(), &aria).map(|c| c.position),
        Some(CellCoord::new(24, 10))
    );
}

#[test]
fn drag_preview_reports_cost_to_last_free_cell() {
    let mut editor = session();
    let aria = add_player(&mut editor, "Aria", CellCoord::new(0, 0));
    assert!(editor.grab_character(&aria));
    let preview = editor
        .drag_preview(CellCoord::new(3, 0))
        .expect("character is held");
    assert!(!preview.clip.blocked);
    assert_eq!(preview.cost.total, 15);
}

#[test]
fn health_input_coerces_garbage_to_zero() {
    let mut editor = session();
    let aria = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    let zombie = add_npc(&mut editor, "Zombie", CellCoord::new(2, 2));

    let _ = editor.apply_damage(&aria, "6");
    assert_eq!(query::character(editor.world(), &aria).map(|c| c.hp), Some(14));
    let _ = editor.set_hp(&aria, "lots");
    assert_eq!(query::character(editor.world(), &aria).map(|c| c.hp), Some(0));

    let _ = editor.apply_damage(&zombie, "4");
    assert_eq!(
        query::character(editor.world(), &zombie).map(|c| c.damage),
        Some(4)
    );
    let _ = editor.heal(&zombie, "10");
    assert_eq!(
        query::character(editor.world(), &zombie).map(|c| c.damage),
        Some(0)
    );

    let _ = editor.set_initiative(&zombie, "35");
    assert_eq!(
        query::character(editor.world(), &zombie).map(|c| c.initiative),
        Some(20)
    );
}

#[test]
fn huge_health_input_saturates_instead_of_overflowing() {
    let mut editor = session();
    let aria = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    let zombie = add_npc(&mut editor, "Zombie", CellCoord::new(2, 2));
    let hp = |editor: &EditorSession| query::character(editor.world(), &aria).map(|c| c.hp);
    let damage =
        |editor: &EditorSession| query::character(editor.world(), &zombie).map(|c| c.damage);

    let _ = editor.apply_damage(&zombie, "3");
    let _ = editor.apply_damage(&zombie, "1e30");
    assert_eq!(damage(&editor), Some(u32::MAX));
    let _ = editor.heal(&zombie, "99999999999999999999");
    assert_eq!(damage(&editor), Some(0));
    let _ = editor.apply_damage(&zombie, "99999999999999999999");
    assert_eq!(damage(&editor), Some(u32::MAX));
    let _ = editor.heal(&zombie, "1e30");
    assert_eq!(damage(&editor), Some(0));

    let _ = editor.heal(&aria, "99999999999999999999");
    assert_eq!(hp(&editor), Some(u32::MAX));
    let _ = editor.apply_damage(&aria, "1e30");
    assert_eq!(hp(&editor), Some(0));
    let _ = editor.heal(&aria, "1e30");
    assert_eq!(hp(&editor), Some(u32::MAX));
    let _ = editor.apply_damage(&aria, "99999999999999999999");
    assert_eq!(hp(&editor), Some(0));
}

#[test]
fn rejected_actions_leave_history_alone() {
    let mut editor = session();
    let aria = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    let zombie = add_npc(&mut editor, "Zombie", CellCoord::new(2, 2));
    assert!(editor.undo());
    assert!(editor.can_redo());

    let rejected = editor.define_custom_object("Wall", "#", "#000");
    assert!(matches!(
        rejected.as_slice(),
        [Event::CustomObjectRejected { .. }]
    ));
    assert!(editor.can_redo(), "a rejected definition keeps redo");

    let mismatch = editor.set_hp(&zombie, "5");
    assert!(matches!(
        mismatch.as_slice(),
        [Event::CharacterMissing { .. }]
    ));
    assert!(editor.can_redo(), "a missing target keeps redo");

    assert!(editor.redo());
    let mismatch = editor.set_hp(&zombie, "5");
    assert!(matches!(
        mismatch.as_slice(),
        [Event::HealthChannelMismatch { .. }]
    ));

    assert!(editor.undo(), "the last recorded action is adding the zombie");
    assert!(query::character(editor.world(), &zombie).is_none());
    assert!(query::character(editor.world(), &aria).is_some());
    assert!(editor.undo());
    assert!(!editor.can_undo());
}

#[test]
fn clearing_npcs_keeps_players_and_selection_in_sync() {
    let mut editor = session();
    let aria = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    let zombie = add_npc(&mut editor, "Zombie", CellCoord::new(2, 2));
    editor.toggle_selection(&zombie);
    editor.toggle_selection(&aria);

    let _ = editor.clear_npcs();
    let names: Vec<&str> = query::characters(editor.world())
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Aria"]);
    assert_eq!(editor.selection(), &[aria][..]);
    assert!(editor.clear_npcs().is_empty(), "nothing left to clear");
}

#[test]
fn measuring_takes_two_clicks() {
    let mut editor = session();
    assert!(editor.measure_click(CellCoord::new(0, 0)).is_empty());
    assert_eq!(editor.measure_preview(CellCoord::new(4, 3)), Some(20));

    let events = editor.measure_click(CellCoord::new(4, 3));
    assert!(matches!(
        events.as_slice(),
        [Event::MeasurementAdded { distance: 20, .. }]
    ));
    assert_eq!(query::measurements(editor.world()).len(), 1);
    assert_eq!(editor.measure_preview(CellCoord::new(1, 1)), None);

    let _ = editor.clear_measurements();
    assert!(query::measurements(editor.world()).is_empty());
}

#[test]
fn removing_custom_object_removes_its_tiles_and_tool() {
    let mut editor = session();
    let rejected = editor.define_custom_object("Wall", "#", "#000");
    assert!(matches!(
        rejected.as_slice(),
        [Event::CustomObjectRejected { .. }]
    ));

    let _ = editor.define_custom_object("Old Barrel", "B", "#8B4513");
    let barrel = TerrainKind::Custom(ObjectId::new("old-barrel"));
    let _ = editor.select_tool(Tool::Paint(barrel.clone()));
    let _ = editor.begin_paint(CellCoord::new(5, 5), PaintButton::Primary);
    editor.end_paint();
    assert!(query::terrain_at(editor.world(), CellCoord::new(5, 5)).is_some());

    let _ = editor.remove_custom_object(&ObjectId::new("old-barrel"));
    assert!(query::terrain_at(editor.world(), CellCoord::new(5, 5)).is_none());
    assert_eq!(query::selected_tool(editor.world()), &Tool::Select);
}

#[test]
fn bulk_npcs_are_numbered_and_avoid_walls() {
    let mut editor = session();
    let _ = editor.select_tool(Tool::Paint(TerrainKind::WALL));
    let _ = editor.begin_paint(CellCoord::new(1, 0), PaintButton::Primary);
    editor.end_paint();

    let _ = editor.add_bulk_npcs(&BulkNpcRequest {
        base_name: "Goblin".to_owned(),
        count: 3,
        initiative_mod: 2,
        roll_on_create: true,
        flag: Some(RollFlag::Advantage),
        palette: Palette::Reds,
        anchor: CellCoord::new(0, 0),
    });

    let goblins: Vec<(&str, CellCoord)> = query::characters(editor.world())
        .iter()
        .map(|c| (c.name.as_str(), c.position))
        .collect();
    assert_eq!(
        goblins,
        vec![
            ("Goblin 1", CellCoord::new(0, 0)),
            ("Goblin 2", CellCoord::new(2, 0)),
            ("Goblin 3", CellCoord::new(3, 0)),
        ]
    );
    assert!(query::characters(editor.world())
        .iter()
        .all(|c| c.last_roll.is_some()));

    assert!(editor.undo());
    assert!(query::characters(editor.world()).is_empty());
}

#[test]
fn save_and_load_round_trip_through_store() {
    let mut store = MemoryMapStore::default();
    let mut editor = session();
    let _ = add_player(&mut editor, "Aria", CellCoord::new(1, 1));
    let _ = editor.select_tool(Tool::Measure);
    let saved_id = editor.save_map(&mut store).expect("save");

    let _ = editor.clear_pcs();
    assert!(query::characters(editor.world()).is_empty());

    assert!(editor.load_map(&store).expect("load"));
    assert_eq!(query::characters(editor.world()).len(), 1);
    assert_eq!(query::selected_tool(editor.world()), &Tool::Select);
    assert!(editor.undo(), "loading is undoable");
    assert!(query::characters(editor.world()).is_empty());

    let mut reopened = EditorSession::open(
        "Crypt",
        EditorOptions {
            first_snapshot_id: Some(1),
            ..EditorOptions::default()
        },
        &store,
    )
    .expect("open");
    assert_eq!(query::characters(reopened.world()).len(), 1);
    assert!(!reopened.can_undo());
    assert!(reopened.take_snapshot().id > saved_id);
}

#[test]
fn loading_a_missing_map_changes_nothing() {
    let store = MemoryMapStore::default();
    let mut editor = session();
    assert!(!editor.load_map(&store).expect("load"));
    assert!(!editor.can_undo());
}

#[test]
fn guests_follow_host_edits() {
    let network = LoopbackNetwork::new();
    let mut ids = MemorySessionIds::default();
    let mut editor = session();
    let session_id = editor.host(&network, &mut ids);
    assert_eq!(editor.host_status().as_deref(), Some("No peers connected"));

    let _ = add_player(&mut editor, "Aria", CellCoord::new(1, 1));

    let mut guest =
        GuestSession::join(&network, &session_id, PeerMetadata::named("Bo")).expect("join");
    assert_eq!(editor.pump_network(), 1);
    assert_eq!(editor.host_status().as_deref(), Some("1 peer(s) connected"));

    let updates = guest.pump();
    assert!(matches!(updates.as_slice(), [ReplicaUpdate::Applied(_)]));
    let replica = guest.replica().snapshot().expect("replica").clone();
    assert_eq!(replica.characters, query::characters(editor.world()));

    let _ = editor.next_turn();
    let updates = guest.pump();
    assert!(matches!(updates.as_slice(), [ReplicaUpdate::Applied(_)]));
    assert_eq!(guest.replica().snapshot().map(|s| s.round), Some(2));

    let _ = editor.select_tool(Tool::Measure);
    assert!(guest.pump().is_empty(), "tool changes are not replicated");

    assert!(editor.undo());
    let updates = guest.pump();
    assert!(
        matches!(updates.as_slice(), [ReplicaUpdate::Applied(_)]),
        "undo broadcasts a strictly newer snapshot"
    );
    assert!(guest
        .replica()
        .snapshot()
        .is_some_and(|s| s.characters.is_empty()));
    assert_eq!(editor.host(&network, &mut ids), session_id);
}
