use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use battlemap_core::{
    CellCoord, Character, DistanceRule, InitiativeMode, MapConfig, OrderShift, TerrainKind, Tool,
};
use battlemap_editor::{EditorOptions, EditorSession, PaintButton};
use battlemap_system_initiative::{
    roster::{BulkNpcRequest, Palette},
    RollPreset, RollScope,
};
use battlemap_world::query;

#[test]
fn deterministic_replay_produces_identical_scenes() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.characters.len(), 7, "undo restored the cleared npcs");
    assert_eq!((first.turn, first.round), (5, 1));
}

fn replay() -> SceneState {
    let mut editor = EditorSession::new(
        "replay",
        EditorOptions {
            initiative_seed: Some(0x5eed),
            first_snapshot_id: Some(100),
            ..EditorOptions::default()
        },
    );

    let _ = editor.configure_map(MapConfig {
        width: 12,
        height: 10,
        grid_scale: 5,
        distance_rule: DistanceRule::FiveTenFive,
    });
    let _ = editor.select_tool(Tool::Paint(TerrainKind::WALL));
    let _ = editor.begin_paint(CellCoord::new(5, 0), PaintButton::Primary);
    for row in 1..6 {
        let _ = editor.extend_paint(CellCoord::new(5, row));
    }
    editor.end_paint();
    let _ = editor.select_tool(Tool::Paint(TerrainKind::DIFFICULT));
    let _ = editor.begin_paint(CellCoord::new(2, 7), PaintButton::Primary);
    let _ = editor.extend_paint(CellCoord::new(3, 7));
    editor.end_paint();
    let _ = editor.select_tool(Tool::Select);

    let _ = editor.add_default_party(CellCoord::new(0, 0));
    let _ = editor.add_bulk_npcs(&BulkNpcRequest {
        base_name: "Skeleton".to_owned(),
        count: 2,
        initiative_mod: 1,
        roll_on_create: false,
        flag: None,
        palette: Palette::Grays,
        anchor: CellCoord::new(8, 8),
    });
    let _ = editor.roll_initiative(RollPreset {
        scope: RollScope::All,
        ..RollPreset::default()
    });

    let first_pc = query::characters(editor.world())[0].id.clone();
    let _ = editor.move_character(&first_pc, CellCoord::new(9, 2));
    let _ = editor.apply_damage(&first_pc, "4");
    let _ = editor.add_character(Character::npc("Ogre", CellCoord::new(30, 30), "#374151"));
    let _ = editor.clear_npcs();
    let _ = editor.undo();

    let _ = editor.set_initiative_mode(InitiativeMode::Manual);
    let _ = editor.shift_initiative(&first_pc, OrderShift::Down);
    let _ = editor.measure_click(CellCoord::new(0, 9));
    let _ = editor.measure_click(CellCoord::new(4, 5));
    for _ in 0..5 {
        let _ = editor.next_turn();
    }

    SceneState::capture(&editor)
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct SceneState {
    characters: Vec<CharacterState>,
    terrain: Vec<(String, CellCoord)>,
    measurements: Vec<(CellCoord, CellCoord, u32)>,
    order: Vec<String>,
    round: u32,
    turn: u32,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct CharacterState {
    name: String,
    position: CellCoord,
    hp: u32,
    damage: u32,
    initiative: i32,
}

impl SceneState {
    fn capture(editor: &EditorSession) -> Self {
        let world = editor.world();
        let characters: Vec<CharacterState> = query::characters(world)
            .iter()
            .map(|character| CharacterState {
                name: character.name.clone(),
                position: character.position,
                hp: character.hp,
                damage: character.damage,
                initiative: character.initiative,
            })
            .collect();
        let mut terrain: Vec<(String, CellCoord)> = query::terrain(world)
            .iter()
            .map(|tile| (tile.kind.tag().to_owned(), tile.cell))
            .collect();
        terrain.sort();
        let measurements = query::measurements(world)
            .iter()
            .map(|measurement| (measurement.start, measurement.end, measurement.distance))
            .collect();
        let order = query::turn_order(world)
            .iter()
            .filter_map(|id| query::character(world, id))
            .map(|character| character.name.clone())
            .collect();

        Self {
            characters,
            terrain,
            measurements,
            order,
            round: query::round(world),
            turn: query::current_turn(world),
        }
    }

    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
