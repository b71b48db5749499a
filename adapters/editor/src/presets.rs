//! Starter content for fresh maps.

use battlemap_core::{
    CellCoord, Character, CharacterId, CustomObject, InitiativeMode, MapConfig, NpcKind, ObjectId,
    SceneSnapshot, SnapshotId, TerrainId, TerrainKind, TerrainTile, Tool,
};
use battlemap_system_initiative::roster::DEFAULT_PARTY;

/// Custom objects every new map starts with.
#[must_use]
pub fn default_custom_objects() -> Vec<CustomObject> {
    [
        ("chest", "Chest", "\u{1F4E6}", "#8B4513"),
        ("pillar", "Pillar", "\u{1F3DB}\u{FE0F}", "#A9A9A9"),
        ("table", "Table", "\u{26E9}", "#654321"),
        ("shelves", "Shelves", "\u{1F5C4}\u{FE0F}", "#C19A6B"),
    ]
    .into_iter()
    .map(|(id, label, icon, color)| CustomObject {
        id: ObjectId::new(id),
        label: label.to_owned(),
        icon: icon.to_owned(),
        color: color.to_owned(),
        emoji: None,
    })
    .collect()
}

fn seed_id(key: &str) -> String {
    format!("seed:{key}")
}

/// Small scene with one player, one opponent, a wall segment and a chest.
#[must_use]
pub fn demo_scene(id: SnapshotId) -> SceneSnapshot {
    let config = MapConfig::default();

    let mut maelin = DEFAULT_PARTY[0].spawn(CellCoord::new(2, 2));
    maelin.id = CharacterId::new(seed_id("maelin"));
    maelin.hp = 7;
    maelin.initiative = 1;

    let mut zombie = Character::npc("V Rude Zombie", CellCoord::new(8, 6), "#EF4444");
    zombie.id = CharacterId::new(seed_id("zombie"));
    zombie.initiative = 20;
    zombie.npc_type = Some(NpcKind::Standard);

    let tile = |key: &str, kind: TerrainKind, column: u32, row: u32| TerrainTile {
        id: TerrainId::new(seed_id(key)),
        kind,
        cell: CellCoord::new(column, row),
    };
    let terrain = vec![
        tile("t1", TerrainKind::WALL, 4, 4),
        tile("t2", TerrainKind::WALL, 5, 4),
        tile("t3", TerrainKind::WALL, 6, 4),
        tile("chest", TerrainKind::Custom(ObjectId::new("chest")), 10, 8),
    ];

    SceneSnapshot {
        characters: vec![maelin, zombie],
        terrain,
        measurements: Vec::new(),
        map_width: config.width,
        map_height: config.height,
        grid_scale: config.grid_scale,
        round: 1,
        current_turn: 0,
        selected_tool: Tool::Select,
        custom_objects: default_custom_objects(),
        id,
        distance_rule: config.distance_rule,
        initiative_mode: InitiativeMode::Auto,
        initiative_order: Vec::new(),
    }
}
