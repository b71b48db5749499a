use battlemap_core::{CellCoord, Character, Command, DistanceRule, MapConfig, TerrainKind};
use battlemap_system_movement::{
    clip_movement, measure_move_cost, preview_move, BlockReason, MoveTool,
};
use battlemap_world::{self as world, query, World};

fn world_with_terrain(tiles: &[(TerrainKind, CellCoord)]) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    for (kind, cell) in tiles {
        world::apply(
            &mut world,
            Command::PlaceTerrain {
                kind: kind.clone(),
                cell: *cell,
            },
            &mut events,
        );
    }
    world
}

#[test]
fn clip_without_walls_reaches_destination() {
    let world = World::new();
    let outcome = clip_movement(CellCoord::new(1, 1), CellCoord::new(6, 3), |cell| {
        query::is_wall_at(&world, cell)
    });
    assert!(!outcome.blocked);
    assert_eq!(outcome.last_free, CellCoord::new(6, 3));
    assert_eq!(outcome.reason, None);
}

#[test]
fn clip_stops_before_wall() {
    let world = world_with_terrain(&[(TerrainKind::WALL, CellCoord::new(2, 0))]);
    let outcome = clip_movement(CellCoord::new(0, 0), CellCoord::new(4, 0), |cell| {
        query::is_wall_at(&world, cell)
    });
    assert!(outcome.blocked);
    assert_eq!(outcome.last_free, CellCoord::new(1, 0));
    assert_eq!(outcome.blocked_at, Some(CellCoord::new(2, 0)));
    assert_eq!(outcome.reason, Some(BlockReason::Wall));
}

#[test]
fn clip_refuses_to_squeeze_between_corner_walls() {
    let world = world_with_terrain(&[
        (TerrainKind::WALL, CellCoord::new(1, 0)),
        (TerrainKind::WALL, CellCoord::new(0, 1)),
    ]);
    let outcome = clip_movement(CellCoord::new(0, 0), CellCoord::new(1, 1), |cell| {
        query::is_wall_at(&world, cell)
    });
    assert!(outcome.blocked);
    assert_eq!(outcome.last_free, CellCoord::new(0, 0));
    assert_eq!(outcome.blocked_at, Some(CellCoord::new(1, 1)));
    assert_eq!(outcome.reason, Some(BlockReason::Corner));
}

#[test]
fn a_single_flanking_wall_does_not_block_diagonal() {
    let world = world_with_terrain(&[(TerrainKind::WALL, CellCoord::new(1, 0))]);
    let outcome = clip_movement(CellCoord::new(0, 0), CellCoord::new(2, 2), |cell| {
        query::is_wall_at(&world, cell)
    });
    assert!(!outcome.blocked);
}

#[test]
fn non_wall_terrain_is_passable() {
    let world = world_with_terrain(&[
        (TerrainKind::DIFFICULT, CellCoord::new(1, 1)),
        (TerrainKind::from("water".to_owned()), CellCoord::new(2, 2)),
    ]);
    let outcome = clip_movement(CellCoord::new(0, 0), CellCoord::new(3, 3), |cell| {
        query::is_wall_at(&world, cell)
    });
    assert!(!outcome.blocked);
}

#[test]
fn alternating_diagonals_cost_five_ten_five_ten() {
    let cost = measure_move_cost(
        CellCoord::new(0, 0),
        CellCoord::new(4, 4),
        DistanceRule::FiveTenFive,
        5,
        |_| false,
    );
    let step_costs: Vec<f64> = cost.steps.iter().map(|step| step.step_cost).collect();
    assert_eq!(step_costs, vec![5.0, 10.0, 5.0, 10.0]);
    assert_eq!(cost.total, 30);
}

#[test]
fn chebyshev_rule_charges_one_square_per_step() {
    let cost = measure_move_cost(
        CellCoord::new(0, 0),
        CellCoord::new(3, 4),
        DistanceRule::FiveE,
        5,
        |_| false,
    );
    assert_eq!(cost.steps.len(), 4);
    assert_eq!(cost.total, 20);
}

#[test]
fn euclidean_diagonals_round_only_the_total() {
    let cost = measure_move_cost(
        CellCoord::new(0, 0),
        CellCoord::new(3, 3),
        DistanceRule::Euclidean,
        5,
        |_| false,
    );
    assert!(cost.steps.iter().all(|step| step.step_cost > 7.0));
    assert_eq!(cost.total, 21, "3 * 5 * sqrt(2) = 21.21");
}

#[test]
fn difficult_terrain_doubles_only_that_step() {
    let world = world_with_terrain(&[(TerrainKind::DIFFICULT, CellCoord::new(2, 0))]);
    let cost = measure_move_cost(
        CellCoord::new(0, 0),
        CellCoord::new(3, 0),
        DistanceRule::FiveE,
        5,
        |cell| query::is_difficult_at(&world, cell),
    );
    let breakdown: Vec<(bool, f64)> = cost
        .steps
        .iter()
        .map(|step| (step.difficult, step.step_cost))
        .collect();
    assert_eq!(breakdown, vec![(false, 5.0), (true, 10.0), (false, 5.0)]);
    assert_eq!(cost.total, 20);
    assert!(cost.steps.iter().all(|step| step.base_cost == 5.0));
}

#[test]
fn preview_costs_only_the_reachable_prefix() {
    let world = world_with_terrain(&[
        (TerrainKind::WALL, CellCoord::new(3, 3)),
        (TerrainKind::DIFFICULT, CellCoord::new(1, 1)),
    ]);
    let config = MapConfig {
        distance_rule: DistanceRule::FiveTenFive,
        ..MapConfig::default()
    };
    let preview = preview_move(
        CellCoord::new(0, 0),
        CellCoord::new(5, 5),
        &config,
        |cell| query::is_wall_at(&world, cell),
        |cell| query::is_difficult_at(&world, cell),
    );
    assert_eq!(preview.clip.last_free, CellCoord::new(2, 2));
    assert_eq!(preview.cost.steps.len(), 2);
    assert_eq!(preview.cost.total, 20, "difficult 5 doubled to 10, then a 10 diagonal");
}

#[test]
fn move_tool_commits_clipped_destination() {
    let mut world = world_with_terrain(&[(TerrainKind::WALL, CellCoord::new(4, 2))]);
    let hero = Character::player("Aria", CellCoord::new(2, 2), 31, "#F59E0B");
    let id = hero.id.clone();
    let mut events = Vec::new();
    world::apply(&mut world, Command::AddCharacter { character: hero }, &mut events);

    let mut tool = MoveTool::default();
    tool.grab(id.clone(), CellCoord::new(2, 2));
    assert_eq!(tool.held(), Some(&id));

    let mut commands = Vec::new();
    tool.release(
        CellCoord::new(6, 2),
        |cell| query::is_wall_at(&world, cell),
        &mut commands,
    );
    assert_eq!(tool.held(), None);
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    assert_eq!(
        query::character(&world, &id).map(|c| c.position),
        Some(CellCoord::new(3, 2))
    );
}

#[test]
fn move_tool_ignores_drop_on_origin() {
    let world = World::new();
    let mut tool = MoveTool::default();
    let mut commands = Vec::new();
    tool.grab(battlemap_core::CharacterId::new("a"), CellCoord::new(1, 1));
    tool.release(
        CellCoord::new(1, 1),
        |cell| query::is_wall_at(&world, cell),
        &mut commands,
    );
    assert!(commands.is_empty());
}
