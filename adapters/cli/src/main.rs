#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for the battle map editor core.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use battlemap_core::{
    CellCoord, Command as SceneCommand, DistanceRule, MapConfig, SceneSnapshot, TerrainKind, Tool,
};
use battlemap_editor::{presets, EditorSession, PaintButton};
use battlemap_storage::{share, FileMapStore, MapStore};
use battlemap_system_measurement::measure_distance;
use battlemap_system_movement::preview_move;
use battlemap_system_peer_sync::{
    invite_link, GuestSession, LoopbackNetwork, PeerMetadata, ReplicaUpdate,
};
use battlemap_world::{self as world, query, World};
use clap::{Parser, Subcommand};
use config::Settings;
use tracing_subscriber::EnvFilter;

const INVITE_ORIGIN: &str = "http://localhost:3000";

/// Battle map editor tools.
#[derive(Debug, Parser)]
#[command(name = "battlemap", version, about = "Battle map editor tools", long_about = None)]
struct Cli {
    /// Configuration file; defaults to `battlemap.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding saved maps.
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Log filter, for example `debug` or `battlemap_system_peer_sync=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Measure the distance between two cells.
    Distance {
        /// Start cell as `x,y`.
        #[arg(value_parser = parse_cell)]
        from: CellCoord,
        /// End cell as `x,y`.
        #[arg(value_parser = parse_cell)]
        to: CellCoord,
        /// Distance rule: `5e`, `5105` or `euclidean`.
        #[arg(long)]
        rule: Option<DistanceRule>,
        /// Feet per cell.
        #[arg(long)]
        scale: Option<u32>,
    },
    /// Preview a token move, reporting where walls stop it and what it costs.
    Path {
        /// Start cell as `x,y`.
        #[arg(value_parser = parse_cell)]
        from: CellCoord,
        /// Target cell as `x,y`.
        #[arg(value_parser = parse_cell)]
        to: CellCoord,
        /// Wall cell as `x,y`; repeatable.
        #[arg(long = "wall", value_parser = parse_cell)]
        walls: Vec<CellCoord>,
        /// Difficult terrain cell as `x,y`; repeatable.
        #[arg(long = "difficult", value_parser = parse_cell)]
        difficult: Vec<CellCoord>,
        /// Distance rule: `5e`, `5105` or `euclidean`.
        #[arg(long)]
        rule: Option<DistanceRule>,
    },
    /// Create and save a new map.
    New {
        /// Map name.
        map: String,
        /// Start from the demo scene instead of a blank map.
        #[arg(long)]
        demo: bool,
    },
    /// List saved maps.
    List,
    /// Summarise a saved map.
    Show {
        /// Map name.
        map: String,
    },
    /// Print a single-line share string for a saved map.
    Share {
        /// Map name.
        map: String,
    },
    /// Save a share string under a map name.
    Import {
        /// Map name to save under.
        map: String,
        /// Share string produced by `share`.
        share: String,
    },
    /// Host a map in-process and report what connected guests receive.
    Demo {
        /// Map to host; the demo scene is used when it has no saved document.
        #[arg(default_value = "demo")]
        map: String,
        /// Number of guests to connect.
        #[arg(long, default_value_t = 2)]
        guests: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let settings = Settings::load(cli.config.as_deref())?;
    let storage_dir = cli.storage_dir.as_deref();

    match cli.command {
        Command::Distance {
            from,
            to,
            rule,
            scale,
        } => {
            let config = settings.map_config();
            let rule = rule.unwrap_or(config.distance_rule);
            let feet = measure_distance(from, to, rule, scale.unwrap_or(config.grid_scale));
            println!("{feet} ft");
            Ok(())
        }
        Command::Path {
            from,
            to,
            walls,
            difficult,
            rule,
        } => {
            let mut config = settings.map_config();
            if let Some(rule) = rule {
                config.distance_rule = rule;
            }
            print_path(config, from, to, &walls, &difficult)
        }
        Command::New { map, demo } => {
            let mut store = open_store(&settings, storage_dir)?;
            let mut editor = EditorSession::new(map, settings.editor_options());
            if demo {
                let id = editor.take_snapshot().id;
                let _ = editor.import_scene(presets::demo_scene(id));
            }
            let id = editor
                .save_map(&mut store)
                .with_context(|| format!("failed to save map `{}`", editor.map_name()))?;
            println!("saved `{}` (snapshot {id})", editor.map_name());
            Ok(())
        }
        Command::List => {
            let store = open_store(&settings, storage_dir)?;
            for name in store.list().context("failed to list saved maps")? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Show { map } => {
            let store = open_store(&settings, storage_dir)?;
            let snapshot = load_saved(&store, &map)?;
            print_summary(&map, &snapshot);
            Ok(())
        }
        Command::Share { map } => {
            let store = open_store(&settings, storage_dir)?;
            let snapshot = load_saved(&store, &map)?;
            let encoded = share::encode(&snapshot).context("failed to encode share string")?;
            println!("{encoded}");
            Ok(())
        }
        Command::Import { map, share } => {
            let snapshot = share::decode(&share).context("failed to decode share string")?;
            let mut store = open_store(&settings, storage_dir)?;
            let mut editor = EditorSession::open(map, settings.editor_options(), &store)
                .context("failed to open map")?;
            let _ = editor.import_scene(snapshot);
            let id = editor
                .save_map(&mut store)
                .with_context(|| format!("failed to save map `{}`", editor.map_name()))?;
            println!("imported `{}` (snapshot {id})", editor.map_name());
            Ok(())
        }
        Command::Demo { map, guests } => {
            let store = open_store(&settings, storage_dir)?;
            run_demo(&settings, &store, map, guests)
        }
    }
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let column = column
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("invalid column `{column}`: {error}"))?;
    let row = row
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok(CellCoord::new(column, row))
}

fn open_store(settings: &Settings, override_dir: Option<&Path>) -> Result<FileMapStore> {
    let store = FileMapStore::new(settings.storage_dir(override_dir)?);
    tracing::debug!(root = %store.root().display(), "using map storage");
    Ok(store)
}

fn load_saved(store: &FileMapStore, map: &str) -> Result<SceneSnapshot> {
    let Some(snapshot) = store
        .load(map)
        .with_context(|| format!("failed to load map `{map}`"))?
    else {
        bail!("no saved map named `{map}`");
    };
    Ok(snapshot)
}

fn print_path(
    config: MapConfig,
    from: CellCoord,
    to: CellCoord,
    walls: &[CellCoord],
    difficult: &[CellCoord],
) -> Result<()> {
    for cell in [from, to].iter().chain(walls).chain(difficult) {
        if !config.contains(*cell) {
            bail!(
                "cell {cell} lies outside the {}x{} map",
                config.width,
                config.height
            );
        }
    }

    let mut scene = World::with_config(config);
    let mut events = Vec::new();
    let placements = walls
        .iter()
        .map(|cell| (TerrainKind::WALL, *cell))
        .chain(difficult.iter().map(|cell| (TerrainKind::DIFFICULT, *cell)));
    for (kind, cell) in placements {
        world::apply(&mut scene, SceneCommand::PlaceTerrain { kind, cell }, &mut events);
    }

    let preview = preview_move(
        from,
        to,
        &config,
        |cell| query::is_wall_at(&scene, cell),
        |cell| query::is_difficult_at(&scene, cell),
    );
    for step in &preview.cost.steps {
        println!(
            "{}{}{} +{:.2} ft",
            step.cell,
            if step.diagonal { " diagonal" } else { "" },
            if step.difficult { " difficult" } else { "" },
            step.step_cost
        );
    }
    if let (Some(at), Some(reason)) = (preview.clip.blocked_at, preview.clip.reason) {
        println!("blocked at {at} ({reason:?}); stopping at {}", preview.clip.last_free);
    }
    println!(
        "total: {} ft ({})",
        preview.cost.total, config.distance_rule
    );
    Ok(())
}

fn print_summary(map: &str, snapshot: &SceneSnapshot) {
    let mut scene = World::new();
    let mut events = Vec::new();
    world::restore(&mut scene, snapshot, &mut events);
    let config = query::config(&scene);

    println!(
        "{map}: {}x{} cells, {} ft per cell, rule {}",
        config.width, config.height, config.grid_scale, config.distance_rule
    );
    println!(
        "round {}, {} terrain tile(s), {} measurement(s)",
        query::round(&scene),
        query::terrain(&scene).len(),
        query::measurements(&scene).len()
    );
    let active = query::active_character(&scene).map(|character| character.id.clone());
    for id in query::turn_order(&scene) {
        let Some(character) = query::character(&scene, &id) else {
            continue;
        };
        let marker = if active.as_ref() == Some(&id) { ">" } else { " " };
        let health = if character.is_player {
            format!("{}/{} hp", character.hp, character.max_hp)
        } else {
            format!("{} dmg", character.damage)
        };
        println!(
            "{marker} {:>3} {} at {} ({health})",
            character.initiative, character.name, character.position
        );
    }
}

fn run_demo(settings: &Settings, store: &FileMapStore, map: String, guests: usize) -> Result<()> {
    let mut editor = EditorSession::open(map, settings.editor_options(), store)
        .context("failed to open map")?;
    if query::characters(editor.world()).is_empty() {
        let id = editor.take_snapshot().id;
        let _ = editor.import_scene(presets::demo_scene(id));
    }

    let network = LoopbackNetwork::new();
    let mut session_ids = store.session_ids();
    let session_id = editor.host(&network, &mut session_ids);
    println!(
        "hosting `{}` at {}",
        editor.map_name(),
        invite_link(INVITE_ORIGIN, &session_id, editor.map_name())
    );

    let mut sessions = Vec::with_capacity(guests);
    for index in 1..=guests {
        let metadata = PeerMetadata::named(format!("Guest {index}"));
        sessions.push(
            GuestSession::join(&network, &session_id, metadata)
                .context("guest failed to join the host")?,
        );
    }
    let _ = editor.pump_network();
    if let Some(status) = editor.host_status() {
        println!("{status}");
    }

    let _ = editor.add_default_party(CellCoord::new(0, 0));
    let _ = editor.select_tool(Tool::Paint(TerrainKind::WALL));
    let _ = editor.begin_paint(CellCoord::new(3, 2), PaintButton::Primary);
    let _ = editor.extend_paint(CellCoord::new(3, 3));
    editor.end_paint();
    let _ = editor.next_turn();

    for (index, guest) in sessions.iter_mut().enumerate() {
        let applied = guest
            .pump()
            .into_iter()
            .filter(|update| matches!(update, ReplicaUpdate::Applied(_)))
            .count();
        let Some(replica) = guest.replica().snapshot() else {
            println!("guest {}: nothing received", index + 1);
            continue;
        };
        println!(
            "guest {}: {applied} update(s), snapshot {}, {} character(s), {} terrain tile(s), round {}",
            index + 1,
            replica.id,
            replica.characters.len(),
            replica.terrain.len(),
            replica.round
        );
    }
    Ok(())
}
