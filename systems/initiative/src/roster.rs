//! Naming, shading and placement of non-player characters added in bulk.

use battlemap_core::{CellCoord, Character, Command, RollFlag};
use rand::Rng;
use regex::RegexBuilder;

use crate::roll_initiative;

/// Red shades, light to dark. The default palette for hostile groups.
pub const RED_SHADES: [&str; 4] = ["#FECACA", "#FCA5A5", "#F87171", "#EF4444"];
/// Neutral gray shades, light to dark.
pub const GRAY_SHADES: [&str; 4] = ["#9CA3AF", "#6B7280", "#4B5563", "#374151"];

/// Colour family used for a bulk group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Palette {
    /// [`RED_SHADES`].
    #[default]
    Reds,
    /// [`GRAY_SHADES`].
    Grays,
}

impl Palette {
    /// Shades belonging to the palette.
    #[must_use]
    pub const fn shades(&self) -> &'static [&'static str] {
        match self {
            Palette::Reds => &RED_SHADES,
            Palette::Grays => &GRAY_SHADES,
        }
    }
}

/// Next free 1-based suffix for `"<base> N"` among existing non-players.
///
/// Matching is case-insensitive and player names are ignored.
#[must_use]
pub fn next_npc_index(base: &str, characters: &[Character]) -> u32 {
    let pattern = format!(r"^{}\s+(\d+)$", regex::escape(base));
    let Ok(matcher) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return 1;
    };
    let highest = characters
        .iter()
        .filter(|character| !character.is_player)
        .filter_map(|character| matcher.captures(&character.name))
        .filter_map(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    highest.saturating_add(1)
}

/// Picks a shade for a new group, avoiding shades already used by groups
/// that share the same initial.
///
/// The starting shade is a stable hash of the initial and base name, so
/// the same group name always lands on the same colour when it is free.
#[must_use]
pub fn pick_npc_shade<'a>(base: &str, characters: &[Character], palette: &[&'a str]) -> &'a str {
    if palette.is_empty() {
        return "";
    }
    let initial = name_initial(base);
    let used: Vec<&str> = characters
        .iter()
        .filter(|character| !character.is_player)
        .filter(|character| name_initial(&character.name) == initial)
        .map(|character| character.color.as_str())
        .collect();

    let start = positive_hash(&format!("{initial}:{base}")) as usize % palette.len();
    (0..palette.len())
        .map(|offset| palette[(start + offset) % palette.len()])
        .find(|shade| !used.contains(shade))
        .unwrap_or(palette[start])
}

fn name_initial(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map_or_else(|| "?".to_owned(), |ch| ch.to_uppercase().collect())
}

fn positive_hash(value: &str) -> u32 {
    let hash = value.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    });
    hash as u32
}

/// Finds up to `count` unblocked cells, scanning rightwards from `start`
/// and wrapping onto the next row (and back to the top) when needed.
///
/// The start is clamped into the map and at most `width * height` cells
/// are probed.
pub fn find_open_spawn_slots<F>(
    count: usize,
    start: CellCoord,
    width: u32,
    height: u32,
    is_blocked: F,
) -> Vec<CellCoord>
where
    F: Fn(CellCoord) -> bool,
{
    let mut slots = Vec::with_capacity(count);
    if width == 0 || height == 0 {
        return slots;
    }
    let mut column = start.column().min(width - 1);
    let mut row = start.row().min(height - 1);
    let budget = u64::from(width) * u64::from(height);
    let mut scanned = 0_u64;

    while slots.len() < count && scanned < budget {
        let cell = CellCoord::new(column, row);
        if !is_blocked(cell) {
            slots.push(cell);
        }
        scanned += 1;
        column += 1;
        if column >= width {
            column = 0;
            row += 1;
            if row >= height {
                row = 0;
            }
        }
    }
    slots
}

/// Request to add a numbered group of identical non-player characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkNpcRequest {
    /// Shared name prefix, for example `"Goblin"`.
    pub base_name: String,
    /// Number of characters to add.
    pub count: usize,
    /// Initiative modifier shared by the group.
    pub initiative_mod: i32,
    /// Whether to roll initiative for each member immediately.
    pub roll_on_create: bool,
    /// Advantage state applied to on-create rolls.
    pub flag: Option<RollFlag>,
    /// Colour family for the group.
    pub palette: Palette,
    /// Cell from which the spawn scan starts.
    pub anchor: CellCoord,
}

/// Builds the characters for a bulk request.
///
/// `is_blocked` must report walls and occupied cells; fewer characters than
/// requested are produced when the map runs out of open cells.
pub fn plan_bulk_npcs<R, F>(
    request: &BulkNpcRequest,
    characters: &[Character],
    map: (u32, u32),
    is_blocked: F,
    rng: &mut R,
) -> Vec<Character>
where
    R: Rng + ?Sized,
    F: Fn(CellCoord) -> bool,
{
    let base = request.base_name.trim();
    if base.is_empty() || request.count == 0 {
        return Vec::new();
    }
    let first_index = next_npc_index(base, characters);
    let shade = pick_npc_shade(base, characters, request.palette.shades());
    let slots = find_open_spawn_slots(request.count, request.anchor, map.0, map.1, is_blocked);

    slots
        .into_iter()
        .zip(first_index..)
        .map(|(cell, index)| {
            let mut npc = Character::npc(format!("{base} {index}"), cell, shade);
            npc.initiative_mod = Some(request.initiative_mod);
            if request.roll_on_create {
                let roll = roll_initiative(rng, request.initiative_mod, request.flag);
                npc.initiative = roll.capped;
                npc.last_roll = Some(roll);
            }
            npc
        })
        .collect()
}

/// Wraps planned characters into insertion commands.
pub fn bulk_commands(npcs: Vec<Character>, out: &mut Vec<Command>) {
    out.extend(
        npcs.into_iter()
            .map(|character| Command::AddCharacter { character }),
    );
}

/// Preset member of a party template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartyMember {
    /// Character name.
    pub name: &'static str,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Initiative modifier.
    pub initiative_mod: i32,
    /// Armour class.
    pub ac: u32,
    /// Token colour.
    pub color: &'static str,
}

/// The default adventuring party used by the demo scene.
pub const DEFAULT_PARTY: [PartyMember; 4] = [
    PartyMember {
        name: "Maelin",
        max_hp: 31,
        initiative_mod: 2,
        ac: 17,
        color: "#3B82F6",
    },
    PartyMember {
        name: "Aria",
        max_hp: 31,
        initiative_mod: 4,
        ac: 16,
        color: "#F59E0B",
    },
    PartyMember {
        name: "Farmish",
        max_hp: 30,
        initiative_mod: 0,
        ac: 10,
        color: "#10B981",
    },
    PartyMember {
        name: "Yustuss",
        max_hp: 44,
        initiative_mod: 0,
        ac: 18,
        color: "#A855F7",
    },
];

impl PartyMember {
    /// Instantiates the preset as a player character at `cell`.
    #[must_use]
    pub fn spawn(&self, cell: CellCoord) -> Character {
        let mut character = Character::player(self.name, cell, self.max_hp, self.color);
        character.initiative_mod = Some(self.initiative_mod);
        character.ac = Some(self.ac);
        character
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_hash_wraps_like_thirty_one_polynomial() {
        assert_eq!(positive_hash(""), 0);
        assert_eq!(positive_hash("a"), 97);
        assert_eq!(positive_hash("ab"), 97 * 31 + 98);
    }

    #[test]
    fn initial_falls_back_to_question_mark() {
        assert_eq!(name_initial("  zombie"), "Z");
        assert_eq!(name_initial("   "), "?");
    }
}
