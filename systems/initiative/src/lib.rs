#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Initiative tracking: capping, ordering, turn advancement and d20 rolls.
//!
//! The free functions are pure and shared with the world, which uses them to
//! keep the manual order and the turn pointer consistent. [`Initiative`] is
//! the stateful system that owns the dice and turns roll requests into
//! [`Command::RecordInitiativeRoll`] batches.

use battlemap_core::{
    Character, CharacterId, Command, InitiativeMode, InitiativeRoll, OrderShift, RollFlag,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod roster;

/// Highest initiative value a character may hold.
pub const INITIATIVE_CAP: i32 = 20;

/// Applies the initiative ceiling. There is no floor.
#[must_use]
pub fn cap_initiative(value: i32) -> i32 {
    value.min(INITIATIVE_CAP)
}

/// Rebuilds a manual order after the character set changed.
///
/// Identifiers that no longer exist are dropped, survivors keep their
/// relative order and new identifiers are appended in `current` order.
#[must_use]
pub fn reconcile_order(previous: &[CharacterId], current: &[CharacterId]) -> Vec<CharacterId> {
    let mut order: Vec<CharacterId> = previous
        .iter()
        .filter(|id| current.contains(id))
        .cloned()
        .collect();
    for id in current {
        if !order.contains(id) {
            order.push(id.clone());
        }
    }
    order
}

/// Identifiers sorted by initiative, highest first, ties in insertion order.
#[must_use]
pub fn sorted_by_initiative(characters: &[Character]) -> Vec<CharacterId> {
    let mut ranked: Vec<&Character> = characters.iter().collect();
    ranked.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    ranked.into_iter().map(|character| character.id.clone()).collect()
}

/// Resolves the turn order for the active initiative mode.
///
/// In manual mode identifiers that do not resolve to a character are skipped.
#[must_use]
pub fn turn_order(
    characters: &[Character],
    mode: InitiativeMode,
    manual_order: &[CharacterId],
) -> Vec<CharacterId> {
    match mode {
        InitiativeMode::Auto => sorted_by_initiative(characters),
        InitiativeMode::Manual => manual_order
            .iter()
            .filter(|id| characters.iter().any(|character| &character.id == *id))
            .cloned()
            .collect(),
    }
}

/// Computes the turn pointer after passing the turn.
///
/// Returns the new `(turn, round)`; wrapping back to the first combatant
/// starts a new round.
#[must_use]
pub fn advance_turn(turn: u32, round: u32, combatants: usize) -> (u32, u32) {
    let len = u32::try_from(combatants.max(1)).unwrap_or(u32::MAX);
    let next = turn.saturating_add(1) % len;
    if next == 0 {
        (next, round.saturating_add(1))
    } else {
        (next, round)
    }
}

/// Computes the turn pointer after stepping back; never moves past the first slot.
#[must_use]
pub fn rewind_turn(turn: u32) -> u32 {
    turn.saturating_sub(1)
}

/// Swaps a character with its neighbour in the manual order.
///
/// Returns `false` when the identifier is absent or already at the edge.
pub fn shift_in_order(order: &mut [CharacterId], id: &CharacterId, shift: OrderShift) -> bool {
    let Some(index) = order.iter().position(|candidate| candidate == id) else {
        return false;
    };
    let neighbour = match shift {
        OrderShift::Up if index > 0 => index - 1,
        OrderShift::Down if index + 1 < order.len() => index + 1,
        _ => return false,
    };
    order.swap(index, neighbour);
    true
}

/// Rolls a single twenty-sided die.
pub fn roll_d20<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=20)
}

/// Rolls initiative for one character.
///
/// Advantage keeps the higher of two dice, disadvantage the lower. The
/// total is die plus modifier and the capped value is what becomes the
/// character's initiative.
pub fn roll_initiative<R: Rng + ?Sized>(
    rng: &mut R,
    modifier: i32,
    flag: Option<RollFlag>,
) -> InitiativeRoll {
    let first = roll_d20(rng);
    let second = roll_d20(rng);
    let die = match flag {
        Some(RollFlag::Advantage) => first.max(second),
        Some(RollFlag::Disadvantage) => first.min(second),
        None => first,
    };
    let total = i32::from(die) + modifier;
    InitiativeRoll {
        die,
        modifier,
        total,
        capped: cap_initiative(total),
        flags: flag,
    }
}

/// Which characters a roll request applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RollScope {
    /// Every character.
    #[default]
    All,
    /// Player characters only.
    Players,
    /// Non-player characters only.
    Npcs,
    /// Only the characters currently selected by the host.
    Selected,
}

impl RollScope {
    fn includes(self, character: &Character, selected: &[CharacterId]) -> bool {
        match self {
            RollScope::All => true,
            RollScope::Players => character.is_player,
            RollScope::Npcs => !character.is_player,
            RollScope::Selected => selected.contains(&character.id),
        }
    }
}

/// Parameters of a group initiative roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollPreset {
    /// Characters that roll.
    pub scope: RollScope,
    /// Whether each character's modifier is added.
    pub use_modifiers: bool,
    /// Advantage or disadvantage applied to every roll.
    pub flag: Option<RollFlag>,
}

impl Default for RollPreset {
    fn default() -> Self {
        Self {
            scope: RollScope::All,
            use_modifiers: true,
            flag: None,
        }
    }
}

/// Stateful system that rolls initiative with a seedable random source.
#[derive(Debug)]
pub struct Initiative {
    rng: ChaCha8Rng,
}

impl Initiative {
    /// Creates a system whose dice are fully determined by `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Random source backing the dice, for callers that roll in bulk.
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Rolls for a single character.
    pub fn roll(&mut self, modifier: i32, flag: Option<RollFlag>) -> InitiativeRoll {
        roll_initiative(&mut self.rng, modifier, flag)
    }

    /// Emits one roll command per character covered by the preset.
    pub fn roll_for_scope(
        &mut self,
        preset: RollPreset,
        characters: &[Character],
        selected: &[CharacterId],
        out: &mut Vec<Command>,
    ) {
        for character in characters
            .iter()
            .filter(|character| preset.scope.includes(character, selected))
        {
            let modifier = if preset.use_modifiers {
                character.initiative_mod.unwrap_or(0)
            } else {
                0
            };
            out.push(Command::RecordInitiativeRoll {
                id: character.id.clone(),
                roll: self.roll(modifier, preset.flag),
            });
        }
    }
}

impl Default for Initiative {
    fn default() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<CharacterId> {
        values.iter().map(|value| CharacterId::new(*value)).collect()
    }

    #[test]
    fn reconcile_drops_missing_and_appends_new() {
        let previous = ids(&["c", "a", "b"]);
        let current = ids(&["a", "b", "d"]);
        assert_eq!(reconcile_order(&previous, &current), ids(&["a", "b", "d"]));

        let previous = ids(&["b", "a"]);
        let current = ids(&["a", "b", "c"]);
        assert_eq!(reconcile_order(&previous, &current), ids(&["b", "a", "c"]));
    }

    #[test]
    fn advancing_past_last_combatant_starts_new_round() {
        assert_eq!(advance_turn(0, 1, 3), (1, 1));
        assert_eq!(advance_turn(2, 1, 3), (0, 2));
        assert_eq!(advance_turn(0, 4, 0), (0, 5));
        assert_eq!(rewind_turn(0), 0);
        assert_eq!(rewind_turn(2), 1);
    }

    #[test]
    fn shift_respects_edges() {
        let mut order = ids(&["a", "b", "c"]);
        assert!(shift_in_order(&mut order, &CharacterId::new("b"), OrderShift::Up));
        assert_eq!(order, ids(&["b", "a", "c"]));
        assert!(!shift_in_order(&mut order, &CharacterId::new("b"), OrderShift::Up));
        assert!(!shift_in_order(&mut order, &CharacterId::new("c"), OrderShift::Down));
        assert!(!shift_in_order(&mut order, &CharacterId::new("z"), OrderShift::Down));
    }

    #[test]
    fn capped_value_never_exceeds_ceiling() {
        let mut initiative = Initiative::from_seed(7);
        for _ in 0..200 {
            let roll = initiative.roll(9, Some(RollFlag::Advantage));
            assert!((1..=20).contains(&roll.die));
            assert_eq!(roll.total, i32::from(roll.die) + 9);
            assert!(roll.capped <= INITIATIVE_CAP);
        }
        assert_eq!(cap_initiative(-3), -3);
    }
}
