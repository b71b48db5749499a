#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Token movement: grid rasterization, wall clipping and movement costs.
//!
//! Paths are rasterized greedily in eight directions: every step moves
//! diagonally while both axes still differ, then straight along the
//! remaining axis. The same walk drives wall clipping and cost
//! accumulation so that previews and committed moves always agree.

use battlemap_core::{CellCoord, CharacterId, Command, DistanceRule, MapConfig};

/// A single step of a rasterized path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathStep {
    /// Cell entered by the step.
    pub cell: CellCoord,
    /// Whether both axes changed.
    pub diagonal: bool,
}

/// Rasterizes the path from `from` to `to`, excluding the starting cell.
#[must_use]
pub fn rasterize(from: CellCoord, to: CellCoord) -> Vec<PathStep> {
    let (dx, dy) = from.offset_to(to);
    let mut steps = Vec::with_capacity(dx.max(dy) as usize);
    let mut current = from;
    while current != to {
        let next = CellCoord::new(
            step_toward(current.column(), to.column()),
            step_toward(current.row(), to.row()),
        );
        steps.push(PathStep {
            cell: next,
            diagonal: next.column() != current.column() && next.row() != current.row(),
        });
        current = next;
    }
    steps
}

fn step_toward(value: u32, target: u32) -> u32 {
    match value.cmp(&target) {
        std::cmp::Ordering::Less => value + 1,
        std::cmp::Ordering::Greater => value - 1,
        std::cmp::Ordering::Equal => value,
    }
}

/// Reason a walk stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// The next cell is a wall.
    Wall,
    /// A diagonal step would squeeze between two walls.
    Corner,
}

/// Result of walking a path until the first obstruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipOutcome {
    /// Furthest cell reached without entering a wall.
    pub last_free: CellCoord,
    /// Whether the walk stopped before the destination.
    pub blocked: bool,
    /// Cell the blocked step tried to enter.
    pub blocked_at: Option<CellCoord>,
    /// Why the walk stopped.
    pub reason: Option<BlockReason>,
}

/// Walks from `start` towards `end` and stops at the first obstruction.
///
/// A diagonal step is refused when both orthogonally adjacent cells it
/// squeezes between are walls, even if its destination is open.
pub fn clip_movement<F>(start: CellCoord, end: CellCoord, is_wall_at: F) -> ClipOutcome
where
    F: Fn(CellCoord) -> bool,
{
    let mut last_free = start;
    for step in rasterize(start, end) {
        let reason = if step.diagonal
            && is_wall_at(CellCoord::new(step.cell.column(), last_free.row()))
            && is_wall_at(CellCoord::new(last_free.column(), step.cell.row()))
        {
            Some(BlockReason::Corner)
        } else if is_wall_at(step.cell) {
            Some(BlockReason::Wall)
        } else {
            None
        };

        if reason.is_some() {
            return ClipOutcome {
                last_free,
                blocked: true,
                blocked_at: Some(step.cell),
                reason,
            };
        }
        last_free = step.cell;
    }

    ClipOutcome {
        last_free: end,
        blocked: false,
        blocked_at: None,
        reason: None,
    }
}

/// Cost breakdown of a single movement step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveStep {
    /// Cell entered by the step.
    pub cell: CellCoord,
    /// Whether the step was diagonal.
    pub diagonal: bool,
    /// Cost before terrain modifiers.
    pub base_cost: f64,
    /// Whether the entered cell is difficult terrain.
    pub difficult: bool,
    /// Cost after terrain modifiers.
    pub step_cost: f64,
}

/// Total and per-step cost of a move.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoveCost {
    /// Sum of step costs, rounded once.
    pub total: u32,
    /// Breakdown of every step.
    pub steps: Vec<MoveStep>,
}

/// Accumulates the movement cost of walking from `from` to `to`.
///
/// Under `5105` the diagonal counter is local to this call, so the
/// first, third, fifth diagonal cost one square and the even ones two.
/// Entering difficult terrain doubles that step only.
pub fn measure_move_cost<F>(
    from: CellCoord,
    to: CellCoord,
    rule: DistanceRule,
    grid_scale: u32,
    is_difficult_at: F,
) -> MoveCost
where
    F: Fn(CellCoord) -> bool,
{
    let square = f64::from(grid_scale);
    let mut diagonals = 0_u32;
    let mut running = 0.0_f64;
    let mut steps = Vec::new();

    for step in rasterize(from, to) {
        let base_cost = match (rule, step.diagonal) {
            (_, false) | (DistanceRule::FiveE, true) => square,
            (DistanceRule::FiveTenFive, true) => {
                diagonals += 1;
                if diagonals % 2 == 0 {
                    square * 2.0
                } else {
                    square
                }
            }
            (DistanceRule::Euclidean, true) => square * std::f64::consts::SQRT_2,
        };
        let difficult = is_difficult_at(step.cell);
        let step_cost = if difficult { base_cost * 2.0 } else { base_cost };
        running += step_cost;
        steps.push(MoveStep {
            cell: step.cell,
            diagonal: step.diagonal,
            base_cost,
            difficult,
            step_cost,
        });
    }

    MoveCost {
        total: running.round() as u32,
        steps,
    }
}

/// Clipped path and the cost of its legal prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct MovePreview {
    /// Outcome of walking towards the hovered cell.
    pub clip: ClipOutcome,
    /// Cost of moving from the start to the last free cell.
    pub cost: MoveCost,
}

/// Clips the walk at walls, then costs the reachable prefix in one pass.
pub fn preview_move<W, D>(
    start: CellCoord,
    end: CellCoord,
    config: &MapConfig,
    is_wall_at: W,
    is_difficult_at: D,
) -> MovePreview
where
    W: Fn(CellCoord) -> bool,
    D: Fn(CellCoord) -> bool,
{
    let clip = clip_movement(start, end, is_wall_at);
    let cost = measure_move_cost(
        start,
        clip.last_free,
        config.distance_rule,
        config.grid_scale,
        is_difficult_at,
    );
    MovePreview { clip, cost }
}

#[derive(Clone, Debug)]
struct Grab {
    id: CharacterId,
    origin: CellCoord,
}

/// Drag-and-drop tool that moves a token as far as walls allow.
#[derive(Debug, Default)]
pub struct MoveTool {
    grab: Option<Grab>,
}

impl MoveTool {
    /// Picks up the token standing on `origin`.
    pub fn grab(&mut self, id: CharacterId, origin: CellCoord) {
        self.grab = Some(Grab { id, origin });
    }

    /// Token currently held, if any.
    #[must_use]
    pub fn held(&self) -> Option<&CharacterId> {
        self.grab.as_ref().map(|grab| &grab.id)
    }

    /// Preview of dropping the held token on `hovered`.
    #[must_use]
    pub fn preview<W, D>(
        &self,
        hovered: CellCoord,
        config: &MapConfig,
        is_wall_at: W,
        is_difficult_at: D,
    ) -> Option<MovePreview>
    where
        W: Fn(CellCoord) -> bool,
        D: Fn(CellCoord) -> bool,
    {
        let grab = self.grab.as_ref()?;
        Some(preview_move(
            grab.origin,
            hovered,
            config,
            is_wall_at,
            is_difficult_at,
        ))
    }

    /// Drops the held token, moving it to the last free cell towards `target`.
    ///
    /// Nothing is emitted when the token would not leave its cell.
    pub fn release<W>(&mut self, target: CellCoord, is_wall_at: W, out: &mut Vec<Command>)
    where
        W: Fn(CellCoord) -> bool,
    {
        let Some(grab) = self.grab.take() else {
            return;
        };
        let clip = clip_movement(grab.origin, target, is_wall_at);
        if clip.last_free != grab.origin {
            out.push(Command::MoveCharacter {
                id: grab.id,
                to: clip.last_free,
            });
        }
    }

    /// Puts the held token back without moving it.
    pub fn cancel(&mut self) {
        self.grab = None;
    }
}
