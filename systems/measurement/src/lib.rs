#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid distance rules and the two-click measuring tool.

use battlemap_core::{CellCoord, Command, DistanceRule};

/// Converts the offset between two cells into feet under the given rule.
///
/// Identical cells are always zero feet apart.
#[must_use]
pub fn measure_distance(
    from: CellCoord,
    to: CellCoord,
    rule: DistanceRule,
    feet_per_cell: u32,
) -> u32 {
    let (dx, dy) = from.offset_to(to);
    match rule {
        DistanceRule::FiveE => dx.max(dy) * feet_per_cell,
        DistanceRule::FiveTenFive => {
            let diagonal = dx.min(dy);
            let straight = dx.max(dy) - diagonal;
            (diagonal / 2) * feet_per_cell * 3
                + (diagonal % 2) * feet_per_cell
                + straight * feet_per_cell
        }
        DistanceRule::Euclidean => {
            let cells = f64::from(dx).hypot(f64::from(dy));
            (cells * f64::from(feet_per_cell)).round() as u32
        }
    }
}

/// Two-click measuring tool.
///
/// The first click anchors the measurement, the second one records it and
/// clears the anchor so the next click starts a fresh measurement.
#[derive(Debug, Default)]
pub struct MeasureTool {
    anchor: Option<CellCoord>,
}

impl MeasureTool {
    /// Cell the pending measurement starts from.
    #[must_use]
    pub fn anchor(&self) -> Option<CellCoord> {
        self.anchor
    }

    /// Distance from the anchor to a hovered cell, for live previews.
    #[must_use]
    pub fn preview(&self, hovered: CellCoord, rule: DistanceRule, feet_per_cell: u32) -> Option<u32> {
        self.anchor
            .map(|anchor| measure_distance(anchor, hovered, rule, feet_per_cell))
    }

    /// Handles a click on `cell`, emitting a measurement on the second click.
    pub fn click(
        &mut self,
        cell: CellCoord,
        rule: DistanceRule,
        feet_per_cell: u32,
        out: &mut Vec<Command>,
    ) {
        match self.anchor.take() {
            None => self.anchor = Some(cell),
            Some(start) => out.push(Command::AddMeasurement {
                start,
                end: cell,
                distance: measure_distance(start, cell, rule, feet_per_cell),
            }),
        }
    }

    /// Drops a pending anchor without recording anything.
    pub fn cancel(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_ten_five_charges_every_second_diagonal_double() {
        let origin = CellCoord::new(0, 0);
        let costs: Vec<u32> = (1..=4)
            .map(|n| measure_distance(origin, CellCoord::new(n, n), DistanceRule::FiveTenFive, 5))
            .collect();
        assert_eq!(costs, vec![5, 15, 20, 30]);
    }

    #[test]
    fn euclidean_rounds_to_nearest_foot() {
        let distance = measure_distance(
            CellCoord::new(0, 0),
            CellCoord::new(1, 1),
            DistanceRule::Euclidean,
            5,
        );
        assert_eq!(distance, 7);
    }
}
