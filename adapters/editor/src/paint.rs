use battlemap_core::{CellCoord, Command, TerrainKind};

/// Mouse button that started a paint gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintButton {
    /// Toggles: paints, or erases when the cell already holds the kind.
    Primary,
    /// Always erases.
    Secondary,
}

/// Whether a gesture adds or removes tiles. Decided once at gesture start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StrokeMode {
    Paint,
    Erase,
}

impl StrokeMode {
    pub(crate) fn command(self, kind: TerrainKind, cell: CellCoord) -> Command {
        match self {
            StrokeMode::Paint => Command::PlaceTerrain { kind, cell },
            StrokeMode::Erase => Command::EraseTerrain { kind, cell },
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PaintStroke {
    kind: TerrainKind,
    mode: StrokeMode,
    last: CellCoord,
}

impl PaintStroke {
    pub(crate) fn new(kind: TerrainKind, mode: StrokeMode, start: CellCoord) -> Self {
        Self {
            kind,
            mode,
            last: start,
        }
    }

    pub(crate) fn kind(&self) -> &TerrainKind {
        &self.kind
    }

    pub(crate) fn mode(&self) -> StrokeMode {
        self.mode
    }

    /// Moves the stroke onto `cell`; repeats of the last cell are skipped.
    pub(crate) fn enter(&mut self, cell: CellCoord) -> bool {
        if cell == self.last {
            return false;
        }
        self.last = cell;
        true
    }
}
