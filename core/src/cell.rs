use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// What the solver currently believes about a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Not sensed yet.
    #[default]
    Unknown,
    Hidden,
    Revealed(u8),
    Flagged,
    /// Sensing gave up on this cell.
    Error,
}

impl CellState {
    /// Cells that still need sensing.
    pub const fn is_unresolved(self) -> bool {
        matches!(self, Self::Unknown | Self::Hidden)
    }

    /// Cells that are never sensed again.
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Revealed(_) | Self::Flagged)
    }

    /// Allowed transitions: `Unknown` may become anything, `Hidden` may be
    /// uncovered, flagged or fail, and every other state is final.
    pub const fn can_become(self, next: CellState) -> bool {
        use CellState::*;
        match (self, next) {
            (Unknown, _) => true,
            (Hidden, Unknown) => false,
            (Hidden, _) => true,
            (Revealed(a), Revealed(b)) => a == b,
            (Flagged, Flagged) => true,
            (Error, Error) => true,
            _ => false,
        }
    }

    pub const fn glyph(self) -> char {
        use CellState::*;
        match self {
            Unknown => '?',
            Hidden => '#',
            Revealed(0) => '.',
            Revealed(n) if n <= 9 => (b'0' + n) as char,
            Revealed(_) => '*',
            Flagged => 'F',
            Error => '!',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    coords: Coord2,
    region: PixelRect,
    state: CellState,
    neighbors: SmallVec<[Coord2; 8]>,
    identification_failures: u8,
}

impl Cell {
    pub(crate) fn new(coords: Coord2, region: PixelRect) -> Self {
        Self {
            coords,
            region,
            state: CellState::Unknown,
            neighbors: SmallVec::new(),
            identification_failures: 0,
        }
    }

    pub fn coords(&self) -> Coord2 {
        self.coords
    }

    pub fn region(&self) -> PixelRect {
        self.region
    }

    /// Screen position clicks are aimed at.
    pub fn center(&self) -> ScreenPoint {
        self.region.center()
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn neighbors(&self) -> &[Coord2] {
        &self.neighbors
    }

    pub fn identification_failures(&self) -> u8 {
        self.identification_failures
    }

    /// Records `other` as adjacent, keeping the list sorted and free of duplicates.
    pub(crate) fn link(&mut self, other: Coord2) {
        if other == self.coords {
            return;
        }
        if let Err(pos) = self.neighbors.binary_search(&other) {
            self.neighbors.insert(pos, other);
        }
    }

    pub(crate) fn set_state(&mut self, state: CellState) {
        self.state = state;
    }

    pub(crate) fn record_failure(&mut self) -> u8 {
        self.identification_failures = self.identification_failures.saturating_add(1);
        self.identification_failures
    }

    pub(crate) fn reset_failures(&mut self) {
        self.identification_failures = 0;
    }
}
