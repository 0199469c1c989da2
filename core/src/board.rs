use core::fmt;
use core::ops::Index;

use hashbrown::HashSet;
use ndarray::Array2;
use smallvec::SmallVec;

use crate::*;

/// Outcome of writing a state into a cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StateChange {
    NoChange,
    Changed,
    /// The write would have moved a cell backwards and was dropped.
    Refused,
}

impl StateChange {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// The solver's picture of the game grid.
///
/// The board owns every [`Cell`]; cells refer to each other only by coordinates.
/// Alongside the grid it keeps the frontier: revealed cells that still touch a
/// hidden cell and can therefore yield deductions.
#[derive(Clone, Debug)]
pub struct Board {
    calibration: Calibration,
    cells: Array2<Cell>,
    active: HashSet<Coord2>,
}

impl Board {
    pub fn build(calibration: &Calibration) -> Result<Self> {
        calibration.validate()?;

        let size = calibration.size;
        // iter_coords walks x-major, matching the standard layout of an (x, y) array
        let cells = iter_coords(size)
            .map(|coords| Ok(Cell::new(coords, calibration.region_of(coords)?)))
            .collect::<Result<Vec<_>>>()?;
        let mut cells = Array2::from_shape_vec(size.to_nd_index(), cells)
            .map_err(|_| SweepError::InvalidBoardShape)?;

        for coords in iter_coords(size) {
            for other in neighbors(coords, size) {
                cells[coords.to_nd_index()].link(other);
                cells[other.to_nd_index()].link(coords);
            }
        }

        log::debug!(
            "built {}x{} board at {:?}, cell size {}",
            size.0,
            size.1,
            calibration.origin,
            calibration.cell_size
        );

        Ok(Self {
            calibration: *calibration,
            cells,
            active: HashSet::new(),
        })
    }

    pub fn size(&self) -> Coord2 {
        self.calibration.size
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if in_bounds(coords, self.size()) {
            Ok(coords)
        } else {
            Err(SweepError::InvalidCoords)
        }
    }

    pub fn cell(&self, coords: Coord2) -> Option<&Cell> {
        self.cells.get(coords.to_nd_index())
    }

    pub fn state_at(&self, coords: Coord2) -> CellState {
        self[coords].state()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn neighbors(&self, coords: Coord2) -> &[Coord2] {
        self[coords].neighbors()
    }

    pub fn hidden_neighbors(&self, coords: Coord2) -> SmallVec<[Coord2; 8]> {
        self.neighbors(coords)
            .iter()
            .copied()
            .filter(|&pos| self.state_at(pos) == CellState::Hidden)
            .collect()
    }

    pub fn flagged_neighbors(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .iter()
            .filter(|&&pos| self.state_at(pos) == CellState::Flagged)
            .count() as u8
    }

    /// Mines still unaccounted for around a revealed cell: its number minus the
    /// flags next to it. `None` for any other state.
    pub fn mines_remaining(&self, coords: Coord2) -> Option<i8> {
        match self.state_at(coords) {
            CellState::Revealed(n) => Some(n as i8 - self.flagged_neighbors(coords) as i8),
            _ => None,
        }
    }

    pub fn is_active(&self, coords: Coord2) -> bool {
        self.active.contains(&coords)
    }

    /// Frontier cells in a stable order.
    pub fn active_cells(&self) -> Vec<Coord2> {
        let mut active: Vec<_> = self.active.iter().copied().collect();
        active.sort_unstable();
        active
    }

    /// Cells that still have to be sensed.
    pub fn unresolved(&self) -> Vec<Coord2> {
        self.cells
            .iter()
            .filter(|cell| cell.state().is_unresolved())
            .map(Cell::coords)
            .collect()
    }

    /// No cell is left covered or unread.
    pub fn is_resolved(&self) -> bool {
        self.cells.iter().all(|cell| !cell.state().is_unresolved())
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|cell| cell.state() == state).count()
    }

    /// Writes `state` into a cell unless that would move it backwards, then
    /// updates the frontier around it.
    pub fn apply_state(&mut self, coords: Coord2, state: CellState) -> Result<StateChange> {
        let coords = self.validate_coords(coords)?;
        let current = self.state_at(coords);

        if current == state {
            return Ok(StateChange::NoChange);
        }
        if !current.can_become(state) {
            log::warn!(
                "refusing to move cell {:?} from {:?} to {:?}",
                coords,
                current,
                state
            );
            return Ok(StateChange::Refused);
        }

        self.cells[coords.to_nd_index()].set_state(state);
        self.update_frontier(coords);
        Ok(StateChange::Changed)
    }

    /// Senses the given cells, skipping every cell that is already revealed or
    /// flagged. Returns the cells whose state changed.
    pub fn refresh<S: ScreenCapture + ?Sized>(
        &mut self,
        sensor: &CellSensor,
        screen: &mut S,
        coords: impl IntoIterator<Item = Coord2>,
    ) -> Result<Vec<Coord2>> {
        let mut changed = Vec::new();

        for coords in coords {
            let coords = self.validate_coords(coords)?;
            if !self.state_at(coords).is_unresolved() {
                continue;
            }

            let sensed = sensor.sense(screen, &mut self.cells[coords.to_nd_index()]);
            let state = match sensed {
                Ok(state) => state,
                Err(err) => {
                    self.apply_state(coords, CellState::Error)?;
                    return Err(err);
                }
            };

            if self.apply_state(coords, state)?.has_update() {
                changed.push(coords);
            }
        }

        if !changed.is_empty() {
            log::trace!("refresh changed {} cells", changed.len());
        }
        Ok(changed)
    }

    /// Senses every unresolved cell.
    pub fn refresh_all<S: ScreenCapture + ?Sized>(
        &mut self,
        sensor: &CellSensor,
        screen: &mut S,
    ) -> Result<Vec<Coord2>> {
        let pending = self.unresolved();
        self.refresh(sensor, screen, pending)
    }

    /// Drops frontier cells that no longer touch a hidden cell. Returns how many
    /// were dropped.
    pub fn prune_frontier(&mut self) -> usize {
        let before = self.active.len();
        let cells = &self.cells;
        self.active.retain(|&coords| {
            cells[coords.to_nd_index()]
                .neighbors()
                .iter()
                .any(|&pos| cells[pos.to_nd_index()].state() == CellState::Hidden)
        });
        before - self.active.len()
    }

    fn update_frontier(&mut self, coords: Coord2) {
        let mut touched: SmallVec<[Coord2; 9]> = SmallVec::new();
        touched.push(coords);
        touched.extend_from_slice(self.neighbors(coords));

        for pos in touched {
            let frontier = matches!(self.state_at(pos), CellState::Revealed(_))
                && !self.hidden_neighbors(pos).is_empty();
            if frontier {
                self.active.insert(pos);
            } else {
                self.active.remove(&pos);
            }
        }
    }
}

impl Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.cells[coords.to_nd_index()]
    }
}

/// One glyph per cell, one row per line.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.size();
        for y in 0..height {
            for x in 0..width {
                write!(f, "{}", self.state_at((x, y)).glyph())?;
            }
            if y + 1 < height {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
