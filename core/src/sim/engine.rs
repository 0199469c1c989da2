use std::collections::{BTreeSet, VecDeque};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::MineLayout;
use crate::*;

/// Player-visible state of a simulated cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimCell {
    #[default]
    Hidden,
    Revealed(u8),
    Flagged,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Ready,
    Active,
    Won,
    Lost,
}

impl GameState {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Minimal Minesweeper rules: reveal with flood fill over blank cells, toggle flags,
/// win once every safe cell is open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayEngine {
    mine_layout: MineLayout,
    board: Array2<SimCell>,
    revealed_count: CellCount,
    state: GameState,
    triggered_mine: Option<Coord2>,
}

impl PlayEngine {
    pub fn new(mine_layout: MineLayout) -> Self {
        let size = mine_layout.size();
        Self {
            mine_layout,
            board: Array2::default(size.to_nd_index()),
            revealed_count: 0,
            state: GameState::Ready,
            triggered_mine: None,
        }
    }

    pub fn size(&self) -> Coord2 {
        self.mine_layout.size()
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn layout(&self) -> &MineLayout {
        &self.mine_layout
    }

    pub fn cell_at(&self, coords: Coord2) -> SimCell {
        self.board[coords.to_nd_index()]
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> bool {
        if !in_bounds(coords, self.size()) || self.state.is_finished() {
            return false;
        }
        let cell = &mut self.board[coords.to_nd_index()];
        match *cell {
            SimCell::Hidden => *cell = SimCell::Flagged,
            SimCell::Flagged => *cell = SimCell::Hidden,
            SimCell::Revealed(_) => return false,
        }
        true
    }

    /// Opens a hidden cell. Returns whether anything changed.
    pub fn reveal(&mut self, coords: Coord2) -> bool {
        if !in_bounds(coords, self.size()) || self.state.is_finished() {
            return false;
        }
        if self.cell_at(coords) != SimCell::Hidden {
            return false;
        }

        if self.mine_layout.contains_mine(coords) {
            self.triggered_mine = Some(coords);
            self.state = GameState::Lost;
            log::debug!("simulated mine hit at {:?}", coords);
            return true;
        }

        let mut visited = BTreeSet::from([coords]);
        let mut to_visit = VecDeque::from([coords]);
        while let Some(pos) = to_visit.pop_front() {
            if self.cell_at(pos) != SimCell::Hidden {
                continue;
            }
            let count = self.mine_layout.adjacent_mine_count(pos);
            self.board[pos.to_nd_index()] = SimCell::Revealed(count);
            self.revealed_count += 1;

            if count == 0 {
                for next in neighbors(pos, self.size()) {
                    if self.cell_at(next) == SimCell::Hidden && visited.insert(next) {
                        to_visit.push_back(next);
                    }
                }
            }
        }

        self.state = if self.revealed_count == self.mine_layout.safe_cell_count() {
            GameState::Won
        } else {
            GameState::Active
        };
        true
    }
}
