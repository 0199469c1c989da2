use core::ops::Index;

use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::*;

/// Where the mines are in a simulated game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MineLayout {
    mine_mask: Array2<bool>,
    mine_count: CellCount,
}

impl MineLayout {
    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(SweepError::EmptyBoard);
        }
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if !in_bounds(coords, size) {
                return Err(SweepError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        let mine_count = mine_mask.iter().filter(|&&is_mine| is_mine).count() as CellCount;
        Ok(Self {
            mine_mask,
            mine_count,
        })
    }

    /// Scatters `mines` mines uniformly, keeping `start` and its neighbors free when
    /// there is room, or at least `start` itself.
    pub fn random(size: Coord2, mines: CellCount, seed: u64, start: Option<Coord2>) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(SweepError::EmptyBoard);
        }
        let total = usize::from(mult(size.0, size.1));
        let mines = usize::from(mines).min(total);

        let mut reserved: Vec<Coord2> = Vec::new();
        if let Some(start) = start {
            if !in_bounds(start, size) {
                return Err(SweepError::InvalidCoords);
            }
            let zone: Vec<Coord2> = core::iter::once(start).chain(neighbors(start, size)).collect();
            if mines + zone.len() <= total {
                reserved = zone;
            } else if mines < total {
                log::warn!("cannot keep the opening area clear, only the opening cell is safe");
                reserved.push(start);
            } else {
                log::warn!("board is full of mines, opening cell cannot be safe");
            }
        }

        let mut candidates: Vec<Coord2> = iter_coords(size)
            .filter(|coords| !reserved.contains(coords))
            .collect();
        let mut rng = SmallRng::seed_from_u64(seed);
        let (chosen, _) = candidates.partial_shuffle(&mut rng, mines);

        Self::from_mine_coords(size, chosen)
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.mine_mask.dim();
        (dim.0 as Coord, dim.1 as Coord)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn safe_cell_count(&self) -> CellCount {
        mult(self.size().0, self.size().1) - self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        neighbors(coords, self.size()).filter(|&pos| self[pos]).count() as u8
    }
}

impl Index<Coord2> for MineLayout {
    type Output = bool;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.mine_mask[coords.to_nd_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_adjacent_mines() {
        let layout = MineLayout::from_mine_coords((3, 3), &[(0, 0), (2, 0)]).unwrap();
        assert_eq!(layout.mine_count(), 2);
        assert_eq!(layout.adjacent_mine_count((1, 0)), 2);
        assert_eq!(layout.adjacent_mine_count((1, 2)), 0);
        assert_eq!(layout.safe_cell_count(), 7);
    }

    #[test]
    fn rejects_mines_outside_the_grid() {
        let err = MineLayout::from_mine_coords((2, 2), &[(2, 0)]).unwrap_err();
        assert_eq!(err, SweepError::InvalidCoords);
    }

    #[test]
    fn random_layout_is_seeded_and_keeps_start_clear() {
        let a = MineLayout::random((10, 8), 10, 7, Some((4, 4))).unwrap();
        let b = MineLayout::random((10, 8), 10, 7, Some((4, 4))).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.mine_count(), 10);
        assert!(!a.contains_mine((4, 4)));
        assert_eq!(a.adjacent_mine_count((4, 4)), 0);
    }

    #[test]
    fn crowded_layout_only_keeps_start_cell() {
        let layout = MineLayout::random((3, 3), 7, 1, Some((1, 1))).unwrap();
        assert_eq!(layout.mine_count(), 7);
        assert!(!layout.contains_mine((1, 1)));
    }

    #[test]
    fn mine_count_is_capped_by_board_size() {
        let layout = MineLayout::random((2, 2), 10, 3, None).unwrap();
        assert_eq!(layout.mine_count(), 4);
    }
}
