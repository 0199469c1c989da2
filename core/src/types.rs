/// Single grid axis used for board width, height, and cell positions.
pub type Coord = u8;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u16;

/// Grid coordinates `(x, y)`, that is `(column, row)`.
pub type Coord2 = (Coord, Coord);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

/// Whether `coords` lies inside a grid of `size`.
pub const fn in_bounds(coords: Coord2, size: Coord2) -> bool {
    coords.0 < size.0 && coords.1 < size.1
}

/// Iterates every coordinate of a grid of `size`, column by column.
pub fn iter_coords(size: Coord2) -> impl Iterator<Item = Coord2> {
    let (x_end, y_end) = size;
    (0..x_end).flat_map(move |x| (0..y_end).map(move |y| (x, y)))
}

/// The up-to-eight cells touching `center`, clipped to `bounds`.
pub fn neighbors(center: Coord2, bounds: Coord2) -> NeighborIter {
    NeighborIter::new(center, bounds)
}

const DISPLACEMENTS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Applies `delta` to `coords`, returning a value only when it remains in bounds.
fn apply_delta(coords: Coord2, delta: (i8, i8), bounds: Coord2) -> Option<Coord2> {
    let next = (
        coords.0.checked_add_signed(delta.0)?,
        coords.1.checked_add_signed(delta.1)?,
    );
    in_bounds(next, bounds).then_some(next)
}

#[derive(Debug, Clone)]
pub struct NeighborIter {
    center: Coord2,
    bounds: Coord2,
    index: u8,
}

impl NeighborIter {
    fn new(center: Coord2, bounds: Coord2) -> Self {
        Self {
            center,
            bounds,
            index: 0,
        }
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&delta) = DISPLACEMENTS.get(usize::from(self.index)) {
            self.index += 1;
            if let Some(next) = apply_delta(self.center, delta, self.bounds) {
                return Some(next);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_has_three_neighbors() {
        let found: Vec<_> = neighbors((0, 0), (3, 3)).collect();
        assert_eq!(found, vec![(1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn single_cell_grid_has_no_neighbors() {
        assert_eq!(neighbors((0, 0), (1, 1)).count(), 0);
    }

    #[test]
    fn far_edge_is_clipped() {
        let found: Vec<_> = neighbors((2, 1), (3, 2)).collect();
        assert_eq!(found, vec![(1, 0), (2, 0), (1, 1)]);
    }

    #[test]
    fn iter_coords_covers_grid() {
        let all: Vec<_> = iter_coords((2, 3)).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all.first(), Some(&(0, 0)));
        assert_eq!(all.last(), Some(&(1, 2)));
    }
}
