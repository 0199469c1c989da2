//! Single-clue deduction over the frontier.
//!
//! Every revealed cell is looked at on its own: when its remaining mine count equals
//! the number of hidden cells around it they are all mines, and when it is zero they
//! are all safe. Clues are never combined with each other, and nothing here guesses.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// Derived as a mine by one clue and as safe by another.
    Both { coords: Coord2 },
    /// The clue cannot be satisfied by its hidden neighbors, usually a misread.
    ImpossibleClue {
        clue: Coord2,
        mines_remaining: i8,
        hidden: usize,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    pub flags: BTreeSet<Coord2>,
    pub safe: BTreeSet<Coord2>,
    pub conflicts: Vec<Conflict>,
}

impl Deductions {
    /// Nothing certain to act on.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.safe.is_empty()
    }
}

/// Hidden neighbors of `coords` when all of them must be mines.
pub fn deduce_flags(board: &Board, coords: Coord2) -> SmallVec<[Coord2; 8]> {
    let Some(remaining) = board.mines_remaining(coords) else {
        return SmallVec::new();
    };
    let hidden = board.hidden_neighbors(coords);
    if remaining > 0 && remaining as usize == hidden.len() {
        hidden
    } else {
        SmallVec::new()
    }
}

/// Hidden neighbors of `coords` when none of them can be a mine.
pub fn deduce_safe(board: &Board, coords: Coord2) -> SmallVec<[Coord2; 8]> {
    match board.mines_remaining(coords) {
        Some(0) => board.hidden_neighbors(coords),
        _ => SmallVec::new(),
    }
}

/// Unions the single-clue deductions of every frontier cell. Cells claimed by both
/// sides are left out of both.
pub fn deduce(board: &Board) -> Deductions {
    let mut out = Deductions::default();

    for clue in board.active_cells() {
        let Some(remaining) = board.mines_remaining(clue) else {
            continue;
        };
        let hidden = board.hidden_neighbors(clue).len();
        if remaining < 0 || remaining as usize > hidden {
            out.conflicts.push(Conflict::ImpossibleClue {
                clue,
                mines_remaining: remaining,
                hidden,
            });
            continue;
        }

        out.flags.extend(deduce_flags(board, clue));
        out.safe.extend(deduce_safe(board, clue));
    }

    let both: Vec<Coord2> = out.flags.intersection(&out.safe).copied().collect();
    for coords in both {
        out.flags.remove(&coords);
        out.safe.remove(&coords);
        out.conflicts.push(Conflict::Both { coords });
    }

    out
}
