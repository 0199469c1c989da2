//! Screen-reading Minesweeper solver: senses cell colors, deduces certain moves
//! from single clues, and clicks them until nothing certain is left.

pub use board::*;
pub use cell::*;
pub use config::*;
pub use deduce::*;
pub use desktop::*;
pub use error::*;
pub use sensor::*;
pub use session::*;
pub use types::*;

mod board;
mod cell;
mod config;
mod deduce;
mod desktop;
mod error;
mod sensor;
mod session;
pub mod sim;
mod types;

/// Builds an empty board for the given screen geometry. Every cell starts out
/// [`CellState::Unknown`] until the first sensing pass.
pub fn setup(calibration: &Calibration) -> Result<Board> {
    Board::build(calibration)
}
