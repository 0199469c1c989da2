use thiserror::Error;

use crate::{Coord2, PixelBlock, PixelRect};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SweepError {
    #[error("Board must have at least one column and one row")]
    EmptyBoard,
    #[error("Cell size must be non-zero")]
    ZeroCellSize,
    #[error("Board region does not fit in screen coordinates")]
    RegionOverflow,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Palette digit {0} is outside 1..=8")]
    InvalidPaletteNumber(u8),
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Could not capture {rect:?}: {reason}")]
    Capture { rect: PixelRect, reason: String },
    #[error("Cell {coords:?} could not be identified after {attempts} attempts")]
    Unidentified {
        coords: Coord2,
        attempts: u8,
        sample: Box<PixelBlock>,
    },
    #[error("Board did not respond to input for {rounds} rounds")]
    Unresponsive { rounds: u8 },
}

impl SweepError {
    /// Calibration problems are raised before any input reaches the game.
    pub const fn is_calibration(&self) -> bool {
        matches!(
            self,
            Self::EmptyBoard | Self::ZeroCellSize | Self::RegionOverflow
        )
    }
}

pub type Result<T> = core::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn geometry_errors_are_calibration_errors() {
        let err = setup(&Calibration::new(ScreenPoint::new(0, 0), 0, (3, 3))).unwrap_err();
        assert!(err.is_calibration());

        let err = setup(&Calibration::new(ScreenPoint::new(0, 0), u32::MAX, (3, 3))).unwrap_err();
        assert!(err.is_calibration());

        assert!(!SweepError::Unresponsive { rounds: 3 }.is_calibration());
        assert!(!SweepError::InvalidCoords.is_calibration());
    }
}
