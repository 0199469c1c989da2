use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::*;

/// Screen geometry of one game session, handed over by whoever located the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    /// Top-left pixel of cell `(0, 0)`.
    pub origin: ScreenPoint,
    /// Edge length of a square cell in pixels.
    pub cell_size: u32,
    /// Grid size `(columns, rows)`.
    pub size: Coord2,
}

impl Calibration {
    pub const fn new(origin: ScreenPoint, cell_size: u32, size: Coord2) -> Self {
        Self {
            origin,
            cell_size,
            size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(SweepError::EmptyBoard);
        }
        if self.cell_size == 0 {
            return Err(SweepError::ZeroCellSize);
        }
        self.board_rect().map(|_| ())
    }

    /// Pixel region of the cell at `coords`.
    pub fn region_of(&self, (x, y): Coord2) -> Result<PixelRect> {
        let offset = |index: Coord, base: i32| {
            u32::from(index)
                .checked_mul(self.cell_size)
                .and_then(|delta| i32::try_from(delta).ok())
                .and_then(|delta| base.checked_add(delta))
                .ok_or(SweepError::RegionOverflow)
        };
        Ok(PixelRect::new(
            offset(x, self.origin.x)?,
            offset(y, self.origin.y)?,
            self.cell_size,
            self.cell_size,
        ))
    }

    /// Region covering the whole grid.
    pub fn board_rect(&self) -> Result<PixelRect> {
        // the far corner must be addressable too
        self.region_of(self.size)?;
        let extent = |cells: Coord| {
            u32::from(cells)
                .checked_mul(self.cell_size)
                .ok_or(SweepError::RegionOverflow)
        };
        Ok(PixelRect::new(
            self.origin.x,
            self.origin.y,
            extent(self.size.0)?,
            extent(self.size.1)?,
        ))
    }

    /// Cell under a screen position, if any.
    pub fn cell_at(&self, point: ScreenPoint) -> Option<Coord2> {
        let dx = point.x.checked_sub(self.origin.x)?;
        let dy = point.y.checked_sub(self.origin.y)?;
        if dx < 0 || dy < 0 || self.cell_size == 0 {
            return None;
        }
        let x = Coord::try_from(dx as u32 / self.cell_size).ok()?;
        let y = Coord::try_from(dy as u32 / self.cell_size).ok()?;
        in_bounds((x, y), self.size).then_some((x, y))
    }
}

/// How a color class is matched against the sampled band.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchRule {
    /// Every sampled pixel must match. Used for flat tile textures.
    All,
    /// One matching pixel is enough. Used for digit glyphs.
    Any,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorKind {
    Hidden,
    Blank,
    Number(u8),
}

impl ColorKind {
    pub const fn rule(self) -> MatchRule {
        match self {
            Self::Hidden | Self::Blank => MatchRule::All,
            Self::Number(_) => MatchRule::Any,
        }
    }

    pub const fn state(self) -> CellState {
        match self {
            Self::Hidden => CellState::Hidden,
            Self::Blank => CellState::Revealed(0),
            Self::Number(n) => CellState::Revealed(n),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorClass {
    pub kind: ColorKind,
    pub color: Rgb,
}

impl ColorClass {
    pub const fn new(kind: ColorKind, color: Rgb) -> Self {
        Self { kind, color }
    }
}

/// Reference colors in the order they are tried. Digit classes are limited to 1..=8.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColorClass>", into = "Vec<ColorClass>")]
pub struct Palette(Vec<ColorClass>);

impl Palette {
    pub fn new(classes: Vec<ColorClass>) -> Result<Self> {
        for class in &classes {
            if let ColorKind::Number(number) = class.kind {
                if !(1..=8).contains(&number) {
                    return Err(SweepError::InvalidPaletteNumber(number));
                }
            }
        }
        Ok(Self(classes))
    }

    /// Colors of the Google search Minesweeper game.
    pub fn google() -> Self {
        use ColorKind::*;
        Self(vec![
            ColorClass::new(Hidden, Rgb::new(170, 215, 81)),
            ColorClass::new(Hidden, Rgb::new(162, 209, 73)),
            ColorClass::new(Blank, Rgb::new(229, 194, 159)),
            ColorClass::new(Blank, Rgb::new(215, 184, 153)),
            ColorClass::new(Number(1), Rgb::new(25, 118, 210)),
            ColorClass::new(Number(2), Rgb::new(56, 142, 60)),
            ColorClass::new(Number(3), Rgb::new(211, 47, 47)),
            ColorClass::new(Number(4), Rgb::new(123, 31, 162)),
            ColorClass::new(Number(5), Rgb::new(255, 143, 0)),
            ColorClass::new(Number(6), Rgb::new(0, 151, 167)),
            ColorClass::new(Number(7), Rgb::new(66, 66, 66)),
            ColorClass::new(Number(8), Rgb::new(158, 158, 158)),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorClass> {
        self.0.iter()
    }

    /// First color registered for `kind`.
    pub fn color_of(&self, kind: ColorKind) -> Option<Rgb> {
        self.iter().find(|class| class.kind == kind).map(|class| class.color)
    }
}

impl TryFrom<Vec<ColorClass>> for Palette {
    type Error = SweepError;

    fn try_from(classes: Vec<ColorClass>) -> Result<Self> {
        Self::new(classes)
    }
}

impl From<Palette> for Vec<ColorClass> {
    fn from(palette: Palette) -> Self {
        palette.0
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::google()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub palette: Palette,
    /// Maximum per-channel difference for a pixel to match a reference color.
    pub tolerance: u8,
    /// Pixels sampled on each side of the horizontal center.
    pub band_half_width: u32,
    /// Failed attempts tolerated before a cell is declared unreadable.
    pub failure_limit: u8,
    pub retry_delay_ms: u64,
}

impl SensorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            tolerance: 12,
            band_half_width: 6,
            failure_limit: 3,
            retry_delay_ms: 50,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Wait after a primary click before the board is read again.
    pub click_settle_ms: u64,
}

impl Timing {
    /// No waiting at all, for in-memory desktops.
    pub const fn instant() -> Self {
        Self { click_settle_ms: 0 }
    }

    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            click_settle_ms: 250,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub sensor: SensorConfig,
    pub timing: Timing,
    /// Consecutive rounds without any cell changing before giving up.
    pub max_stalled_rounds: u8,
}

impl SolverConfig {
    /// Defaults with every delay removed.
    pub fn instant() -> Self {
        Self {
            sensor: SensorConfig {
                retry_delay_ms: 0,
                ..Default::default()
            },
            timing: Timing::instant(),
            ..Default::default()
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            timing: Timing::default(),
            max_stalled_rounds: 3,
        }
    }
}
