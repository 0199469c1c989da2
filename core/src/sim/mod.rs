//! A Minesweeper game that lives in memory and paints itself as pixels, so the
//! solver can be driven end to end without a real screen or mouse.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::*;
pub use engine::*;
pub use layout::*;

mod engine;
mod layout;

/// Colors the simulated game is painted with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimColors {
    pub hidden: [Rgb; 2],
    pub blank: [Rgb; 2],
    pub numbers: [Rgb; 8],
    pub flag: Rgb,
    pub mine: Rgb,
    pub border: Rgb,
    /// Painted over occluded cells.
    pub occluder: Rgb,
}

impl SimColors {
    /// Takes tile and digit colors from `palette`, falling back to the Google colors
    /// for anything it lacks.
    pub fn from_palette(palette: &Palette) -> Self {
        let fallback = Palette::google();
        let pick = |kind: ColorKind, nth: usize| {
            palette
                .iter()
                .chain(fallback.iter())
                .filter(|class| class.kind == kind)
                .nth(nth)
                .or_else(|| fallback.iter().find(|class| class.kind == kind))
                .map(|class| class.color)
                .unwrap_or(Rgb::new(0, 0, 0))
        };

        let mut numbers = [Rgb::new(0, 0, 0); 8];
        for (n, slot) in (1..=8).zip(numbers.iter_mut()) {
            *slot = pick(ColorKind::Number(n), 0);
        }

        Self {
            hidden: [pick(ColorKind::Hidden, 0), pick(ColorKind::Hidden, 1)],
            blank: [pick(ColorKind::Blank, 0), pick(ColorKind::Blank, 1)],
            numbers,
            flag: Rgb::new(242, 54, 7),
            mine: Rgb::new(20, 20, 20),
            border: Rgb::new(74, 117, 44),
            occluder: Rgb::new(255, 255, 255),
        }
    }
}

impl Default for SimColors {
    fn default() -> Self {
        Self::from_palette(&Palette::google())
    }
}

/// Input received by the simulated desktop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimAction {
    Primary(ScreenPoint),
    Secondary(ScreenPoint),
}

#[derive(Debug)]
struct Desktop {
    engine: PlayEngine,
    calibration: Calibration,
    colors: SimColors,
    /// Remaining captures each cell stays covered for.
    occlusions: HashMap<Coord2, u32>,
    /// Captures that still show the game as it was before the last click.
    render_lag: u32,
    frozen: Option<(PlayEngine, u32)>,
    captures: usize,
    actions: Vec<SimAction>,
}

/// Shared handle to a simulated game. Clones see the same game, so one clone can be
/// the screen, another the mouse, and a third can be inspected by the caller.
#[derive(Clone, Debug)]
pub struct SimulatedDesktop {
    inner: Rc<RefCell<Desktop>>,
}

impl SimulatedDesktop {
    pub fn new(layout: MineLayout, calibration: Calibration) -> Result<Self> {
        calibration.validate()?;
        if layout.size() != calibration.size {
            return Err(SweepError::InvalidBoardShape);
        }

        Ok(Self {
            inner: Rc::new(RefCell::new(Desktop {
                engine: PlayEngine::new(layout),
                calibration,
                colors: SimColors::default(),
                occlusions: HashMap::new(),
                render_lag: 0,
                frozen: None,
                captures: 0,
                actions: Vec::new(),
            })),
        })
    }

    pub fn with_colors(self, colors: SimColors) -> Self {
        self.inner.borrow_mut().colors = colors;
        self
    }

    /// After every primary click, the next `captures` captures still show the old
    /// frame, like a game that has not finished redrawing.
    pub fn with_render_lag(self, captures: u32) -> Self {
        self.inner.borrow_mut().render_lag = captures;
        self
    }

    /// Covers a cell for the next `captures` captures that touch it. `u32::MAX`
    /// covers it for good.
    pub fn occlude(&self, coords: Coord2, captures: u32) {
        self.inner.borrow_mut().occlusions.insert(coords, captures);
    }

    pub fn calibration(&self) -> Calibration {
        self.inner.borrow().calibration
    }

    pub fn game_state(&self) -> GameState {
        self.inner.borrow().engine.state()
    }

    pub fn cell_at(&self, coords: Coord2) -> SimCell {
        self.inner.borrow().engine.cell_at(coords)
    }

    pub fn engine(&self) -> PlayEngine {
        self.inner.borrow().engine.clone()
    }

    pub fn actions(&self) -> Vec<SimAction> {
        self.inner.borrow().actions.clone()
    }

    pub fn capture_count(&self) -> usize {
        self.inner.borrow().captures
    }
}

impl Desktop {
    fn paint(&self, engine: &PlayEngine, covered: &[Coord2], point: ScreenPoint) -> Rgb {
        let colors = &self.colors;
        let Some(coords) = self.calibration.cell_at(point) else {
            return colors.border;
        };
        if covered.contains(&coords) {
            return colors.occluder;
        }

        let size = self.calibration.cell_size as i32;
        let local_x = (point.x - self.calibration.origin.x) % size;
        let local_y = (point.y - self.calibration.origin.y) % size;
        let in_glyph = (local_x - size / 2).abs() <= (size / 10).max(1)
            && (local_y - size / 2).abs() <= (size / 4).max(1);
        let shade = usize::from((coords.0 + coords.1) % 2);

        let mine_shown = engine.state() == GameState::Lost && engine.layout().contains_mine(coords);
        match engine.cell_at(coords) {
            SimCell::Hidden if mine_shown && in_glyph => colors.mine,
            SimCell::Hidden => colors.hidden[shade],
            SimCell::Flagged if in_glyph => colors.flag,
            SimCell::Flagged => colors.hidden[shade],
            SimCell::Revealed(n) if n > 0 && in_glyph => colors.numbers[usize::from(n - 1)],
            SimCell::Revealed(_) => colors.blank[shade],
        }
    }
}

impl ScreenCapture for SimulatedDesktop {
    fn capture(&mut self, rect: PixelRect) -> Result<PixelBlock> {
        let mut guard = self.inner.borrow_mut();
        let desktop = &mut *guard;
        desktop.captures += 1;

        let calibration = desktop.calibration;
        let mut covered = Vec::new();
        for (&coords, remaining) in desktop.occlusions.iter_mut() {
            if *remaining == 0 {
                continue;
            }
            let touches = calibration
                .region_of(coords)
                .is_ok_and(|region| region.intersects(&rect));
            if touches {
                covered.push(coords);
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
            }
        }

        let engine = match desktop.frozen.as_mut() {
            Some((old, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                old.clone()
            }
            _ => desktop.engine.clone(),
        };

        Ok(PixelBlock::from_fn(rect, |point| {
            desktop.paint(&engine, &covered, point)
        }))
    }
}

impl InputInjector for SimulatedDesktop {
    fn primary_click(&mut self, at: ScreenPoint) {
        let mut desktop = self.inner.borrow_mut();
        desktop.actions.push(SimAction::Primary(at));

        let Some(coords) = desktop.calibration.cell_at(at) else {
            log::debug!("simulated click at {:?} missed the board", at);
            return;
        };
        if desktop.render_lag > 0 {
            let before = desktop.engine.clone();
            let lag = desktop.render_lag;
            desktop.frozen = Some((before, lag));
        }
        desktop.engine.reveal(coords);
    }

    fn secondary_click(&mut self, at: ScreenPoint) {
        let mut desktop = self.inner.borrow_mut();
        desktop.actions.push(SimAction::Secondary(at));

        if let Some(coords) = desktop.calibration.cell_at(at) {
            desktop.engine.toggle_flag(coords);
        }
    }
}
