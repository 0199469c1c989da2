use serde::{Deserialize, Serialize};

use crate::*;

/// Where the sense → deduce → act loop currently is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Setup,
    Sensing,
    Deducing,
    Acting,
    Terminal,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Every cell is revealed or flagged.
    Solved,
    /// Cells remain covered but no certain move exists.
    Stuck,
    Faulted(SweepError),
}

impl Outcome {
    pub const fn is_solved(&self) -> bool {
        matches!(self, Self::Solved)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub rounds: u32,
    pub flags_placed: u32,
    pub cells_clicked: u32,
    pub full_refreshes: u32,
    pub conflicts: u32,
}

/// Drives one game: reads the board, applies every certain deduction, and repeats
/// until nothing certain is left.
///
/// The session borrows the board mutably for the whole run; it is the only thing
/// that changes it.
#[derive(Debug)]
pub struct Session<S, I> {
    sensor: CellSensor,
    screen: S,
    input: I,
    timing: Timing,
    max_stalled_rounds: u8,
    phase: Phase,
    stats: SessionStats,
}

impl<S: ScreenCapture, I: InputInjector> Session<S, I> {
    pub fn new(config: &SolverConfig, screen: S, input: I) -> Self {
        Self {
            sensor: CellSensor::new(config.sensor.clone()),
            screen,
            input,
            timing: config.timing,
            max_stalled_rounds: config.max_stalled_rounds,
            phase: Phase::Setup,
            stats: SessionStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn into_parts(self) -> (S, I) {
        (self.screen, self.input)
    }

    /// Reads every unresolved cell.
    pub fn sense(&mut self, board: &mut Board) -> Result<()> {
        self.enter(Phase::Sensing);
        let changed = board.refresh_all(&self.sensor, &mut self.screen)?;
        self.stats.full_refreshes += 1;
        log::debug!("sensed board, {} cells changed\n{}", changed.len(), board);
        Ok(())
    }

    /// Clicks `coords` to get a frontier on an untouched board. Nothing is clicked if
    /// the cell is already uncovered.
    pub fn open(&mut self, board: &mut Board, coords: Coord2) -> Result<bool> {
        let coords = board.validate_coords(coords)?;
        self.enter(Phase::Acting);
        let changed = self.click(board, coords)?;
        board.prune_frontier();
        log::debug!("opened {:?}\n{}", coords, board);
        Ok(changed)
    }

    /// Runs until the board is solved, no certain move is left, or sensing fails.
    /// No input is sent after a failure.
    pub fn run(&mut self, board: &mut Board) -> Outcome {
        let outcome = self.run_inner(board).unwrap_or_else(|err| {
            log::error!("session faulted: {}", err);
            Outcome::Faulted(err)
        });
        self.enter(Phase::Terminal);
        log::info!(
            "session ended {:?} after {} rounds: {} flags, {} clicks",
            outcome,
            self.stats.rounds,
            self.stats.flags_placed,
            self.stats.cells_clicked
        );
        outcome
    }

    fn run_inner(&mut self, board: &mut Board) -> Result<Outcome> {
        self.sense(board)?;
        let mut stalled = 0;

        loop {
            self.enter(Phase::Deducing);
            let deductions = deduce(board);
            for conflict in &deductions.conflicts {
                log::warn!("skipping contradictory deduction: {:?}", conflict);
            }
            self.stats.conflicts += deductions.conflicts.len() as u32;

            if deductions.is_empty() {
                return Ok(if board.is_resolved() {
                    Outcome::Solved
                } else {
                    Outcome::Stuck
                });
            }

            self.stats.rounds += 1;
            log::debug!(
                "round {}: {} flags, {} safe",
                self.stats.rounds,
                deductions.flags.len(),
                deductions.safe.len()
            );

            self.enter(Phase::Acting);
            let changed = self.act(board, &deductions)?;
            board.prune_frontier();
            log::debug!("after round {}\n{}", self.stats.rounds, board);

            if changed {
                stalled = 0;
            } else {
                stalled += 1;
                log::warn!("round {} changed nothing", self.stats.rounds);
                if stalled >= self.max_stalled_rounds {
                    return Err(SweepError::Unresponsive { rounds: stalled });
                }
            }
        }
    }

    /// Places every flag, then clicks every safe cell. Flags never change the numbers
    /// on screen, so the safe set computed before them stays valid.
    fn act(&mut self, board: &mut Board, deductions: &Deductions) -> Result<bool> {
        let mut changed = false;
        for &coords in &deductions.flags {
            changed |= self.flag(board, coords)?;
        }
        for &coords in &deductions.safe {
            changed |= self.click(board, coords)?;
        }
        Ok(changed)
    }

    fn flag(&mut self, board: &mut Board, coords: Coord2) -> Result<bool> {
        let cell = &board[coords];
        if cell.state() != CellState::Hidden {
            log::debug!("not flagging {:?}, it is {:?}", coords, cell.state());
            return Ok(false);
        }

        log::info!("flag {:?}", coords);
        self.input.secondary_click(cell.center());
        self.stats.flags_placed += 1;
        Ok(board.apply_state(coords, CellState::Flagged)?.has_update())
    }

    fn click(&mut self, board: &mut Board, coords: Coord2) -> Result<bool> {
        let cell = &board[coords];
        if !cell.state().is_unresolved() {
            // uncovered by an earlier cascade in the same round
            log::debug!("not clicking {:?}, it is {:?}", coords, cell.state());
            return Ok(false);
        }

        log::info!("click {:?}", coords);
        self.input.primary_click(cell.center());
        self.stats.cells_clicked += 1;
        let settle = self.timing.click_settle();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }

        let mut changed = board.refresh(&self.sensor, &mut self.screen, [coords])?.len();
        if board.state_at(coords) == CellState::Revealed(0) {
            // a blank cell may have opened a whole region
            log::debug!("{:?} is blank, re-reading the board", coords);
            changed += board.refresh_all(&self.sensor, &mut self.screen)?.len();
            self.stats.full_refreshes += 1;
        }
        let around = board.neighbors(coords).to_vec();
        changed += board.refresh(&self.sensor, &mut self.screen, around)?.len();

        Ok(changed > 0)
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::trace!("{:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{GameState, MineLayout, SimAction, SimulatedDesktop};

    const ORIGIN: ScreenPoint = ScreenPoint::new(100, 100);
    const CELL: u32 = 20;

    fn calibration(size: Coord2) -> Calibration {
        Calibration::new(ORIGIN, CELL, size)
    }

    fn simulated(size: Coord2, mines: &[Coord2]) -> SimulatedDesktop {
        let layout = MineLayout::from_mine_coords(size, mines).unwrap();
        SimulatedDesktop::new(layout, calibration(size)).unwrap()
    }

    fn session(desktop: &SimulatedDesktop) -> Session<SimulatedDesktop, SimulatedDesktop> {
        Session::new(&SolverConfig::instant(), desktop.clone(), desktop.clone())
    }

    fn center(coords: Coord2) -> ScreenPoint {
        calibration((10, 10)).region_of(coords).unwrap().center()
    }

    #[test]
    fn opening_cascade_then_flag_solves() {
        let desktop = simulated((3, 3), &[(0, 0)]);
        let mut board = setup(&desktop.calibration()).unwrap();
        let mut session = session(&desktop);

        assert!(session.open(&mut board, (2, 2)).unwrap());
        assert_eq!(board.to_string(), "#1.\n11.\n...");
        let captures = desktop.capture_count();

        assert_eq!(session.run(&mut board), Outcome::Solved);
        assert_eq!(session.phase(), Phase::Terminal);
        assert_eq!(board.state_at((0, 0)), CellState::Flagged);
        assert_eq!(
            desktop.actions(),
            vec![
                SimAction::Primary(center((2, 2))),
                SimAction::Secondary(center((0, 0))),
            ]
        );
        // one read of the hidden cell, none after it was flagged
        assert_eq!(desktop.capture_count(), captures + 1);

        let stats = session.stats();
        assert_eq!(stats.rounds, 1);
        assert_eq!(stats.flags_placed, 1);
        assert_eq!(stats.cells_clicked, 1);
        assert_eq!(stats.full_refreshes, 2);
    }

    #[test]
    fn open_does_not_click_uncovered_cell() {
        let desktop = simulated((2, 2), &[(1, 1)]);
        let mut board = setup(&desktop.calibration()).unwrap();
        let mut session = session(&desktop);

        assert!(session.open(&mut board, (0, 0)).unwrap());
        assert!(!session.open(&mut board, (0, 0)).unwrap());
        assert_eq!(desktop.actions().len(), 1);
        assert_eq!(session.open(&mut board, (5, 0)), Err(SweepError::InvalidCoords));
    }

    #[test]
    fn no_certain_move_is_stuck() {
        let desktop = simulated((3, 3), &[(0, 0), (2, 2)]);
        let mut board = setup(&desktop.calibration()).unwrap();
        let mut session = session(&desktop);
        session.open(&mut board, (2, 0)).unwrap();

        assert_eq!(session.run(&mut board), Outcome::Stuck);
        assert_eq!(board.to_string(), "#1.\n#21\n###");
        assert_eq!(desktop.actions().len(), 1);
        assert_eq!(desktop.game_state(), GameState::Active);
        assert_eq!(session.stats().rounds, 0);
    }

    #[test]
    fn unreadable_cell_faults_without_further_input() {
        let desktop = simulated((3, 1), &[(2, 0)]);
        let mut board = setup(&desktop.calibration()).unwrap();
        let mut session = session(&desktop);
        session.open(&mut board, (0, 0)).unwrap();
        desktop.occlude((2, 0), u32::MAX);

        let outcome = session.run(&mut board);

        let Outcome::Faulted(SweepError::Unidentified { coords, attempts, .. }) = &outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(*coords, (2, 0));
        assert_eq!(*attempts, 4);
        assert_eq!(board.state_at((2, 0)), CellState::Error);
        assert_eq!(desktop.actions().len(), 1);
    }

    #[test]
    fn transient_occlusion_is_retried() {
        let desktop = simulated((3, 1), &[(2, 0)]);
        let mut board = setup(&desktop.calibration()).unwrap();
        let mut session = session(&desktop);
        session.open(&mut board, (0, 0)).unwrap();
        desktop.occlude((2, 0), 2);

        assert_eq!(session.run(&mut board), Outcome::Solved);
        assert_eq!(board[(2, 0)].identification_failures(), 0);
    }

    /// Static screen painting each cell from a glyph grid. Clicks change nothing.
    struct Painted {
        calibration: Calibration,
        rows: Vec<&'static str>,
    }

    impl ScreenCapture for Painted {
        fn capture(&mut self, rect: PixelRect) -> Result<PixelBlock> {
            let palette = Palette::google();
            Ok(PixelBlock::from_fn(rect, |point| {
                let Some((x, y)) = self.calibration.cell_at(point) else {
                    return Rgb::new(0, 0, 0);
                };
                let glyph = self.rows[y as usize].as_bytes()[x as usize];
                let kind = match glyph {
                    b'#' => ColorKind::Hidden,
                    b'.' => ColorKind::Blank,
                    digit => ColorKind::Number(digit - b'0'),
                };
                palette.color_of(kind).unwrap()
            }))
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<SimAction>);

    impl InputInjector for Recorder {
        fn primary_click(&mut self, at: ScreenPoint) {
            self.0.push(SimAction::Primary(at));
        }

        fn secondary_click(&mut self, at: ScreenPoint) {
            self.0.push(SimAction::Secondary(at));
        }
    }

    fn painted(rows: &[&'static str]) -> (Board, Painted) {
        let calibration = calibration((rows[0].len() as Coord, rows.len() as Coord));
        let board = setup(&calibration).unwrap();
        let screen = Painted {
            calibration,
            rows: rows.to_vec(),
        };
        (board, screen)
    }

    #[test]
    fn flags_go_out_before_clicks_and_frozen_screen_is_unresponsive() {
        let (mut board, screen) = painted(&["#1.#", "11.."]);
        let mut session = Session::new(&SolverConfig::instant(), screen, Recorder::default());

        let outcome = session.run(&mut board);

        assert_eq!(outcome, Outcome::Faulted(SweepError::Unresponsive { rounds: 3 }));
        let (_, input) = session.into_parts();
        let flag = SimAction::Secondary(center((0, 0)));
        let click = SimAction::Primary(center((3, 0)));
        assert_eq!(input.0, vec![flag, click, click, click, click]);
    }

    #[test]
    fn contradictory_cell_is_left_alone() {
        let (mut board, screen) = painted(&["1#1", "..."]);
        let mut session = Session::new(&SolverConfig::instant(), screen, Recorder::default());

        // (0, 0) says (1, 0) is a mine while the blanks below say it is safe
        assert_eq!(session.run(&mut board), Outcome::Stuck);
        assert!(session.stats().conflicts > 0);
        let (_, input) = session.into_parts();
        assert!(input.0.is_empty());
    }
}
