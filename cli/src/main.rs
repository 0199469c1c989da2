use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use autosweep_core::sim::{GameState, MineLayout, SimColors, SimulatedDesktop};
use autosweep_core::*;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::config::{Difficulty, FileConfig, parse_coords, parse_point, parse_size};
use crate::dump::FaultReport;

mod config;
mod dump;
mod platform;

/// Plays Minesweeper by reading the screen and clicking the cells it is sure about.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// TOML file with solver settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play the game shown on screen.
    Play(PlayArgs),
    /// Play a generated game in memory.
    Simulate(SimulateArgs),
    /// Print the effective configuration as TOML.
    Palette,
}

#[derive(Debug, Args)]
struct GridArgs {
    #[arg(long, value_enum, default_value_t)]
    difficulty: Difficulty,

    /// Override the grid size, as WxH.
    #[arg(long, value_parser = parse_size)]
    size: Option<Coord2>,

    /// Cell to click first, as X,Y. Defaults to the center cell.
    #[arg(long, value_parser = parse_coords)]
    open: Option<Coord2>,
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Screen position of the top-left corner of the grid, as X,Y.
    #[arg(long, value_parser = parse_point)]
    origin: ScreenPoint,

    /// Override the cell edge length in pixels.
    #[arg(long)]
    cell_size: Option<u32>,

    /// Write a JSON fault report here when the board cannot be read.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    #[command(flatten)]
    grid: GridArgs,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Override the mine count of the difficulty.
    #[arg(long)]
    mines: Option<CellCount>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[command(flatten)]
    grid: GridArgs,
}

impl GridArgs {
    fn size(&self) -> Coord2 {
        self.size.unwrap_or(self.difficulty.preset().size)
    }

    fn opening(&self) -> Coord2 {
        let (width, height) = self.size();
        self.open.unwrap_or((width / 2, height / 2))
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbose.tracing_level_filter())
        .with_writer(std::io::stderr)
        .init();

    let file_config = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Play(args) => play(args, &file_config),
        Command::Simulate(args) => simulate(args, &file_config),
        Command::Palette => {
            let text =
                toml::to_string_pretty(&file_config).context("serializing configuration")?;
            print!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn play(args: PlayArgs, file_config: &FileConfig) -> anyhow::Result<ExitCode> {
    let preset = args.grid.difficulty.preset();
    let calibration = Calibration::new(
        args.origin,
        args.cell_size.unwrap_or(preset.cell_size),
        args.grid.size(),
    );
    let mut board = board_for(&calibration)?;
    let (mut screen, mut mouse) = platform::desktop()?;

    log::info!(
        "playing {}x{} board at {:?}",
        calibration.size.0,
        calibration.size.1,
        calibration.origin
    );
    let mut session = Session::new(&file_config.solver, screen.as_mut(), mouse.as_mut());
    let outcome = match session.open(&mut board, args.grid.opening()) {
        Ok(_) => session.run(&mut board),
        Err(err) => Outcome::Faulted(err),
    };

    let dump_dir = args.dump_dir.as_ref().or(file_config.dump_dir.as_ref());
    if let (Outcome::Faulted(err), Some(dir)) = (&outcome, dump_dir) {
        let path = FaultReport::new(err, &board).write_to(dir)?;
        log::info!("fault report written to {}", path.display());
    }

    Ok(report(&outcome, &board, session.stats()))
}

fn simulate(args: SimulateArgs, file_config: &FileConfig) -> anyhow::Result<ExitCode> {
    let run = run_simulation(&args, file_config)?;
    println!("game: {:?}", run.game);
    Ok(report(&run.outcome, &run.board, run.stats))
}

struct SimulationRun {
    outcome: Outcome,
    board: Board,
    stats: SessionStats,
    game: GameState,
}

/// Plays one generated game, painted with the configured palette so the sensor
/// reads it back with the same colors.
fn run_simulation(args: &SimulateArgs, file_config: &FileConfig) -> anyhow::Result<SimulationRun> {
    let preset = args.grid.difficulty.preset();
    let size = args.grid.size();
    let start = args.grid.opening();
    let layout = MineLayout::random(size, args.mines.unwrap_or(preset.mines), args.seed, Some(start))
        .context("generating mine layout")?;
    let calibration = Calibration::new(ScreenPoint::new(0, 0), preset.cell_size, size);

    // the simulated screen redraws instantly
    let mut solver = file_config.solver.clone();
    solver.sensor.retry_delay_ms = 0;
    solver.timing = Timing::instant();

    let desktop = SimulatedDesktop::new(layout, calibration)
        .context("building simulated desktop")?
        .with_colors(SimColors::from_palette(&solver.sensor.palette));

    let mut board = board_for(&calibration)?;
    let mut session = Session::new(&solver, desktop.clone(), desktop.clone());
    let outcome = match session.open(&mut board, start) {
        Ok(_) => session.run(&mut board),
        Err(err) => Outcome::Faulted(err),
    };

    Ok(SimulationRun {
        outcome,
        stats: session.stats(),
        board,
        game: desktop.game_state(),
    })
}

/// Builds the board, reporting bad geometry in terms of the command-line values.
fn board_for(calibration: &Calibration) -> anyhow::Result<Board> {
    setup(calibration).map_err(|err| {
        if err.is_calibration() {
            anyhow!(
                "board at {:?} with {} px cells and {}x{} grid does not fit on screen: {}",
                calibration.origin,
                calibration.cell_size,
                calibration.size.0,
                calibration.size.1,
                err
            )
        } else {
            anyhow::Error::new(err).context("setting up board")
        }
    })
}

fn report(outcome: &Outcome, board: &Board, stats: SessionStats) -> ExitCode {
    println!("{}", board);
    println!(
        "{} rounds, {} flags, {} clicks, {} full refreshes, {} conflicts",
        stats.rounds, stats.flags_placed, stats.cells_clicked, stats.full_refreshes, stats.conflicts
    );
    match outcome {
        Outcome::Solved => {
            println!("solved");
            ExitCode::SUCCESS
        }
        Outcome::Stuck => {
            println!("stuck: no certain move left");
            ExitCode::from(2)
        }
        Outcome::Faulted(err) => {
            println!("faulted: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn play_takes_origin_and_overrides() {
        let cli = Cli::try_parse_from([
            "autosweep",
            "play",
            "--origin",
            "640,300",
            "--difficulty",
            "hard",
            "--open",
            "2,3",
        ])
        .unwrap();

        let Command::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.origin, ScreenPoint::new(640, 300));
        assert_eq!(args.grid.size(), (24, 20));
        assert_eq!(args.grid.opening(), (2, 3));
    }

    #[test]
    fn simulate_defaults_to_center_opening() {
        let cli = Cli::try_parse_from(["autosweep", "simulate", "--size", "9x5"]).unwrap();

        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.grid.opening(), (4, 2));
        assert_eq!(args.seed, 0);
    }

    fn inverted(palette: &Palette) -> Palette {
        let classes = palette
            .iter()
            .map(|class| {
                let c = class.color;
                ColorClass::new(class.kind, Rgb::new(255 - c.r, 255 - c.g, 255 - c.b))
            })
            .collect();
        Palette::new(classes).unwrap()
    }

    #[test]
    fn simulation_is_painted_with_the_configured_palette() {
        let mut file_config = FileConfig::default();
        file_config.solver.sensor.palette = inverted(&Palette::google());
        let cli = Cli::try_parse_from(["autosweep", "simulate", "--seed", "3"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };

        let run = run_simulation(&args, &file_config).unwrap();

        assert!(
            matches!(run.outcome, Outcome::Solved | Outcome::Stuck),
            "{:?}",
            run.outcome
        );
        assert_ne!(run.game, GameState::Lost);
        assert_eq!(run.board.count(CellState::Unknown), 0);
    }

    #[test]
    fn oversized_cells_are_reported_as_geometry() {
        let calibration = Calibration::new(ScreenPoint::new(0, 0), 0x8000_0001, (10, 8));
        let err = board_for(&calibration).unwrap_err();
        assert!(err.to_string().contains("does not fit on screen"));
    }
}
