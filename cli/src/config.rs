use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use autosweep_core::{CellCount, Coord, Coord2, ScreenPoint, SolverConfig};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Contents of the `--config` TOML file. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub solver: SolverConfig,
    /// Where fault reports go when `--dump-dir` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Preset {
    pub size: Coord2,
    pub cell_size: u32,
    pub mines: CellCount,
}

impl Difficulty {
    /// Grid geometry of the Google game at each difficulty.
    pub const fn preset(self) -> Preset {
        match self {
            Self::Easy => Preset {
                size: (10, 8),
                cell_size: 45,
                mines: 10,
            },
            Self::Medium => Preset {
                size: (18, 14),
                cell_size: 30,
                mines: 40,
            },
            Self::Hard => Preset {
                size: (24, 20),
                cell_size: 25,
                mines: 99,
            },
        }
    }
}

fn split_pair<'a>(text: &'a str, separators: &[char]) -> anyhow::Result<(&'a str, &'a str)> {
    let Some((a, b)) = text.split_once(separators) else {
        bail!("expected two values separated by one of {:?}, got {:?}", separators, text);
    };
    Ok((a.trim(), b.trim()))
}

/// Parses `X,Y` screen coordinates.
pub fn parse_point(text: &str) -> anyhow::Result<ScreenPoint> {
    let (x, y) = split_pair(text, &[','])?;
    Ok(ScreenPoint::new(
        x.parse::<i32>().with_context(|| format!("bad x in {:?}", text))?,
        y.parse::<i32>().with_context(|| format!("bad y in {:?}", text))?,
    ))
}

/// Parses `X,Y` cell coordinates.
pub fn parse_coords(text: &str) -> anyhow::Result<Coord2> {
    let (x, y) = split_pair(text, &[','])?;
    Ok((
        x.parse::<Coord>().with_context(|| format!("bad column in {:?}", text))?,
        y.parse::<Coord>().with_context(|| format!("bad row in {:?}", text))?,
    ))
}

/// Parses `WxH` grid sizes.
pub fn parse_size(text: &str) -> anyhow::Result<Coord2> {
    let (w, h) = split_pair(text, &['x', 'X'])?;
    Ok((
        w.parse::<Coord>().with_context(|| format!("bad width in {:?}", text))?,
        h.parse::<Coord>().with_context(|| format!("bad height in {:?}", text))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs() {
        assert_eq!(parse_point("120, -4").unwrap(), ScreenPoint::new(120, -4));
        assert_eq!(parse_coords("3,7").unwrap(), (3, 7));
        assert_eq!(parse_size("24x20").unwrap(), (24, 20));
        assert!(parse_size("24,20").is_err());
        assert!(parse_coords("300,1").is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: FileConfig = toml::from_str(
            r#"
            [solver]
            max_stalled_rounds = 5

            [solver.sensor]
            tolerance = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.solver.max_stalled_rounds, 5);
        assert_eq!(config.solver.sensor.tolerance, 20);
        assert_eq!(config.solver.sensor.band_half_width, 6);
        assert_eq!(config.solver.timing, autosweep_core::Timing::default());
        assert_eq!(config.dump_dir, None);
    }

    #[test]
    fn default_config_survives_toml() {
        let text = toml::to_string_pretty(&FileConfig::default()).unwrap();
        let back: FileConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, FileConfig::default());
    }

    #[test]
    fn presets_match_the_game() {
        assert_eq!(Difficulty::Hard.preset().size, (24, 20));
        assert_eq!(Difficulty::Medium.preset().mines, 40);
        assert_eq!(Difficulty::default(), Difficulty::Easy);
    }
}
