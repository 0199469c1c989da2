use std::path::{Path, PathBuf};

use anyhow::Context;
use autosweep_core::{Board, Calibration, PixelBlock, SweepError};
use chrono::{DateTime, Local};
use serde::Serialize;

/// What is written to disk when a session faults.
#[derive(Debug, Serialize)]
pub struct FaultReport<'a> {
    pub timestamp: DateTime<Local>,
    pub error: String,
    pub calibration: &'a Calibration,
    /// Glyph snapshot of the board at the time of the fault.
    pub board: Vec<String>,
    /// Pixels of the cell that could not be identified.
    pub sample: Option<&'a PixelBlock>,
}

impl<'a> FaultReport<'a> {
    pub fn new(error: &'a SweepError, board: &'a Board) -> Self {
        let sample = match error {
            SweepError::Unidentified { sample, .. } => Some(sample.as_ref()),
            _ => None,
        };
        Self {
            timestamp: Local::now(),
            error: error.to_string(),
            calibration: board.calibration(),
            board: board.to_string().lines().map(str::to_owned).collect(),
            sample,
        }
    }

    pub fn file_name(&self) -> String {
        format!("autosweep-fault-{}.json", self.timestamp.format("%Y%m%d-%H%M%S%.3f"))
    }

    /// Writes the report as pretty JSON into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating dump directory {}", dir.display()))?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self).context("serializing fault report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing fault report {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use autosweep_core::*;

    use super::*;

    #[test]
    fn report_carries_the_unmatched_sample() {
        let calibration = Calibration::new(ScreenPoint::new(0, 0), 4, (2, 1));
        let board = setup(&calibration).unwrap();
        let rect = PixelRect::new(0, 0, 4, 4);
        let error = SweepError::Unidentified {
            coords: (0, 0),
            attempts: 4,
            sample: Box::new(PixelBlock::from_fn(rect, |_| Rgb::new(1, 2, 3))),
        };

        let report = FaultReport::new(&error, &board);
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["board"], serde_json::json!(["??"]));
        assert_eq!(json["sample"]["rect"]["width"], 4);
        assert_eq!(json["sample"]["pixels"][0]["b"], 3);
        assert!(report.file_name().starts_with("autosweep-fault-"));
    }

    #[test]
    fn other_errors_have_no_sample() {
        let calibration = Calibration::new(ScreenPoint::new(0, 0), 4, (1, 1));
        let board = setup(&calibration).unwrap();
        let error = SweepError::Unresponsive { rounds: 3 };

        let report = FaultReport::new(&error, &board);

        assert!(report.sample.is_none());
        assert!(report.error.contains("3 rounds"));
    }
}
