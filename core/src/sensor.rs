use crate::*;

/// Turns a captured cell region into a [`CellState`] by comparing a horizontal band
/// of pixels against the configured palette.
#[derive(Clone, Debug)]
pub struct CellSensor {
    config: SensorConfig,
}

impl CellSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Pixels of the band through the vertical center of `block`, spanning
    /// `band_half_width` either side of the horizontal center.
    pub fn sample_band<'a>(&self, block: &'a PixelBlock) -> impl Iterator<Item = Rgb> + 'a {
        let rect = block.rect();
        let row = rect.height / 2;
        let center = rect.width / 2;
        let start = center.saturating_sub(self.config.band_half_width);
        let end = center
            .saturating_add(self.config.band_half_width)
            .min(rect.width.saturating_sub(1));
        (start..=end).filter_map(move |col| block.get(col, row))
    }

    /// Single classification attempt. Identical pixels always give the same answer.
    pub fn classify(&self, block: &PixelBlock) -> Option<CellState> {
        let band: Vec<Rgb> = self.sample_band(block).collect();
        if band.is_empty() {
            return None;
        }

        let tolerance = self.config.tolerance;
        self.config
            .palette
            .iter()
            .find(|class| {
                let matches = |pixel: &Rgb| pixel.within(class.color, tolerance);
                match class.kind.rule() {
                    MatchRule::All => band.iter().all(matches),
                    MatchRule::Any => band.iter().any(matches),
                }
            })
            .map(|class| class.kind.state())
    }

    /// Captures and classifies `cell`, retrying after `retry_delay` until the cell has
    /// failed more than `failure_limit` times.
    pub fn sense<S: ScreenCapture + ?Sized>(
        &self,
        screen: &mut S,
        cell: &mut Cell,
    ) -> Result<CellState> {
        loop {
            let block = screen.capture(cell.region())?;

            if let Some(state) = self.classify(&block) {
                if cell.identification_failures() > 0 {
                    log::debug!(
                        "cell {:?} identified as {:?} after {} failures",
                        cell.coords(),
                        state,
                        cell.identification_failures()
                    );
                }
                cell.reset_failures();
                log::trace!("cell {:?} sensed as {:?}", cell.coords(), state);
                return Ok(state);
            }

            let failures = cell.record_failure();
            if failures > self.config.failure_limit {
                log::error!(
                    "cell {:?} unidentified after {} attempts, band: {:?}",
                    cell.coords(),
                    failures,
                    self.sample_band(&block).collect::<Vec<_>>()
                );
                return Err(SweepError::Unidentified {
                    coords: cell.coords(),
                    attempts: failures,
                    sample: Box::new(block),
                });
            }

            log::warn!(
                "cell {:?} not identified (attempt {}), retrying",
                cell.coords(),
                failures
            );
            let delay = self.config.retry_delay();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}

impl Default for CellSensor {
    fn default() -> Self {
        Self::new(SensorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIDDEN: Rgb = Rgb::new(170, 215, 81);
    const BLANK: Rgb = Rgb::new(215, 184, 153);
    const ONE: Rgb = Rgb::new(25, 118, 210);
    const FOREIGN: Rgb = Rgb::new(255, 255, 255);

    fn sensor() -> CellSensor {
        CellSensor::new(SensorConfig {
            retry_delay_ms: 0,
            ..Default::default()
        })
    }

    fn uniform(color: Rgb) -> PixelBlock {
        PixelBlock::from_fn(PixelRect::new(0, 0, 30, 30), |_| color)
    }

    /// Blank tile with a one pixel wide glyph stroke at column `stroke`.
    fn glyph(stroke: i32, color: Rgb) -> PixelBlock {
        PixelBlock::from_fn(PixelRect::new(0, 0, 30, 30), |p| {
            if p.x == stroke { color } else { BLANK }
        })
    }

    struct Frames {
        frames: Vec<PixelBlock>,
        captures: usize,
    }

    impl ScreenCapture for Frames {
        fn capture(&mut self, _rect: PixelRect) -> Result<PixelBlock> {
            let index = self.captures.min(self.frames.len() - 1);
            self.captures += 1;
            Ok(self.frames[index].clone())
        }
    }

    #[test]
    fn uniform_textures() {
        assert_eq!(sensor().classify(&uniform(HIDDEN)), Some(CellState::Hidden));
        assert_eq!(sensor().classify(&uniform(BLANK)), Some(CellState::Revealed(0)));
    }

    #[test]
    fn tolerance_absorbs_noise() {
        let noisy = PixelBlock::from_fn(PixelRect::new(0, 0, 30, 30), |p| {
            let jitter = (p.x % 5) as u8;
            Rgb::new(170 - jitter, 215 + jitter % 3, 81 + jitter)
        });
        assert_eq!(sensor().classify(&noisy), Some(CellState::Hidden));
    }

    #[test]
    fn partial_texture_match_is_rejected() {
        // a hidden tile partly covered by something white
        let occluded = PixelBlock::from_fn(PixelRect::new(0, 0, 30, 30), |p| {
            if p.x < 12 { FOREIGN } else { HIDDEN }
        });
        assert_eq!(sensor().classify(&occluded), None);
    }

    #[test]
    fn glyph_needs_a_single_pixel() {
        assert_eq!(sensor().classify(&glyph(15, ONE)), Some(CellState::Revealed(1)));
        // the stroke sits at the edge of the sampled band
        assert_eq!(sensor().classify(&glyph(9, ONE)), Some(CellState::Revealed(1)));
    }

    #[test]
    fn glyph_outside_band_reads_as_blank() {
        assert_eq!(sensor().classify(&glyph(2, ONE)), Some(CellState::Revealed(0)));
    }

    #[test]
    fn classification_is_deterministic() {
        let block = glyph(14, Rgb::new(211, 47, 47));
        let first = sensor().classify(&block);
        for _ in 0..10 {
            assert_eq!(sensor().classify(&block), first);
        }
        assert_eq!(first, Some(CellState::Revealed(3)));
    }

    #[test]
    fn band_is_clipped_to_small_cells() {
        let block = PixelBlock::from_fn(PixelRect::new(0, 0, 3, 3), |_| HIDDEN);
        assert_eq!(sensor().sample_band(&block).count(), 3);
        assert_eq!(sensor().classify(&block), Some(CellState::Hidden));
    }

    #[test]
    fn sense_retries_transient_misreads() {
        let mut cell = Cell::new((0, 0), PixelRect::new(0, 0, 30, 30));
        let mut screen = Frames {
            frames: vec![uniform(FOREIGN), uniform(FOREIGN), uniform(HIDDEN)],
            captures: 0,
        };

        let state = sensor().sense(&mut screen, &mut cell).unwrap();

        assert_eq!(state, CellState::Hidden);
        assert_eq!(screen.captures, 3);
        assert_eq!(cell.identification_failures(), 0);
    }

    #[test]
    fn sense_gives_up_after_failure_limit() {
        let mut cell = Cell::new((2, 1), PixelRect::new(0, 0, 30, 30));
        let mut screen = Frames {
            frames: vec![uniform(FOREIGN)],
            captures: 0,
        };
        let sensor = sensor();
        let limit = sensor.config().failure_limit;

        let err = sensor.sense(&mut screen, &mut cell).unwrap_err();

        assert_eq!(screen.captures, usize::from(limit) + 1);
        match err {
            SweepError::Unidentified {
                coords,
                attempts,
                sample,
            } => {
                assert_eq!(coords, (2, 1));
                assert_eq!(attempts, limit + 1);
                assert_eq!(sample.get(0, 0), Some(FOREIGN));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
