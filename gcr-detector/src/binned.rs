//! Frame-to-frame block differences.
//!
//! A cosmic ray striking the phosphor lights up a patch of pixels for a
//! single frame. Summing the illuminated area into coarse blocks and
//! comparing each ready-state frame with the one before it picks up such
//! transients even when no single pixel stands out from its own frame.

use std::fmt;

use ndarray::Array2;
use tracis::{DetectorGrid, Sensor};

use crate::config::{BinnedConfig, GcrConfig, ReadyThresholds};
use crate::detector::{GcrInput, SensorFrame};
use crate::error::GcrError;
use crate::ring_buffer::RingBuffer;

/// Block sums of one frame.
pub type BlockGrid = Array2<i64>;

/// One block whose sum rose by at least the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinnedHit {
    /// Position of the record within the day, from 0
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Block row
    pub row: usize,
    /// Block column
    pub col: usize,
    /// Increase over the previous frame, counts
    pub intensity: i64,
}

impl fmt::Display for BinnedHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Possible GCR: image {}, ({:.1},{:.1}), row {}, col {}, intensity: {}",
            self.index, self.latitude, self.longitude, self.row, self.col, self.intensity
        )
    }
}

/// Tracks block sums of consecutive frames from one sensor.
#[derive(Debug, Clone)]
pub struct BinnedDetector {
    config: BinnedConfig,
    ready: ReadyThresholds,
    history: RingBuffer<BlockGrid>,
}

impl BinnedDetector {
    pub fn new(config: &GcrConfig) -> Self {
        Self {
            config: config.binned,
            ready: config.ready,
            history: RingBuffer::new(2),
        }
    }

    fn empty_grid(&self) -> BlockGrid {
        Array2::zeros(self.config.grid_shape())
    }

    /// Sum the configured pixel window into blocks.
    pub fn block_sums(&self, raw: &Array2<u16>) -> BlockGrid {
        let c = &self.config;
        let mut grid = self.empty_grid();
        let rows = c.row_start..c.row_end.min(raw.nrows());
        let cols = c.col_start..c.col_end.min(raw.ncols());
        let (block_rows, block_cols) = (c.block_rows.max(1), c.block_cols.max(1));
        for col in cols {
            for row in rows.clone() {
                grid[[row / block_rows, col / block_cols]] += raw[[row, col]] as i64;
            }
        }
        grid
    }

    /// Advance by one frame and return the blocks that brightened.
    ///
    /// Frames that are not valid ready-state imagery enter the history as an
    /// all-zero grid and are never reported.
    ///
    /// # Returns
    /// * `Ok(Vec<(row, col, increase)>)` - Flagged blocks in row-major order
    /// * `Err(GcrError::ShapeMismatch)` - Image is not 66 x 40
    pub fn push(&mut self, frame: &SensorFrame) -> Result<Vec<(usize, usize, i64)>, GcrError> {
        let candidate = frame.valid
            && self
                .ready
                .is_ready(frame.bias_voltage, frame.mcp_voltage, frame.phosphor_voltage);
        if !candidate {
            let empty = self.empty_grid();
            self.history.push(empty);
            return Ok(Vec::new());
        }

        let shape = DetectorGrid::TII.shape();
        if frame.raw.dim() != shape {
            return Err(GcrError::ShapeMismatch {
                expected: shape,
                actual: frame.raw.dim(),
            });
        }

        let current = self.block_sums(frame.raw);
        let previous = self
            .history
            .latest()
            .cloned()
            .unwrap_or_else(|| self.empty_grid());

        let mut flagged = Vec::new();
        for ((row, col), &sum) in current.indexed_iter() {
            let increase = sum - previous[[row, col]];
            if increase >= self.config.threshold {
                flagged.push((row, col, increase));
            }
        }
        self.history.push(current);
        Ok(flagged)
    }

    /// Scan one sensor over a day of records.
    pub fn process_day(
        &mut self,
        inputs: &[GcrInput],
        sensor: Sensor,
    ) -> Result<Vec<BinnedHit>, GcrError> {
        self.history.clear();
        let mut hits = Vec::new();
        for (index, input) in inputs.iter().enumerate() {
            for (row, col, intensity) in self.push(input.sensor(sensor))? {
                hits.push(BinnedHit {
                    index,
                    latitude: input.location.latitude,
                    longitude: input.location.longitude,
                    row,
                    col,
                    intensity,
                });
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracis::geometry::{IMAGE_COLS, IMAGE_ROWS};
    use tracis::EphemerisSample;

    fn frame(raw: &Array2<u16>, ready: bool) -> SensorFrame<'_> {
        SensorFrame {
            valid: true,
            bias_voltage: 0.0,
            mcp_voltage: if ready { 0.0 } else { -2000.0 },
            phosphor_voltage: 0.0,
            raw,
        }
    }

    fn input(raw: &Array2<u16>) -> GcrInput<'_> {
        GcrInput {
            time: 0.0,
            location: EphemerisSample {
                latitude: 45.06,
                longitude: -120.04,
                ..Default::default()
            },
            h: frame(raw, true),
            v: frame(raw, false),
        }
    }

    fn flat(value: u16) -> Array2<u16> {
        Array2::from_elem((IMAGE_ROWS, IMAGE_COLS), value)
    }

    #[test]
    fn test_block_sums() {
        let detector = BinnedDetector::new(&GcrConfig::default());
        let sums = detector.block_sums(&flat(1));

        assert_eq!(sums.dim(), (11, 10));
        // Rows 6..61 and cols 4..36 in 6 x 4 blocks
        assert_eq!(sums[[1, 1]], 24);
        assert_eq!(sums[[9, 8]], 24);
        // Row 60 alone falls in block row 10
        assert_eq!(sums[[10, 8]], 4);
        assert_eq!(sums[[0, 1]], 0);
        assert_eq!(sums[[1, 0]], 0);
        assert_eq!(sums[[1, 9]], 0);
        assert_eq!(sums.sum(), 55 * 32);
    }

    #[test]
    fn test_transient_flagged() {
        let mut detector = BinnedDetector::new(&GcrConfig::default());
        let quiet = flat(100);
        let mut burst = flat(100);
        // 24 pixels of block (3, 2), +250 each
        for row in 18..24 {
            for col in 8..12 {
                burst[[row, col]] = 350;
            }
        }

        assert!(detector.push(&frame(&quiet, true)).unwrap().is_empty());
        assert_eq!(
            detector.push(&frame(&burst, true)).unwrap(),
            vec![(3, 2, 6000)]
        );
        // Falling back is not a hit
        assert!(detector.push(&frame(&quiet, true)).unwrap().is_empty());
    }

    #[test]
    fn test_non_candidate_resets_previous() {
        let mut detector = BinnedDetector::new(&GcrConfig::default());
        let bright = flat(300);

        // First frame compares against zeros: 24 * 300 = 7200 in each of
        // the 9 x 8 full blocks
        assert_eq!(detector.push(&frame(&bright, true)).unwrap().len(), 72);
        assert!(detector.push(&frame(&bright, true)).unwrap().is_empty());
        assert!(detector.push(&frame(&bright, false)).unwrap().is_empty());
        assert_eq!(detector.push(&frame(&bright, true)).unwrap().len(), 72);
    }

    #[test]
    fn test_day_lines() {
        let quiet = flat(10);
        let mut burst = flat(10);
        for row in 36..42 {
            for col in 20..24 {
                burst[[row, col]] = 2000;
            }
        }
        let inputs = vec![input(&quiet), input(&quiet), input(&burst)];

        let mut detector = BinnedDetector::new(&GcrConfig::default());
        let hits = detector.process_day(&inputs, Sensor::H).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].to_string(),
            "Possible GCR: image 2, (45.1,-120.0), row 6, col 5, intensity: 47760"
        );
        assert!(detector.process_day(&inputs, Sensor::V).unwrap().is_empty());
    }
}
