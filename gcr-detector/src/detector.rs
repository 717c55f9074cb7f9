//! Hot-pixel counting on ready-state frames.
//!
//! With the high voltages off no ions reach the phosphor, so isolated bright
//! pixels are galactic cosmic rays or hot CCD pixels. Each candidate frame is
//! compared against its own robust background: a pixel is a hit when it
//! exceeds `median + k * stddev` of the frame, stays below the plausibility
//! cutoff and lies inside the illuminated region of the sensor.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use log::debug;
use ndarray::Array2;
use tracis::records::SensorProducts;
use tracis::{DetectorGrid, EphemerisSample, ImageRecord, RobustStats, Sensor};

use crate::config::GcrConfig;
use crate::error::GcrError;

/// One sensor's image and the voltages deciding whether it is a candidate.
#[derive(Debug, Clone, Copy)]
pub struct SensorFrame<'a> {
    pub valid: bool,
    pub bias_voltage: f32,
    pub mcp_voltage: f32,
    pub phosphor_voltage: f32,
    pub raw: &'a Array2<u16>,
}

impl<'a> From<&'a SensorProducts> for SensorFrame<'a> {
    fn from(products: &'a SensorProducts) -> Self {
        Self {
            valid: products.valid,
            bias_voltage: products.aux.bias_voltage,
            mcp_voltage: products.aux.mcp_voltage,
            phosphor_voltage: products.aux.phosphor_voltage,
            raw: &products.raw_image,
        }
    }
}

/// One full-cadence record as seen by the detectors.
#[derive(Debug, Clone, Copy)]
pub struct GcrInput<'a> {
    /// Unix time, seconds
    pub time: f64,
    /// Geolocation; zeros when the record carried none
    pub location: EphemerisSample,
    pub h: SensorFrame<'a>,
    pub v: SensorFrame<'a>,
}

impl<'a> GcrInput<'a> {
    pub fn sensor(&self, sensor: Sensor) -> &SensorFrame<'a> {
        match sensor {
            Sensor::H => &self.h,
            Sensor::V => &self.v,
        }
    }
}

impl<'a> From<&'a ImageRecord> for GcrInput<'a> {
    fn from(record: &'a ImageRecord) -> Self {
        Self {
            time: record.time,
            location: record.location.unwrap_or_default(),
            h: SensorFrame::from(&record.h),
            v: SensorFrame::from(&record.v),
        }
    }
}

/// Hits found in one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHits {
    pub sensor: Sensor,
    /// Position of the record within the day, from 0
    pub index: usize,
    pub time: f64,
    pub hits: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Geocentric radius, m
    pub radius: f64,
}

impl fmt::Display for ImageHits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} {} image {}: {} hot pixels {:.1} N {:.1} E @ R={:.2} km",
            self.time,
            self.sensor,
            self.index + 1,
            self.hits,
            self.latitude,
            self.longitude,
            self.radius / 1000.0
        )
    }
}

/// Hot-pixel summary for one day of records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayReport {
    /// UTC date of the first record
    pub date: Option<NaiveDate>,
    /// Images with at least one hit, all H images before all V images
    pub images: Vec<ImageHits>,
    pub total_h: usize,
    pub total_v: usize,
}

impl DayReport {
    pub fn total(&self, sensor: Sensor) -> usize {
        match sensor {
            Sensor::H => self.total_h,
            Sensor::V => self.total_v,
        }
    }

    /// Report lines: one per image with hits, then the daily summary if
    /// either sensor saw a hit.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.images.iter().map(ToString::to_string).collect();
        if self.total_h > 0 || self.total_v > 0 {
            let date = self
                .date
                .map_or_else(String::new, |d| d.format("%Y%m%d").to_string());
            lines.push(format!(
                "Processed {} {} H GCRs {} V GCRs",
                date, self.total_h, self.total_v
            ));
        }
        lines
    }
}

/// Counts statistically hot pixels in ready-state frames.
#[derive(Debug, Clone, Default)]
pub struct HotPixelDetector {
    config: GcrConfig,
}

impl HotPixelDetector {
    pub fn new(config: GcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GcrConfig {
        &self.config
    }

    /// Whether a frame is valid imagery taken in the ready state.
    pub fn is_candidate(&self, frame: &SensorFrame) -> bool {
        frame.valid
            && self.config.ready.is_ready(
                frame.bias_voltage,
                frame.mcp_voltage,
                frame.phosphor_voltage,
            )
    }

    /// Number of hits in one frame, `None` when the frame is not a candidate.
    ///
    /// # Returns
    /// * `Ok(Some(hits))` - Candidate frame
    /// * `Ok(None)` - Invalid imagery or high voltages on
    /// * `Err(GcrError::ShapeMismatch)` - Image is not 66 x 40
    pub fn count_hits(&self, frame: &SensorFrame) -> Result<Option<usize>, GcrError> {
        if !self.is_candidate(frame) {
            return Ok(None);
        }
        let grid = DetectorGrid::TII;
        if frame.raw.dim() != grid.shape() {
            return Err(GcrError::ShapeMismatch {
                expected: grid.shape(),
                actual: frame.raw.dim(),
            });
        }

        let cutoff = self.config.max_pixel_value;
        let stats = RobustStats::from_pixels(frame.raw.iter().copied(), cutoff as f64)?;
        if stats.std_dev <= 0.0 {
            return Ok(Some(0));
        }
        let threshold = stats.hot_pixel_threshold(self.config.sigmas);

        let hits = grid
            .positions()
            .filter(|&(row, col)| {
                let value = frame.raw[[row, col]];
                value as f64 > threshold
                    && value <= cutoff
                    && self.config.region.contains(row, col)
            })
            .count();
        if hits > 0 {
            debug!(
                "{} hits above {:.1} (median {:.1}, sd {:.2}, MAD {:.2})",
                hits, threshold, stats.median, stats.std_dev, stats.mad
            );
        }
        Ok(Some(hits))
    }

    /// Scan one day of records, H sensor first.
    pub fn process_day(&self, inputs: &[GcrInput]) -> Result<DayReport, GcrError> {
        let mut report = DayReport {
            date: inputs
                .first()
                .and_then(|input| DateTime::from_timestamp(input.time.floor() as i64, 0))
                .map(|time| time.date_naive()),
            ..Default::default()
        };

        for sensor in Sensor::BOTH {
            let mut total = 0;
            for (index, input) in inputs.iter().enumerate() {
                let Some(hits) = self.count_hits(input.sensor(sensor))? else {
                    continue;
                };
                if hits == 0 {
                    continue;
                }
                total += hits;
                report.images.push(ImageHits {
                    sensor,
                    index,
                    time: input.time,
                    hits,
                    latitude: input.location.latitude,
                    longitude: input.location.longitude,
                    radius: input.location.radius,
                });
            }
            match sensor {
                Sensor::H => report.total_h = total,
                Sensor::V => report.total_v = total,
            }
        }
        Ok(report)
    }
}
