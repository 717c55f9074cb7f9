//! Satellite ephemeris series and interpolation at record times.
//!
//! Samples carry ITRF position (m), velocity projected onto the local
//! North-East-Centre frame (m/s) and the geocentric latitude, longitude and
//! radius derived from the position. A series is assembled from one or more
//! orbit files (typically the previous and the current day, so that records
//! near midnight are bracketed) and interpolated in a single forward sweep.
//!
//! Interpolation is linear between bracketing samples. Queries before the
//! first or after the last sample, and exact hits, take the nearest sample
//! verbatim. Latitude, longitude and radius are re-derived from the
//! interpolated position rather than interpolated directly, which keeps the
//! longitude well behaved across the dateline.

mod sp3;

pub use sp3::parse_sp3;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest number of samples for a usable series.
pub const MINIMUM_VELOCITY_EPOCHS: usize = 10;

/// Errors raised while building or interpolating an ephemeris series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("Orbit file lists {epochs} epochs, at least {required} required")]
    TooFewEpochs { epochs: usize, required: usize },
    #[error("Line {line}: expected a '{expected}' record")]
    MissingLine { line: usize, expected: char },
    #[error("Line {line}: {reason}")]
    ParseFailure { line: usize, reason: String },
    #[error("Orbit file header lists {expected} epochs but {found} were read")]
    EpochCountMismatch { expected: usize, found: usize },
    #[error("Sample {index} is earlier than the preceding sample")]
    NonMonotonicTime { index: usize },
    #[error("Query time {index} is earlier than the preceding query")]
    UnsortedQueryTimes { index: usize },
}

/// One ephemeris sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EphemerisSample {
    /// Unix time, seconds
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// North velocity, m/s
    pub vn: f64,
    /// East velocity, m/s
    pub ve: f64,
    /// Centre (downward) velocity, m/s
    pub vc: f64,
    /// Geocentric latitude, degrees
    pub latitude: f64,
    /// Longitude, degrees
    pub longitude: f64,
    /// Geocentric radius, m
    pub radius: f64,
}

/// Geocentric `(radius, latitude, longitude)` of a position vector.
fn geocentric(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let radius = (x * x + y * y + z * z).sqrt();
    let latitude = 90.0 - (z / radius).acos().to_degrees();
    let longitude = y.atan2(x).to_degrees();
    (radius, latitude, longitude)
}

impl EphemerisSample {
    /// Build a sample from a position and an inertial-axis velocity.
    ///
    /// The velocity is projected onto the NEC frame at the position:
    /// `c = -r/|r|`, `e = (c_y, -c_x, 0)/|.|`, `n = (-c_x c_z, -c_y c_z, c_x^2 + c_y^2)/|.|`.
    ///
    /// # Arguments
    /// * `time` - Unix time, seconds
    /// * `position` - `[x, y, z]` in metres
    /// * `velocity` - `[vx, vy, vz]` in m/s
    pub fn from_position_velocity(time: f64, position: [f64; 3], velocity: [f64; 3]) -> Self {
        let [x, y, z] = position;
        let [vx, vy, vz] = velocity;

        let (mut cx, mut cy, mut cz) = (-x, -y, -z);
        let cm = (cx * cx + cy * cy + cz * cz).sqrt();
        cx /= cm;
        cy /= cm;
        cz /= cm;

        let (mut ex, mut ey) = (cy, -cx);
        let em = (ex * ex + ey * ey).sqrt();
        ex /= em;
        ey /= em;

        let (mut nx, mut ny, mut nz) = (-cx * cz, -cy * cz, cx * cx + cy * cy);
        let nm = (nx * nx + ny * ny + nz * nz).sqrt();
        nx /= nm;
        ny /= nm;
        nz /= nm;

        let (radius, latitude, longitude) = geocentric(x, y, z);

        Self {
            time,
            x,
            y,
            z,
            vn: vx * nx + vy * ny + vz * nz,
            ve: vx * ex + vy * ey,
            vc: vx * cx + vy * cy + vz * cz,
            latitude,
            longitude,
            radius,
        }
    }

    /// Linear blend towards `next` by `fraction`, geolocation re-derived.
    fn lerp(&self, next: &EphemerisSample, time: f64, fraction: f64) -> Self {
        let blend = |a: f64, b: f64| a + (b - a) * fraction;
        let x = blend(self.x, next.x);
        let y = blend(self.y, next.y);
        let z = blend(self.z, next.z);
        let (radius, latitude, longitude) = geocentric(x, y, z);
        Self {
            time,
            x,
            y,
            z,
            vn: blend(self.vn, next.vn),
            ve: blend(self.ve, next.ve),
            vc: blend(self.vc, next.vc),
            latitude,
            longitude,
            radius,
        }
    }
}

/// Outcome of [`EphemerisSeries::interpolate_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationStatus {
    /// Output filled; `extrapolated` queries fell outside the series
    Interpolated {
        interpolated: usize,
        exact: usize,
        extrapolated: usize,
    },
    /// Series too short; output left untouched
    Unavailable { samples: usize },
}

impl InterpolationStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, InterpolationStatus::Interpolated { .. })
    }
}

/// Time-ordered ephemeris samples.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisSeries {
    samples: Vec<EphemerisSample>,
    minimum_samples: usize,
}

impl Default for EphemerisSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemerisSeries {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            minimum_samples: MINIMUM_VELOCITY_EPOCHS,
        }
    }

    /// Build a series from samples in non-decreasing time order.
    pub fn from_samples(samples: Vec<EphemerisSample>) -> Result<Self, EphemerisError> {
        let mut series = Self::new();
        series.append(samples)?;
        Ok(series)
    }

    /// Override the usable-series sample threshold.
    pub fn with_minimum_samples(mut self, minimum_samples: usize) -> Self {
        self.minimum_samples = minimum_samples;
        self
    }

    /// Append samples from another source.
    ///
    /// Samples must continue the existing time order; on error the series is
    /// left unchanged.
    pub fn append<I>(&mut self, samples: I) -> Result<(), EphemerisError>
    where
        I: IntoIterator<Item = EphemerisSample>,
    {
        let incoming: Vec<EphemerisSample> = samples.into_iter().collect();
        let mut previous = self.samples.last().map(|s| s.time);
        for (offset, sample) in incoming.iter().enumerate() {
            if let Some(time) = previous {
                if sample.time < time {
                    return Err(EphemerisError::NonMonotonicTime {
                        index: self.samples.len() + offset,
                    });
                }
            }
            previous = Some(sample.time);
        }
        self.samples.extend(incoming);
        Ok(())
    }

    /// Append samples that take precedence over the tail of the series.
    ///
    /// Existing samples at or after the first incoming epoch are dropped
    /// first, so an earlier orbit file running past midnight yields to the
    /// next one. Returns the number of samples dropped.
    pub fn append_superseding<I>(&mut self, samples: I) -> Result<usize, EphemerisError>
    where
        I: IntoIterator<Item = EphemerisSample>,
    {
        let incoming: Vec<EphemerisSample> = samples.into_iter().collect();
        let Some(first) = incoming.first().map(|s| s.time) else {
            return Ok(0);
        };
        let keep = self.samples.partition_point(|s| s.time < first);
        let dropped: Vec<EphemerisSample> = self.samples.drain(keep..).collect();
        if let Err(e) = self.append(incoming) {
            self.samples.extend(dropped);
            return Err(e);
        }
        Ok(dropped.len())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[EphemerisSample] {
        &self.samples
    }

    /// Samples needed to interpolate; never less than one.
    pub fn minimum_samples(&self) -> usize {
        self.minimum_samples.max(1)
    }

    /// Whether the series holds enough samples to interpolate.
    pub fn is_usable(&self) -> bool {
        self.samples.len() >= self.minimum_samples()
    }

    /// Interpolate the series at each of `times`.
    ///
    /// `times` must be non-decreasing. On success `out` is replaced by one
    /// sample per query time. When the series is too short `out` is not
    /// touched and [`InterpolationStatus::Unavailable`] is returned.
    ///
    /// # Returns
    /// * `Ok(InterpolationStatus)` - Whether `out` was filled
    /// * `Err(EphemerisError::UnsortedQueryTimes)` - If a query time decreases
    pub fn interpolate_into(
        &self,
        times: &[f64],
        out: &mut Vec<EphemerisSample>,
    ) -> Result<InterpolationStatus, EphemerisError> {
        if !self.is_usable() {
            return Ok(InterpolationStatus::Unavailable {
                samples: self.samples.len(),
            });
        }
        if let Some(index) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(EphemerisError::UnsortedQueryTimes { index: index + 1 });
        }

        let samples = &self.samples;
        let last = samples.len() - 1;
        let mut cursor = 0;
        let mut interpolated = 0;
        let mut exact = 0;
        let mut extrapolated = 0;
        let mut result = Vec::with_capacity(times.len());

        for &t in times {
            while cursor < last && samples[cursor + 1].time <= t {
                cursor += 1;
            }
            let current = &samples[cursor];
            if current.time >= t || cursor == last {
                if current.time == t {
                    exact += 1;
                } else {
                    extrapolated += 1;
                }
                result.push(EphemerisSample { time: t, ..*current });
            } else {
                let next = &samples[cursor + 1];
                let fraction = (t - current.time) / (next.time - current.time);
                result.push(current.lerp(next, t, fraction));
                interpolated += 1;
            }
        }

        if extrapolated > 0 {
            debug!(
                "{extrapolated} of {} query times outside ephemeris span [{}, {}]",
                times.len(),
                samples[0].time,
                samples[last].time
            );
        }

        *out = result;
        Ok(InterpolationStatus::Interpolated {
            interpolated,
            exact,
            extrapolated,
        })
    }
}
