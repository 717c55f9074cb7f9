//! Detector geometry: pixel radius, energy and angle-of-arrival maps.
//!
//! Every TII sensor images the ion distribution on a 66 row by 40 column CCD.
//! The distance of a pixel from the sensor's optical centre encodes the ion
//! energy, and the azimuth around that centre encodes the arrival direction.
//! The maps produced here are evaluated in the same precision and pixel order
//! as the flight ground processor so that downstream sums are reproducible.
//!
//! Pixel offsets from the centre are `x = x0 - col`, `y = y0 - row`.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TracisError;

/// Rows of a TII image.
pub const IMAGE_ROWS: usize = 66;
/// Columns of a TII image.
pub const IMAGE_COLS: usize = 40;

/// Inner dome radius projected onto the detector, in pixels.
pub const R_INNER_PIXELS: f32 = (10.5_f64 / 0.3556_f64) as f32;
/// Ions can land slightly beyond the inner dome radius.
pub const R_INNER_CUSHION: f32 = 5.0;

/// Sentinel for pixels without a valid energy.
pub const MISSING_ENERGY: f32 = -1.0;
/// Sentinel for pixels without a valid angle of arrival.
pub const MISSING_ANGLE: f32 = -200.0;

/// Per-pixel radius from the detector centre, pixels.
pub type RadiusMap = Array2<f32>;
/// Per-pixel ion energy, eV.
pub type EnergyMap = Array2<f32>;
/// Per-pixel angle of arrival, degrees.
pub type AngleMap = Array2<f32>;

/// Swarm satellite carrying the imager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Satellite {
    A,
    B,
    C,
}

impl Satellite {
    /// Parse a satellite letter.
    ///
    /// # Returns
    /// * `Ok(Satellite)` for 'A', 'B' or 'C'
    /// * `Err(TracisError::UnknownSatellite)` for anything else
    pub fn from_letter(letter: char) -> Result<Self, TracisError> {
        match letter {
            'A' => Ok(Satellite::A),
            'B' => Ok(Satellite::B),
            'C' => Ok(Satellite::C),
            other => Err(TracisError::UnknownSatellite(other)),
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Satellite::A => 'A',
            Satellite::B => 'B',
            Satellite::C => 'C',
        }
    }
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One of the two imager heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    H,
    V,
}

impl Sensor {
    pub const BOTH: [Sensor; 2] = [Sensor::H, Sensor::V];
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensor::H => write!(f, "H"),
            Sensor::V => write!(f, "V"),
        }
    }
}

/// Dimensions of the detector pixel grid.
///
/// Arrays are laid out `(rows, cols)`. The instrument's flat pixel index is
/// column-major: `index = col * rows + row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectorGrid {
    pub rows: usize,
    pub cols: usize,
}

impl DetectorGrid {
    /// The 66 x 40 TII grid
    pub const TII: DetectorGrid = DetectorGrid {
        rows: IMAGE_ROWS,
        cols: IMAGE_COLS,
    };

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Shape tuple in ndarray order
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Create a zeroed u16 image of this size
    pub fn empty_image(&self) -> Array2<u16> {
        Array2::zeros(self.shape())
    }

    /// Split a flat column-major pixel index into `(row, col)`.
    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index % self.rows, index / self.rows)
    }

    /// Pixel positions `(row, col)` in flat index order.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> {
        let rows = self.rows;
        (0..self.cols).flat_map(move |col| (0..rows).map(move |row| (row, col)))
    }

    /// Verify that an array has the grid's shape.
    pub fn check_shape<T>(&self, array: &Array2<T>) -> Result<(), TracisError> {
        if array.dim() != self.shape() {
            return Err(TracisError::ShapeMismatch {
                expected: self.shape(),
                actual: array.dim(),
            });
        }
        Ok(())
    }
}

impl Default for DetectorGrid {
    fn default() -> Self {
        Self::TII
    }
}

/// Optical centre `(x0, y0)` of a sensor, in pixels.
pub fn detector_centre(satellite: Satellite, sensor: Sensor) -> (f32, f32) {
    match (satellite, sensor) {
        (Satellite::A, Sensor::H) => (33.0411, 31.1261),
        (Satellite::A, Sensor::V) => (32.3852, 33.5174),
        (Satellite::B, Sensor::H) => (33.8073, 32.496),
        (Satellite::B, Sensor::V) => (33.8465, 33.3973),
        (Satellite::C, Sensor::H) => (33.429, 29.2934),
        (Satellite::C, Sensor::V) => (31.7489, 35.8786),
    }
}

/// Build a per-pixel map from the pixel offset `(x, y)` relative to the centre.
fn map_offsets<F>(satellite: Satellite, sensor: Sensor, mut value: F) -> Array2<f32>
where
    F: FnMut(f32, f32) -> f32,
{
    let grid = DetectorGrid::TII;
    let (x0, y0) = detector_centre(satellite, sensor);
    let mut map = Array2::zeros(grid.shape());
    for (row, col) in grid.positions() {
        let x = x0 - col as f32;
        let y = y0 - row as f32;
        map[[row, col]] = value(x, y);
    }
    map
}

fn hypot(x: f32, y: f32) -> f64 {
    (x as f64).hypot(y as f64)
}

/// Distance of every pixel from the sensor centre.
pub fn radius_map(satellite: Satellite, sensor: Sensor) -> RadiusMap {
    map_offsets(satellite, sensor, |x, y| hypot(x, y) as f32)
}

/// Ion energy of every pixel for the given voltages.
///
/// Pixels inside `R_INNER_PIXELS + R_INNER_CUSHION` take the energy model
/// value, with negative model energies replaced by [`MISSING_ENERGY`]. Pixels
/// at or beyond that radius are [`MISSING_ENERGY`].
///
/// # Arguments
/// * `inner_dome_voltage` - Bias grid (inner dome) monitor voltage, V
/// * `mcp_voltage` - MCP monitor voltage, V
pub fn energy_map(
    satellite: Satellite,
    sensor: Sensor,
    inner_dome_voltage: f32,
    mcp_voltage: f32,
) -> EnergyMap {
    let r_max = R_INNER_PIXELS + R_INNER_CUSHION;
    map_offsets(satellite, sensor, |x, y| {
        let r = hypot(x, y) as f32;
        if r < r_max {
            let energy = eofr(r as f64, inner_dome_voltage, mcp_voltage);
            if energy < 0.0 {
                MISSING_ENERGY
            } else {
                energy
            }
        } else {
            MISSING_ENERGY
        }
    })
}

/// Angle of arrival of every pixel in degrees, `(-180, 180]`.
///
/// Pixels at or outside the inner dome radius are [`MISSING_ANGLE`].
pub fn angle_of_arrival_map(satellite: Satellite, sensor: Sensor) -> AngleMap {
    map_offsets(satellite, sensor, |x, y| {
        let rho = (hypot(x, y) / R_INNER_PIXELS as f64) as f32;
        if rho < 1.0 {
            ((y as f64).atan2(x as f64) * 180.0 / PI) as f32
        } else {
            MISSING_ANGLE
        }
    })
}

/// Ion energy in eV at detector radius `r` pixels.
///
/// Cubic fits to particle-tracing simulations of the analyser. The -99 V
/// coefficients apply below -90 V, the -60.3 V coefficients otherwise, and
/// above -60 V the result is scaled linearly with the dome voltage. The MCP
/// voltage does not enter the model.
pub fn eofr(r: f64, inner_dome_voltage: f32, _mcp_voltage: f32) -> f32 {
    let (a, b, c, d) = if inner_dome_voltage < -90.0 {
        (
            -0.9849666707472252,
            0.25076488696479904,
            0.02909150117625129,
            0.00017439906324331827,
        )
    } else {
        (
            -2.4014615344450805,
            0.7439055999344776,
            -0.030922802815747417,
            0.001209654508105981,
        )
    };

    let mut energy = (a + b * r + c * r * r + d * r * r * r) as f32;
    if inner_dome_voltage > -60.0 {
        energy = (energy as f64 / 60.3 * (inner_dome_voltage as f64).abs()) as f32;
    }
    energy
}

/// Voltage-independent maps reused for every record of a run.
#[derive(Debug, Default)]
pub struct GeometryCache {
    radius: HashMap<(Satellite, Sensor), RadiusMap>,
    angle: HashMap<(Satellite, Sensor), AngleMap>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radius_map(&mut self, satellite: Satellite, sensor: Sensor) -> &RadiusMap {
        self.radius
            .entry((satellite, sensor))
            .or_insert_with(|| radius_map(satellite, sensor))
    }

    pub fn angle_map(&mut self, satellite: Satellite, sensor: Sensor) -> &AngleMap {
        self.angle
            .entry((satellite, sensor))
            .or_insert_with(|| angle_of_arrival_map(satellite, sensor))
    }
}
