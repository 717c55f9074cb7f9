//! Energy and angle-of-arrival spectra.
//!
//! A spectrum bins pixel counts on a uniform axis and reports, per bin, the
//! mean count and the mean physical coordinate of the pixels that landed in
//! it. Energy spectra bin on detector radius (energy is monotonic in radius
//! over the binned annulus) and average the pixel energies; angular spectra
//! bin and average on the angle of arrival.
//!
//! Bin edges belong to the bin they open: a coordinate exactly at
//! `min + k * width` lands in bin `k`, and `max` itself is discarded.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TracisError;
use crate::geometry::{
    detector_centre, eofr, AngleMap, DetectorGrid, EnergyMap, RadiusMap, Satellite, Sensor,
    MISSING_ANGLE, MISSING_ENERGY,
};

pub const ENERGY_BINS: usize = 20;
pub const ANGULAR_BINS: usize = 72;
pub const COLUMN_SUM_ENERGY_BINS: usize = 32;

/// Inner edge of the binned annulus, pixels.
pub const MIN_RADIUS: f32 = 5.0;
/// Outer edge of the binned annulus, pixels.
pub const MAX_RADIUS: f32 = 32.0;
pub const MIN_ANGLE: f32 = -135.0;
pub const MAX_ANGLE: f32 = 135.0;

/// Boundaries of the logarithmic energy bins, eV.
pub const ENERGY_BIN_BOUNDARIES: [f32; 16] = [
    0.0, 0.25, 0.351927, 0.495411, 0.697395, 0.981729, 1.38199, 1.94544, 2.73861, 3.85517,
    5.42696, 7.63958, 10.7543, 15.1389, 21.3112, 30.0,
];

/// Per-pixel gain map. Only used as a validity gate: values `> 0` pass.
pub type GainMap = Array2<f64>;

/// Uniform binning axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralAxis {
    pub bins: usize,
    pub min: f32,
    pub max: f32,
}

impl SpectralAxis {
    /// Radius axis used for energy spectra
    pub const ENERGY: SpectralAxis = SpectralAxis {
        bins: ENERGY_BINS,
        min: MIN_RADIUS,
        max: MAX_RADIUS,
    };

    /// Angle axis used for angle-of-arrival spectra
    pub const ANGLE: SpectralAxis = SpectralAxis {
        bins: ANGULAR_BINS,
        min: MIN_ANGLE,
        max: MAX_ANGLE,
    };

    pub fn width(&self) -> f32 {
        (self.max - self.min) / self.bins as f32
    }

    /// Bin holding `coordinate`, or `None` outside `[min, max)`.
    pub fn bin_index(&self, coordinate: f32) -> Option<usize> {
        let bin = ((coordinate - self.min) / self.width()).floor();
        if bin >= 0.0 && bin < self.bins as f32 {
            Some(bin as usize)
        } else {
            None
        }
    }
}

/// Binned spectrum with the mean coordinate of each bin.
///
/// Bins without hits are zero in both arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Mean pixel count per bin
    pub counts: Vec<f32>,
    /// Mean physical coordinate per bin (eV or degrees)
    pub coordinates: Vec<f32>,
}

impl Spectrum {
    pub fn zeros(bins: usize) -> Self {
        Self {
            counts: vec![0.0; bins],
            coordinates: vec![0.0; bins],
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Accumulate a spectrum over an image.
///
/// Pixels are visited in the instrument's column-major order. For each pixel
/// that passes the gate, `sample(row, col)` returns the binning coordinate and
/// the physical value to average, or `None` to skip the pixel.
///
/// # Arguments
/// * `image` - Pixel counts
/// * `gate` - Optional gain map; pixels with gain `<= 0` are skipped
/// * `axis` - Binning axis applied to the sampled coordinate
/// * `sample` - Per-pixel `(coordinate, value)` lookup
pub fn accumulate<F>(
    image: &Array2<u16>,
    gate: Option<&GainMap>,
    axis: &SpectralAxis,
    mut sample: F,
) -> Result<Spectrum, TracisError>
where
    F: FnMut(usize, usize) -> Option<(f32, f32)>,
{
    let grid = DetectorGrid {
        rows: image.nrows(),
        cols: image.ncols(),
    };
    if let Some(gain) = gate {
        grid.check_shape(gain)?;
    }

    let mut spectrum = Spectrum::zeros(axis.bins);
    let mut hits = vec![0u32; axis.bins];

    for (row, col) in grid.positions() {
        let gain = gate.map_or(1.0, |g| g[[row, col]]);
        if gain <= 0.0 {
            continue;
        }
        let Some((coordinate, value)) = sample(row, col) else {
            continue;
        };
        if let Some(bin) = axis.bin_index(coordinate) {
            spectrum.counts[bin] += image[[row, col]] as f32;
            spectrum.coordinates[bin] += value;
            hits[bin] += 1;
        }
    }

    for (bin, &n) in hits.iter().enumerate() {
        if n > 0 {
            spectrum.counts[bin] /= n as f32;
            spectrum.coordinates[bin] /= n as f32;
        }
    }
    Ok(spectrum)
}

/// Energy spectrum: binned on radius, averaging pixel energies.
pub fn energy_spectrum(
    image: &Array2<u16>,
    energy_map: &EnergyMap,
    radius_map: &RadiusMap,
    gate: Option<&GainMap>,
) -> Result<Spectrum, TracisError> {
    let grid = DetectorGrid {
        rows: image.nrows(),
        cols: image.ncols(),
    };
    grid.check_shape(energy_map)?;
    grid.check_shape(radius_map)?;

    accumulate(image, gate, &SpectralAxis::ENERGY, |row, col| {
        let energy = energy_map[[row, col]];
        if energy == MISSING_ENERGY {
            None
        } else {
            Some((radius_map[[row, col]], energy))
        }
    })
}

/// Angle-of-arrival spectrum: binned and averaged on angle.
///
/// Pixels inside [`MIN_RADIUS`] are excluded so the angular spectrum covers
/// the same annulus as the energy spectrum.
pub fn angle_of_arrival_spectrum(
    image: &Array2<u16>,
    angle_map: &AngleMap,
    radius_map: &RadiusMap,
    gate: Option<&GainMap>,
) -> Result<Spectrum, TracisError> {
    let grid = DetectorGrid {
        rows: image.nrows(),
        cols: image.ncols(),
    };
    grid.check_shape(angle_map)?;
    grid.check_shape(radius_map)?;

    accumulate(image, gate, &SpectralAxis::ANGLE, |row, col| {
        let angle = angle_map[[row, col]];
        if angle == MISSING_ANGLE || radius_map[[row, col]] < MIN_RADIUS {
            None
        } else {
            Some((angle, angle))
        }
    })
}

/// Energies of the on-board column-sum spectrum bins.
///
/// Column-sum bin `j` sits `|x0 - (32 - j)|` pixels from the sensor centre.
/// Negative model energies become [`MISSING_ENERGY`].
pub fn column_sum_energies(
    satellite: Satellite,
    sensor: Sensor,
    bias_voltage_setting: f32,
    mcp_voltage_setting: f32,
) -> Vec<f32> {
    let (x0, _) = detector_centre(satellite, sensor);
    (0..COLUMN_SUM_ENERGY_BINS)
        .map(|j| {
            let r = (x0 as f64 - (COLUMN_SUM_ENERGY_BINS - j) as f64).abs() as f32;
            let energy = eofr(r as f64, bias_voltage_setting, mcp_voltage_setting);
            if energy < 0.0 {
                MISSING_ENERGY
            } else {
                energy
            }
        })
        .collect()
}

/// Logarithmic energy bin of `energy` in eV.
///
/// Bin `k > 0` covers `(boundary[k-1], boundary[k]]`, so an energy exactly on
/// a boundary falls in the lower bin. Zero is bin 0.
///
/// # Returns
/// * `Some(bin)` for energies in `[0, 30]` eV
/// * `None` for negative energies or energies above the last boundary
pub fn energy_bin(energy: f32) -> Option<usize> {
    if energy < ENERGY_BIN_BOUNDARIES[0] {
        return None;
    }
    ENERGY_BIN_BOUNDARIES
        .iter()
        .position(|&boundary| energy <= boundary)
}
