//! Input frames and output records of the day pipeline.

use bitflags::bitflags;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::ephemeris::EphemerisSample;
use crate::geometry::{AngleMap, DetectorGrid, EnergyMap, Sensor};
use crate::spectra::{Spectrum, COLUMN_SUM_ENERGY_BINS};

bitflags! {
    /// Image anomaly flags assigned by the external anomaly analyser.
    ///
    /// An empty set means the estimate is OK.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AnomalyFlags: u8 {
        const CLASSIC_WING = 1 << 0;
        const UPPER_ANGELS_WING = 1 << 1;
        const LOWER_ANGELS_WING = 1 << 2;
        const PERIPHERAL = 1 << 3;
        const MEASLES = 1 << 4;
        const BIFURCATION = 1 << 5;
    }
}

/// Voltage thresholds identifying the science imaging configuration.
///
/// A sensor is imaging when its MCP voltage is below `mcp_below`, its
/// phosphor voltage above `phosphor_above` and its bias grid below
/// `bias_below`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagingModeThresholds {
    pub mcp_below: f32,
    pub phosphor_above: f32,
    pub bias_below: f32,
}

impl Default for ImagingModeThresholds {
    fn default() -> Self {
        Self {
            mcp_below: -1000.0,
            phosphor_above: 3900.0,
            bias_below: -50.0,
        }
    }
}

impl ImagingModeThresholds {
    pub fn is_imaging(&self, mcp: f32, phosphor: f32, bias: f32) -> bool {
        mcp < self.mcp_below && phosphor > self.phosphor_above && bias < self.bias_below
    }
}

/// Auxiliary telemetry accompanying one sensor image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAux {
    /// Bias grid (inner dome) monitor voltage, V
    pub bias_voltage: f32,
    pub mcp_voltage: f32,
    pub phosphor_voltage: f32,
    pub faceplate_voltage: f32,
    pub ccd_dark_current: f32,
    pub ccd_temperature: f32,
    pub shutter_duty_cycle: f32,
    /// EFI instrument serial, keys the gain map lookup
    pub instrument_id: u8,
}

/// One decoded sensor image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorImage {
    pub raw: Array2<u16>,
    /// Gain-corrected image; the raw image is used when absent
    #[serde(default)]
    pub corrected: Option<Array2<u16>>,
    pub aux: ImageAux,
    #[serde(default)]
    pub anomaly_flags: AnomalyFlags,
}

impl SensorImage {
    pub fn new(raw: Array2<u16>, aux: ImageAux) -> Self {
        Self {
            raw,
            corrected: None,
            aux,
            anomaly_flags: AnomalyFlags::empty(),
        }
    }

    pub fn corrected_or_raw(&self) -> &Array2<u16> {
        self.corrected.as_ref().unwrap_or(&self.raw)
    }
}

/// Time-aligned H and V images. Either sensor may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePair {
    /// Unix time, seconds
    pub time: f64,
    pub h: Option<SensorImage>,
    pub v: Option<SensorImage>,
}

impl ImagePair {
    pub fn sensor(&self, sensor: Sensor) -> Option<&SensorImage> {
        match sensor {
            Sensor::H => self.h.as_ref(),
            Sensor::V => self.v.as_ref(),
        }
    }

    pub fn has_any_image(&self) -> bool {
        self.h.is_some() || self.v.is_some()
    }

    /// Faceplate voltage, taken from H when that image is present.
    pub fn faceplate_voltage(&self) -> f32 {
        self.h
            .as_ref()
            .or(self.v.as_ref())
            .map_or(0.0, |image| image.aux.faceplate_voltage)
    }
}

/// Products of one sensor for one full-cadence record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorProducts {
    pub valid: bool,
    pub raw_image: Array2<u16>,
    pub corrected_image: Array2<u16>,
    pub anomaly_flags: AnomalyFlags,
    pub energy_map: EnergyMap,
    pub angle_map: AngleMap,
    /// Raw image, no gate; `coordinates` hold the mean bin energies
    pub raw_energy_spectrum: Spectrum,
    /// Raw image, no gate; `coordinates` hold the mean bin angles
    pub raw_angle_spectrum: Spectrum,
    pub energy_spectrum: Spectrum,
    pub angle_spectrum: Spectrum,
    pub aux: ImageAux,
}

/// Full-cadence output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Unix time, seconds
    pub time: f64,
    pub imaging_mode: bool,
    pub h: SensorProducts,
    pub v: SensorProducts,
    pub faceplate_voltage: f32,
    /// Interpolated ephemeris; `None` when the ephemeris was unavailable
    pub location: Option<EphemerisSample>,
}

impl ImageRecord {
    pub fn sensor(&self, sensor: Sensor) -> &SensorProducts {
        match sensor {
            Sensor::H => &self.h,
            Sensor::V => &self.v,
        }
    }
}

/// Per-sensor high-voltage settings for a column-sum sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoltageSettings {
    pub mcp: f32,
    pub phosphor: f32,
    pub bias: f32,
}

/// One 2 Hz column-sum telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSumSample {
    /// Unix time, seconds
    pub time: f64,
    pub settings_h: VoltageSettings,
    pub settings_v: VoltageSettings,
    pub column_sum_h: Vec<u16>,
    pub column_sum_v: Vec<u16>,
}

/// Column-sum output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSumRecord {
    pub time: f64,
    pub settings_h: VoltageSettings,
    pub settings_v: VoltageSettings,
    pub spectrum_h: Vec<u16>,
    pub spectrum_v: Vec<u16>,
    /// Energy of each column-sum bin, eV
    pub energies_h: Vec<f32>,
    pub energies_v: Vec<f32>,
    pub imaging_mode: bool,
    pub location: Option<EphemerisSample>,
}

/// Pad or truncate a column sum to the standard bin count.
pub(crate) fn normalise_column_sum(values: &[u16]) -> Vec<u16> {
    let mut bins = vec![0u16; COLUMN_SUM_ENERGY_BINS];
    for (bin, value) in bins.iter_mut().zip(values) {
        *bin = *value;
    }
    bins
}

/// An all-zero image standing in for a missing sensor.
pub(crate) fn blank_image() -> Array2<u16> {
    DetectorGrid::TII.empty_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_flags_combine() {
        let mut flags = AnomalyFlags::empty();
        assert_eq!(flags.bits(), 0);
        flags |= AnomalyFlags::MEASLES;
        flags |= AnomalyFlags::CLASSIC_WING;
        assert_eq!(flags.bits(), 0b10001);
        assert!(flags.contains(AnomalyFlags::MEASLES));
        assert!(!flags.contains(AnomalyFlags::PERIPHERAL));
        assert_eq!(AnomalyFlags::BIFURCATION.bits(), 32);
        assert_eq!(AnomalyFlags::all().bits(), 0x3f);
    }

    #[test]
    fn test_imaging_mode_thresholds() {
        let thresholds = ImagingModeThresholds::default();
        assert!(thresholds.is_imaging(-2000.0, 4000.0, -60.0));
        assert!(!thresholds.is_imaging(-1000.0, 4000.0, -60.0));
        assert!(!thresholds.is_imaging(-2000.0, 3900.0, -60.0));
        assert!(!thresholds.is_imaging(-2000.0, 4000.0, -50.0));
    }

    #[test]
    fn test_faceplate_prefers_h() {
        let aux_h = ImageAux {
            faceplate_voltage: -3.0,
            ..Default::default()
        };
        let aux_v = ImageAux {
            faceplate_voltage: -4.0,
            ..Default::default()
        };

        let mut pair = ImagePair {
            time: 0.0,
            h: Some(SensorImage::new(blank_image(), aux_h)),
            v: Some(SensorImage::new(blank_image(), aux_v)),
        };
        assert_eq!(pair.faceplate_voltage(), -3.0);
        pair.h = None;
        assert_eq!(pair.faceplate_voltage(), -4.0);
        assert!(pair.has_any_image());
        pair.v = None;
        assert!(!pair.has_any_image());
    }

    #[test]
    fn test_normalise_column_sum() {
        let short = normalise_column_sum(&[1, 2, 3]);
        assert_eq!(short.len(), COLUMN_SUM_ENERGY_BINS);
        assert_eq!(&short[..4], &[1, 2, 3, 0]);
        let long: Vec<u16> = (0..40).collect();
        assert_eq!(normalise_column_sum(&long), (0..32).collect::<Vec<u16>>());
    }
}
