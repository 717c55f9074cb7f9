//! Day pipeline: turns one satellite-day of decoded frames into records.
//!
//! For each image pair inside the day the processor computes energy and
//! angle-of-arrival maps from the instantaneous monitor voltages, four spectra
//! per sensor (raw and gain-gated, energy and angle) and copies the auxiliary
//! telemetry. Column-sum samples get per-bin energies from the voltage
//! settings. Finally every record is tagged with the interpolated ephemeris.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ProcessingConfig;
use crate::ephemeris::{EphemerisSample, EphemerisSeries, InterpolationStatus};
use crate::error::TracisError;
use crate::geometry::{energy_map, DetectorGrid, GeometryCache, Sensor};
use crate::log_context::LogContext;
use crate::products::{ProductNames, SatelliteDay};
use crate::records::{
    blank_image, normalise_column_sum, ColumnSumRecord, ColumnSumSample, ImageAux, ImagePair,
    ImageRecord, SensorImage, SensorProducts,
};
use crate::spectra::{angle_of_arrival_spectrum, column_sum_energies, energy_spectrum, GainMap};

/// Lookup of per-pixel gain maps.
pub trait GainMapSource {
    /// Gain map for an instrument and sensor at a Unix time, if one applies.
    fn gain_map(&self, instrument_id: u8, sensor: Sensor, time: f64) -> Option<GainMap>;
}

/// No gain correction available: corrected spectra are ungated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGainMaps;

impl GainMapSource for NoGainMaps {
    fn gain_map(&self, _instrument_id: u8, _sensor: Sensor, _time: f64) -> Option<GainMap> {
        None
    }
}

/// Fixed gain maps keyed by instrument and sensor, valid at all times.
#[derive(Debug, Clone, Default)]
pub struct StaticGainMaps {
    maps: HashMap<(u8, Sensor), GainMap>,
}

impl StaticGainMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument_id: u8, sensor: Sensor, map: GainMap) {
        self.maps.insert((instrument_id, sensor), map);
    }
}

impl GainMapSource for StaticGainMaps {
    fn gain_map(&self, instrument_id: u8, sensor: Sensor, _time: f64) -> Option<GainMap> {
        self.maps.get(&(instrument_id, sensor)).cloned()
    }
}

/// Decoded inputs for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayInputs {
    pub image_pairs: Vec<ImagePair>,
    #[serde(default)]
    pub column_sums: Vec<ColumnSumSample>,
}

/// Records handed to the exporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayProducts {
    pub image_records: Vec<ImageRecord>,
    pub column_sum_records: Vec<ColumnSumRecord>,
}

impl DayProducts {
    /// Write both products as JSON next to their base names.
    ///
    /// Nothing is written when there are no image records.
    pub fn save_to_files(&self, names: &ProductNames) -> Result<(), TracisError> {
        if self.image_records.is_empty() {
            return Ok(());
        }
        let full_cadence = ProductNames::with_extension(&names.full_cadence, "json");
        std::fs::write(full_cadence, serde_json::to_string(&self.image_records)?)?;
        let column_sum = ProductNames::with_extension(&names.column_sum, "json");
        std::fs::write(column_sum, serde_json::to_string(&self.column_sum_records)?)?;
        Ok(())
    }
}

/// Processes the frames of one satellite-day.
pub struct DayProcessor {
    day: SatelliteDay,
    config: ProcessingConfig,
    context: LogContext,
    geometry: GeometryCache,
}

impl DayProcessor {
    pub fn new(day: SatelliteDay, config: ProcessingConfig) -> Self {
        let context = LogContext::new(day.satellite, day.date, config.export_version.clone());
        Self {
            day,
            config,
            context,
            geometry: GeometryCache::new(),
        }
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    /// Run the pipeline over a day's inputs.
    ///
    /// # Returns
    /// * `Ok(DayProducts)` - One record per in-day image pair and column sum
    /// * `Err(TracisError::EphemerisUnavailable)` - Too few ephemeris samples
    /// * `Err(TracisError::NoImages)` - The inputs contain no image pairs
    /// * `Err(TracisError::ShapeMismatch)` - An image is not 66 x 40
    pub fn process(
        &mut self,
        inputs: &DayInputs,
        ephemeris: &EphemerisSeries,
        gains: &dyn GainMapSource,
    ) -> Result<DayProducts, TracisError> {
        let series = ephemeris
            .clone()
            .with_minimum_samples(self.config.minimum_ephemeris_samples);
        if !series.is_usable() {
            warn!("{}Unable to load satellite ephemerides.", self.context);
            return Err(TracisError::EphemerisUnavailable {
                samples: series.len(),
                required: series.minimum_samples(),
            });
        }
        if inputs.image_pairs.is_empty() {
            warn!(
                "{}No images found for satellite {} on {}",
                self.context,
                self.day.satellite,
                self.day.compact_date()
            );
            return Err(TracisError::NoImages);
        }

        let mut image_records = Vec::new();
        for pair in &inputs.image_pairs {
            if !self.day.contains(pair.time) || !pair.has_any_image() {
                continue;
            }
            image_records.push(self.process_pair(pair, gains)?);
        }

        let mut column_sum_records: Vec<ColumnSumRecord> = inputs
            .column_sums
            .iter()
            .filter(|sample| self.day.contains(sample.time))
            .map(|sample| self.column_sum_record(sample))
            .collect();

        // Interpolation sweeps forward in time
        image_records.sort_by(|a, b| a.time.total_cmp(&b.time));
        column_sum_records.sort_by(|a, b| a.time.total_cmp(&b.time));

        let image_times: Vec<f64> = image_records.iter().map(|r| r.time).collect();
        let locations = self.locate(&series, &image_times)?;
        for (record, location) in image_records.iter_mut().zip(locations) {
            record.location = location;
        }
        let column_times: Vec<f64> = column_sum_records.iter().map(|r| r.time).collect();
        let locations = self.locate(&series, &column_times)?;
        for (record, location) in column_sum_records.iter_mut().zip(locations) {
            record.location = location;
        }

        info!(
            "{}{} image records, {} column-sum records",
            self.context,
            image_records.len(),
            column_sum_records.len()
        );
        Ok(DayProducts {
            image_records,
            column_sum_records,
        })
    }

    /// Interpolated location per time.
    fn locate(
        &self,
        series: &EphemerisSeries,
        times: &[f64],
    ) -> Result<Vec<Option<EphemerisSample>>, TracisError> {
        let mut samples = Vec::new();
        match series.interpolate_into(times, &mut samples)? {
            InterpolationStatus::Interpolated { extrapolated, .. } => {
                if extrapolated > 0 {
                    debug!(
                        "{}{} records use nearest-sample ephemeris",
                        self.context, extrapolated
                    );
                }
                Ok(samples.into_iter().map(Some).collect())
            }
            InterpolationStatus::Unavailable { samples } => {
                Err(TracisError::EphemerisUnavailable {
                    samples,
                    required: series.minimum_samples(),
                })
            }
        }
    }

    /// Build the full-cadence record for one image pair.
    pub fn process_pair(
        &mut self,
        pair: &ImagePair,
        gains: &dyn GainMapSource,
    ) -> Result<ImageRecord, TracisError> {
        let h = self.sensor_products(Sensor::H, pair.h.as_ref(), pair.time, gains)?;
        let v = self.sensor_products(Sensor::V, pair.v.as_ref(), pair.time, gains)?;

        let thresholds = &self.config.imaging_mode;
        let imaging = |aux: &ImageAux| {
            thresholds.is_imaging(aux.mcp_voltage, aux.phosphor_voltage, aux.bias_voltage)
        };
        let imaging_mode = imaging(&h.aux) && imaging(&v.aux);

        Ok(ImageRecord {
            time: pair.time,
            imaging_mode,
            h,
            v,
            faceplate_voltage: pair.faceplate_voltage(),
            location: None,
        })
    }

    fn sensor_products(
        &mut self,
        sensor: Sensor,
        image: Option<&SensorImage>,
        time: f64,
        gains: &dyn GainMapSource,
    ) -> Result<SensorProducts, TracisError> {
        let satellite = self.day.satellite;
        let valid = image.is_some();
        let image = image
            .cloned()
            .unwrap_or_else(|| SensorImage::new(blank_image(), ImageAux::default()));

        let grid = DetectorGrid::TII;
        grid.check_shape(&image.raw)?;
        let corrected = image.corrected_or_raw().clone();
        grid.check_shape(&corrected)?;

        let aux = image.aux;
        let energy = energy_map(satellite, sensor, aux.bias_voltage, aux.mcp_voltage);
        let angle = self.geometry.angle_map(satellite, sensor).clone();
        let radius = self.geometry.radius_map(satellite, sensor);

        let raw_energy_spectrum = energy_spectrum(&image.raw, &energy, radius, None)?;
        let raw_angle_spectrum = angle_of_arrival_spectrum(&image.raw, &angle, radius, None)?;

        let gain = gains.gain_map(aux.instrument_id, sensor, time);
        if valid && gain.is_none() {
            debug!(
                "{}No gain map for instrument {} sensor {} at {:.1}",
                self.context, aux.instrument_id, sensor, time
            );
        }
        let energy_spectrum = energy_spectrum(&corrected, &energy, radius, gain.as_ref())?;
        let angle_spectrum = angle_of_arrival_spectrum(&corrected, &angle, radius, gain.as_ref())?;

        Ok(SensorProducts {
            valid,
            raw_image: image.raw,
            corrected_image: corrected,
            anomaly_flags: image.anomaly_flags,
            energy_map: energy,
            angle_map: angle,
            raw_energy_spectrum,
            raw_angle_spectrum,
            energy_spectrum,
            angle_spectrum,
            aux,
        })
    }

    /// Build the record for one 2 Hz column-sum sample.
    pub fn column_sum_record(&self, sample: &ColumnSumSample) -> ColumnSumRecord {
        let satellite = self.day.satellite;
        let (h, v) = (sample.settings_h, sample.settings_v);
        let thresholds = &self.config.imaging_mode;
        let imaging_mode = thresholds.is_imaging(h.mcp, h.phosphor, h.bias)
            && thresholds.is_imaging(v.mcp, v.phosphor, v.bias);

        ColumnSumRecord {
            time: sample.time,
            settings_h: h,
            settings_v: v,
            spectrum_h: normalise_column_sum(&sample.column_sum_h),
            spectrum_v: normalise_column_sum(&sample.column_sum_v),
            energies_h: column_sum_energies(satellite, Sensor::H, h.bias, h.mcp),
            energies_v: column_sum_energies(satellite, Sensor::V, v.bias, v.mcp),
            imaging_mode,
            location: None,
        }
    }
}
