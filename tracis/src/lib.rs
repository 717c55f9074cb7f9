//! Thermal ion imager (TII) processing core.
//!
//! Turns decoded TII imagery, auxiliary telemetry and satellite ephemerides
//! into calibrated products: per-pixel energy and angle-of-arrival maps,
//! binned energy and angular spectra, robust per-image statistics and
//! geolocation tags for every record.
//!
//! The numeric pipeline runs one satellite-day at a time through
//! [`pipeline::DayProcessor`]. File formats for the scientific container are
//! handled elsewhere; this crate consumes and produces plain typed arrays.

pub mod config;
pub mod ephemeris;
pub mod error;
pub mod geometry;
pub mod log_context;
pub mod pipeline;
pub mod products;
pub mod records;
pub mod spectra;
pub mod stats;

pub use config::ProcessingConfig;
pub use ephemeris::{EphemerisSample, EphemerisSeries, InterpolationStatus};
pub use error::TracisError;
pub use geometry::{DetectorGrid, Satellite, Sensor};
pub use log_context::LogContext;
pub use pipeline::{DayProcessor, DayProducts, GainMapSource};
pub use records::{AnomalyFlags, ColumnSumRecord, ImageAux, ImagePair, ImageRecord};
pub use spectra::{SpectralAxis, Spectrum};
pub use stats::{RobustStats, StatsError};
