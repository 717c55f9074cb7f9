//! Error types for day processing.

use thiserror::Error;

use crate::ephemeris::EphemerisError;
use crate::stats::StatsError;

/// Errors that abort processing of a satellite-day.
#[derive(Error, Debug)]
pub enum TracisError {
    #[error("Unknown satellite '{0}', expected one of A, B or C")]
    UnknownSatellite(char),
    #[error("Invalid satellite-date '{0}', expected Xyyyymmdd")]
    InvalidDate(String),
    #[error("Ephemeris unavailable: {samples} samples, at least {required} required")]
    EphemerisUnavailable { samples: usize, required: usize },
    #[error("No images found for the requested day")]
    NoImages,
    #[error("Image shape {actual:?} does not match detector grid {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TracisError>;
