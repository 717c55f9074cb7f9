//! Error types for the cosmic-ray detector.

use thiserror::Error;
use tracis::StatsError;

#[derive(Error, Debug)]
pub enum GcrError {
    #[error("Image shape {actual:?} does not match detector grid {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
