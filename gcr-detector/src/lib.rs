//! Galactic cosmic-ray and hot-pixel monitor for thermal ion imager frames.
//!
//! Reads the full-cadence records written by `tracis` and reports pixels that
//! stand out from their frame's background while the sensor high voltages
//! are off, plus an optional frame-differencing search on coarse blocks.

pub mod binned;
pub mod config;
pub mod detector;
pub mod error;
pub mod ring_buffer;
pub mod scan;

pub use binned::{BinnedDetector, BinnedHit};
pub use config::GcrConfig;
pub use detector::{DayReport, GcrInput, HotPixelDetector, ImageHits, SensorFrame};
pub use error::GcrError;
pub use ring_buffer::RingBuffer;
