//! Processing configuration.
//!
//! Defaults reproduce the operational processor. A JSON file may override
//! any subset of the fields.

use serde::{Deserialize, Serialize};

use crate::ephemeris::MINIMUM_VELOCITY_EPOCHS;
use crate::records::ImagingModeThresholds;

/// Version tag embedded in product names and log prefixes.
pub const EXPORT_VERSION: &str = "0102";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Product version tag, e.g. "0102"
    pub export_version: String,
    /// Fewer ephemeris samples than this abort the day
    pub minimum_ephemeris_samples: usize,
    /// Voltage thresholds for the imaging-mode flag
    pub imaging_mode: ImagingModeThresholds,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            export_version: EXPORT_VERSION.to_string(),
            minimum_ephemeris_samples: MINIMUM_VELOCITY_EPOCHS,
            imaging_mode: ImagingModeThresholds::default(),
        }
    }
}

impl ProcessingConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ProcessingConfig::default();
        assert_eq!(config.export_version, "0102");
        assert_eq!(config.minimum_ephemeris_samples, 10);
        assert_eq!(config.imaging_mode.mcp_below, -1000.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracis.json");
        let config = ProcessingConfig {
            export_version: "0103".to_string(),
            minimum_ephemeris_samples: 20,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(ProcessingConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "minimum_ephemeris_samples": 4 }"#).unwrap();
        let config = ProcessingConfig::load_from_file(&path).unwrap();
        assert_eq!(config.minimum_ephemeris_samples, 4);
        assert_eq!(config.export_version, EXPORT_VERSION);
    }

    #[test]
    fn test_invalid_json_is_invalid_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ProcessingConfig::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
