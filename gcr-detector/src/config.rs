//! Detector thresholds.
//!
//! Defaults reproduce the operational monitor. A JSON file may override any
//! subset of the fields.

use serde::{Deserialize, Serialize};

/// Quiescent high-voltage state in which ions cannot reach the detector.
///
/// Any signal on the CCD in this state comes from penetrating radiation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyThresholds {
    pub bias_above: f32,
    pub mcp_above: f32,
    pub phosphor_below: f32,
}

impl Default for ReadyThresholds {
    fn default() -> Self {
        Self {
            bias_above: -1.0,
            mcp_above: -20.0,
            phosphor_below: 50.0,
        }
    }
}

impl ReadyThresholds {
    pub fn is_ready(&self, bias: f32, mcp: f32, phosphor: f32) -> bool {
        bias > self.bias_above && mcp > self.mcp_above && phosphor < self.phosphor_below
    }
}

/// Pixels eligible for a hit: rows `[min_row, max_row]` at any column, or
/// rows `[min_row_wide, max_row_wide]` from column `min_col` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitRegion {
    pub min_row: usize,
    pub max_row: usize,
    pub min_row_wide: usize,
    pub max_row_wide: usize,
    pub min_col: usize,
}

impl Default for HitRegion {
    fn default() -> Self {
        Self {
            min_row: 19,
            max_row: 46,
            min_row_wide: 4,
            max_row_wide: 61,
            min_col: 19,
        }
    }
}

impl HitRegion {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (row >= self.min_row && row <= self.max_row)
            || (col >= self.min_col && row >= self.min_row_wide && row <= self.max_row_wide)
    }
}

/// Block sums for the frame-difference search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinnedConfig {
    /// First summed row
    pub row_start: usize,
    /// One past the last summed row
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
    /// Rows per block
    pub block_rows: usize,
    /// Columns per block
    pub block_cols: usize,
    /// Smallest frame-to-frame block increase reported, counts
    pub threshold: i64,
}

impl Default for BinnedConfig {
    fn default() -> Self {
        Self {
            row_start: 6,
            row_end: 61,
            col_start: 4,
            col_end: 36,
            block_rows: 6,
            block_cols: 4,
            threshold: 5000,
        }
    }
}

impl BinnedConfig {
    /// Shape of the block grid, `(11, 10)` by default.
    pub fn grid_shape(&self) -> (usize, usize) {
        (
            self.row_end / self.block_rows.max(1) + 1,
            self.col_end / self.block_cols.max(1) + 1,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcrConfig {
    /// Hit threshold in standard deviations above the median
    pub sigmas: f64,
    /// Largest physically plausible pixel value, counts
    pub max_pixel_value: u16,
    pub ready: ReadyThresholds,
    pub region: HitRegion,
    pub binned: BinnedConfig,
}

impl Default for GcrConfig {
    fn default() -> Self {
        Self {
            sigmas: 5.0,
            max_pixel_value: 2000,
            ready: ReadyThresholds::default(),
            region: HitRegion::default(),
            binned: BinnedConfig::default(),
        }
    }
}

impl GcrConfig {
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
    fn test_ready_state() {
        let ready = ReadyThresholds::default();
        assert!(ready.is_ready(0.0, 0.0, 0.0));
        assert!(!ready.is_ready(-1.0, 0.0, 0.0));
        assert!(!ready.is_ready(0.0, -20.0, 0.0));
        assert!(!ready.is_ready(0.0, 0.0, 50.0));
        // Imaging configuration
        assert!(!ready.is_ready(-99.0, -2000.0, 4000.0));
    }

    #[test]
    fn test_hit_region() {
        let region = HitRegion::default();
        assert!(region.contains(19, 0));
        assert!(region.contains(46, 39));
        assert!(!region.contains(18, 0));
        assert!(!region.contains(47, 18));
        assert!(region.contains(4, 19));
        assert!(region.contains(61, 39));
        assert!(!region.contains(3, 30));
        assert!(!region.contains(62, 30));
        assert!(!region.contains(10, 18));
    }

    #[test]
    fn test_default_grid_shape() {
        assert_eq!(BinnedConfig::default().grid_shape(), (11, 10));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gcr.json");

        let config = GcrConfig {
            sigmas: 4.0,
            binned: BinnedConfig {
                threshold: 3000,
                ..Default::default()
            },
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        assert_eq!(GcrConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gcr.json");
        std::fs::write(&path, r#"{"region": {"min_col": 20}}"#).unwrap();

        let config = GcrConfig::load_from_file(&path).unwrap();
        assert_eq!(config.region.min_col, 20);
        assert_eq!(config.region.max_row, 46);
        assert_eq!(config.max_pixel_value, 2000);
    }
}
