//! Robust pixel statistics for outlier detection.
//!
//! Median, median absolute deviation, mean and sample standard deviation of a
//! single image. Conventions follow the statistics library used by the
//! historical ground processor so thresholds compare bit for bit:
//!
//! * even-length medians average the two middle elements
//! * the MAD is scaled by 1.482602218505602 (normal-consistent)
//! * mean and variance use running updates in sorted order
//! * the standard deviation divides by `n - 1`

use num_traits::Float;
use std::cmp::Ordering;
use thiserror::Error;

/// Scale factor turning a MAD into a normal-consistent sigma estimate.
pub const MAD_SCALE: f64 = 1.482602218505602;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("NaN value encountered at index {0}")]
    NaNEncountered(usize),
    #[error("No data provided (empty slice)")]
    NoData,
}

/// Sort values ascending, rejecting NaN.
fn sort_values<T: Float>(values: &mut [T]) -> Result<(), StatsError> {
    if let Some(index) = values.iter().position(|v| v.is_nan()) {
        return Err(StatsError::NaNEncountered(index));
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Ok(())
}

/// Median of data already sorted ascending.
///
/// # Returns
/// * `Ok(T)` - Middle element, or the mean of the two middle elements for even lengths
/// * `Err(StatsError::NoData)` - If the slice is empty
pub fn median_from_sorted<T: Float>(sorted: &[T]) -> Result<T, StatsError> {
    let n = sorted.len();
    if n == 0 {
        return Err(StatsError::NoData);
    }
    let mid = n / 2;
    if n % 2 == 0 {
        let two = T::one() + T::one();
        Ok((sorted[mid - 1] + sorted[mid]) / two)
    } else {
        Ok(sorted[mid])
    }
}

/// Median of arbitrarily ordered data. Sorts `values` in place.
pub fn median<T: Float>(values: &mut [T]) -> Result<T, StatsError> {
    sort_values(values)?;
    median_from_sorted(values)
}

/// Robust statistics of one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustStats {
    pub median: f64,
    /// Scaled median absolute deviation
    pub mad: f64,
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub count: usize,
}

impl RobustStats {
    /// Statistics of a pixel array with an upper plausibility cutoff.
    ///
    /// Pixels above `cutoff` are replaced by zero before any statistic is
    /// computed, so the sample size is always the full pixel count.
    ///
    /// # Arguments
    /// * `pixels` - Pixel values in any order
    /// * `cutoff` - Largest physically plausible value
    pub fn from_pixels<P, I>(pixels: I, cutoff: f64) -> Result<Self, StatsError>
    where
        P: Into<f64>,
        I: IntoIterator<Item = P>,
    {
        let values: Vec<f64> = pixels
            .into_iter()
            .map(|p| {
                let value = p.into();
                if value <= cutoff {
                    value
                } else {
                    0.0
                }
            })
            .collect();
        Self::from_values(values)
    }

    /// Statistics of raw values, no cutoff applied.
    pub fn from_values(mut values: Vec<f64>) -> Result<Self, StatsError> {
        sort_values(&mut values)?;
        let centre = median_from_sorted(&values)?;

        let mut deviations: Vec<f64> = values.iter().map(|v| (v - centre).abs()).collect();
        let mad = median(&mut deviations)? * MAD_SCALE;

        let mut mean = 0.0;
        for (i, &value) in values.iter().enumerate() {
            mean += (value - mean) / (i + 1) as f64;
        }

        let n = values.len();
        let std_dev = if n > 1 {
            let mut variance = 0.0;
            for (i, &value) in values.iter().enumerate() {
                let delta = value - mean;
                variance += (delta * delta - variance) / (i + 1) as f64;
            }
            (variance * n as f64 / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        Ok(Self {
            median: centre,
            mad,
            mean,
            std_dev,
            count: n,
        })
    }

    /// MAD without the normal-consistency scale factor.
    pub fn mad_unscaled(&self) -> f64 {
        self.mad / MAD_SCALE
    }

    /// `median + k * std_dev`, the hot pixel threshold.
    pub fn hot_pixel_threshold(&self, k: f64) -> f64 {
        self.median + k * self.std_dev
    }
}
