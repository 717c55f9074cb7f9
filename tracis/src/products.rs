//! Satellite-day identification and product file names.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};

use crate::error::TracisError;
use crate::geometry::Satellite;

/// Seconds in one processing day.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// One satellite and UTC date, written `Xyyyymmdd` (e.g. `A20230317`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SatelliteDay {
    pub satellite: Satellite,
    pub date: NaiveDate,
}

impl SatelliteDay {
    pub fn new(satellite: Satellite, date: NaiveDate) -> Self {
        Self { satellite, date }
    }

    /// Parse `Xyyyymmdd`.
    pub fn parse(text: &str) -> Result<Self, TracisError> {
        let invalid = || TracisError::InvalidDate(text.to_string());
        if text.len() != 9 || !text.is_ascii() {
            return Err(invalid());
        }
        let letter = text.chars().next().ok_or_else(invalid)?;
        let satellite = Satellite::from_letter(letter)?;
        let date = NaiveDate::parse_from_str(&text[1..], "%Y%m%d").map_err(|_| invalid())?;
        Ok(Self { satellite, date })
    }

    /// `[start, end)` of the day in Unix seconds.
    pub fn bounds(&self) -> (f64, f64) {
        let start = self
            .date
            .and_hms_opt(0, 0, 0)
            .map_or(0, |midnight| midnight.and_utc().timestamp()) as f64;
        (start, start + SECONDS_PER_DAY)
    }

    /// Whether a Unix time falls within the day.
    pub fn contains(&self, time: f64) -> bool {
        let (start, end) = self.bounds();
        time >= start && time < end
    }

    /// The same satellite on the preceding day.
    pub fn previous(&self) -> Option<Self> {
        self.date
            .checked_sub_days(Days::new(1))
            .map(|date| Self::new(self.satellite, date))
    }

    /// `yyyymmdd`
    pub fn compact_date(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

/// Base names of the two daily products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductNames {
    /// Full-cadence imagery and spectra (TISL1B)
    pub full_cadence: PathBuf,
    /// 2 Hz column-sum spectra (TISH1B)
    pub column_sum: PathBuf,
}

impl ProductNames {
    pub fn new(day: &SatelliteDay, directory: &Path, version: &str) -> Self {
        let name = |code: &str| {
            let date = day.compact_date();
            directory.join(format!(
                "SW_OPER_EFI{}{}_{}T000000_{}T235959_{}",
                day.satellite, code, date, date, version
            ))
        };
        Self {
            full_cadence: name("TISL1B"),
            column_sum: name("TISH1B"),
        }
    }

    /// Path of a product with an extension appended to its base name.
    pub fn with_extension(base: &Path, extension: &str) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }

    /// Whether either product already exists with the given extension.
    pub fn any_exists(&self, extension: &str) -> bool {
        [&self.full_cadence, &self.column_sum]
            .iter()
            .any(|base| Self::with_extension(base, extension).exists())
    }
}
