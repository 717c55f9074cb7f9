//! Message prefix identifying the satellite-day being processed.

use std::fmt;

use chrono::NaiveDate;

use crate::geometry::Satellite;

/// Prefix for log lines of one processing run, e.g. `TRACIS A0102 2023-03-17: `.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    satellite: Satellite,
    date: NaiveDate,
    version: String,
}

impl LogContext {
    pub fn new(satellite: Satellite, date: NaiveDate, version: impl Into<String>) -> Self {
        Self {
            satellite,
            date,
            version: version.into(),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TRACIS {}{} {}: ",
            self.satellite,
            self.version,
            self.date.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_format() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 7).unwrap();
        let context = LogContext::new(Satellite::B, date, "0102");
        assert_eq!(context.to_string(), "TRACIS B0102 2023-03-07: ");
        assert_eq!(format!("{context}No images"), "TRACIS B0102 2023-03-07: No images");
    }
}
