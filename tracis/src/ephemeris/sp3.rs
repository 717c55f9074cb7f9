//! Reader for the SP3-style orbit text files supplying satellite positions.
//!
//! The header's first line carries the epoch count. Each epoch is a `*` line
//! (`* YYYY MM DD hh mm ss.ssssssss`) followed by a `P` line with the ITRF
//! position in km and a `V` line with the velocity in dm/s.

use chrono::NaiveDate;

use super::{EphemerisError, EphemerisSample, MINIMUM_VELOCITY_EPOCHS};

fn parse_failure(line: usize, reason: impl Into<String>) -> EphemerisError {
    EphemerisError::ParseFailure {
        line,
        reason: reason.into(),
    }
}

/// Epoch count from the first header line, e.g. `#dV2023  3 17  0  0  0.00000000    8640 ...`.
fn header_epochs(header: &str) -> Result<usize, EphemerisError> {
    header
        .get(7..)
        .and_then(|rest| rest.split_whitespace().nth(5))
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| parse_failure(1, "header does not carry an epoch count"))
}

fn epoch_time(line_number: usize, line: &str) -> Result<f64, EphemerisError> {
    let fields: Vec<&str> = line[1..].split_whitespace().collect();
    if fields.len() < 6 {
        return Err(parse_failure(line_number, "incomplete epoch line"));
    }
    let int = |i: usize| -> Result<u32, EphemerisError> {
        fields[i]
            .parse()
            .map_err(|_| parse_failure(line_number, format!("bad epoch field '{}'", fields[i])))
    };
    let year: i32 = fields[0]
        .parse()
        .map_err(|_| parse_failure(line_number, format!("bad year '{}'", fields[0])))?;
    let seconds: f64 = fields[5]
        .parse()
        .map_err(|_| parse_failure(line_number, format!("bad seconds '{}'", fields[5])))?;
    let whole = seconds.floor();
    let millis = ((seconds - whole) * 1000.0).floor() as u32;

    let (month, day, hour, minute) = (int(1)?, int(2)?, int(3)?, int(4)?);

    let timestamp = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, whole as u32, millis))
        .ok_or_else(|| parse_failure(line_number, "epoch is not a valid date"))?;
    Ok(timestamp.and_utc().timestamp_millis() as f64 / 1000.0)
}

fn vector(line_number: usize, line: &str, expected: char) -> Result<[f64; 3], EphemerisError> {
    if !line.starts_with(expected) {
        return Err(EphemerisError::MissingLine {
            line: line_number,
            expected,
        });
    }
    let mut values = line.get(4..).unwrap_or("").split_whitespace().map(str::parse::<f64>);
    let mut component = || -> Result<f64, EphemerisError> {
        values
            .next()
            .and_then(|v| v.ok())
            .ok_or_else(|| parse_failure(line_number, format!("bad '{expected}' record")))
    };
    Ok([component()?, component()?, component()?])
}

/// Parse an orbit file into ephemeris samples.
///
/// Positions are converted to metres and velocities to m/s before the NEC
/// projection.
///
/// # Returns
/// * `Ok(Vec<EphemerisSample>)` - One sample per epoch, in file order
/// * `Err(EphemerisError::TooFewEpochs)` - Header lists too few epochs
/// * `Err(EphemerisError::MissingLine)` - An epoch lacks its `P` or `V` record
/// * `Err(EphemerisError::EpochCountMismatch)` - Epochs read differ from the header
pub fn parse_sp3(text: &str) -> Result<Vec<EphemerisSample>, EphemerisError> {
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    let (_, header) = lines
        .next()
        .ok_or_else(|| parse_failure(1, "empty orbit file"))?;
    let epochs = header_epochs(header)?;
    if epochs < MINIMUM_VELOCITY_EPOCHS {
        return Err(EphemerisError::TooFewEpochs {
            epochs,
            required: MINIMUM_VELOCITY_EPOCHS,
        });
    }

    let mut samples = Vec::with_capacity(epochs);
    while let Some((number, line)) = lines.next() {
        if !line.starts_with('*') {
            continue;
        }
        let time = epoch_time(number, line)?;

        let (p_number, p_line) = lines.next().unwrap_or((number + 1, ""));
        let position_km = vector(p_number, p_line, 'P')?;
        let (v_number, v_line) = lines.next().unwrap_or((p_number + 1, ""));
        let velocity_dms = vector(v_number, v_line, 'V')?;

        samples.push(EphemerisSample::from_position_velocity(
            time,
            position_km.map(|km| km * 1000.0),
            velocity_dms.map(|dms| dms / 10.0),
        ));
    }

    if samples.len() != epochs {
        return Err(EphemerisError::EpochCountMismatch {
            expected: epochs,
            found: samples.len(),
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn orbit_text(epochs: usize, listed: usize) -> String {
        let mut text = format!(
            "#cV2023  3 17  0  0  0.00000000 {listed:>7} ORBIT IGS14 FIT  ESA\n\
             ## 2254 432000.00000000    10.00000000 60020 0.0000000000000\n\
             /* header comment\n"
        );
        for i in 0..epochs {
            let seconds = 10.0 * i as f64;
            text.push_str(&format!(
                "*  2023  3 17  0 {:2} {:11.8}\n",
                (seconds / 60.0).floor() as u32,
                seconds % 60.0
            ));
            text.push_str(&format!(
                "PL47   6871.000000 {:13.6}      0.000000 999999.999999\n",
                i as f64
            ));
            text.push_str("VL47      0.000000  75000.000000      0.000000 999999.999999\n");
        }
        text.push_str("EOF\n");
        text
    }

    #[test]
    fn test_parse_orbit_file() {
        let samples = parse_sp3(&orbit_text(12, 12)).unwrap();
        assert_eq!(samples.len(), 12);

        // 2023-03-17T00:00:00Z
        assert_relative_eq!(samples[0].time, 1_679_011_200.0);
        assert_relative_eq!(samples[7].time, 1_679_011_270.0);

        assert_relative_eq!(samples[3].x, 6_871_000.0);
        assert_relative_eq!(samples[3].y, 3_000.0);
        assert_relative_eq!(samples[0].radius, 6_871_000.0);
        // 75000 dm/s eastward at the equator
        assert_relative_eq!(samples[0].ve, 7_500.0, epsilon = 1e-9);
        assert_relative_eq!(samples[0].vn, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_few_epochs() {
        assert_eq!(
            parse_sp3(&orbit_text(9, 9)),
            Err(EphemerisError::TooFewEpochs {
                epochs: 9,
                required: MINIMUM_VELOCITY_EPOCHS
            })
        );
    }

    #[test]
    fn test_epoch_count_mismatch() {
        assert_eq!(
            parse_sp3(&orbit_text(11, 12)),
            Err(EphemerisError::EpochCountMismatch {
                expected: 12,
                found: 11
            })
        );
    }

    #[test]
    fn test_missing_velocity_line() {
        let text = orbit_text(10, 10).replacen("VL47", "XL47", 1);
        assert!(matches!(
            parse_sp3(&text),
            Err(EphemerisError::MissingLine { expected: 'V', .. })
        ));
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            parse_sp3("#c\n"),
            Err(EphemerisError::ParseFailure { line: 1, .. })
        ));
    }
}
