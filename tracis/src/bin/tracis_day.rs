//! Process one satellite-day of TII imagery into calibrated products
//!
//! # Usage
//!
//! ```bash
//! # Process Swarm A on 2023-03-17
//! cargo run --release --bin tracis_day -- A20230317 \
//!     --inputs frames/A20230317.json \
//!     --orbit orbits/A20230317.sp3 \
//!     --previous-orbit orbits/A20230316.sp3 \
//!     --output-dir products/
//!
//! # With gain maps and a configuration override
//! cargo run --release --bin tracis_day -- B20230317 -i frames.json -o orbit.sp3 \
//!     --gain-maps gains.json --config tracis.json
//! ```
//!
//! Nothing is done when either product already exists in the output directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info, warn};
use serde::Deserialize;
use tracis::ephemeris::parse_sp3;
use tracis::geometry::Sensor;
use tracis::pipeline::{DayInputs, StaticGainMaps};
use tracis::products::{ProductNames, SatelliteDay};
use tracis::spectra::GainMap;
use tracis::{DayProcessor, EphemerisSeries, ProcessingConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Satellite letter and date, e.g. A20230317
    satellite_date: String,

    /// Decoded image pairs and column sums for the day (JSON)
    #[arg(short, long)]
    inputs: PathBuf,

    /// Orbit file for the day
    #[arg(short, long)]
    orbit: PathBuf,

    /// Orbit file for the preceding day, brackets records near midnight
    #[arg(long)]
    previous_orbit: Option<PathBuf>,

    /// Directory receiving the products
    #[arg(short = 'd', long, default_value = ".")]
    output_dir: PathBuf,

    /// Processing configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gain maps keyed by instrument and sensor (JSON)
    #[arg(short, long)]
    gain_maps: Option<PathBuf>,
}

#[derive(Deserialize)]
struct GainMapEntry {
    instrument_id: u8,
    sensor: Sensor,
    map: GainMap,
}

fn load_gain_maps(path: &Path) -> Result<StaticGainMaps, Box<dyn std::error::Error>> {
    let entries: Vec<GainMapEntry> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let mut maps = StaticGainMaps::new();
    for entry in entries {
        maps.insert(entry.instrument_id, entry.sensor, entry.map);
    }
    Ok(maps)
}

fn load_ephemeris(
    previous: Option<&Path>,
    current: &Path,
) -> Result<EphemerisSeries, Box<dyn std::error::Error>> {
    let mut series = EphemerisSeries::new();
    if let Some(path) = previous {
        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_sp3(&text).map_err(|e| e.to_string()))
        {
            Ok(samples) => series.append(samples)?,
            Err(e) => warn!("Skipping previous-day orbit {}: {}", path.display(), e),
        }
    }
    let samples = parse_sp3(&std::fs::read_to_string(current)?)?;
    let dropped = series.append_superseding(samples)?;
    if dropped > 0 {
        debug!("Dropped {dropped} previous-day samples overlapping the current orbit");
    }
    Ok(series)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let day = SatelliteDay::parse(&args.satellite_date)?;
    let config = match &args.config {
        Some(path) => ProcessingConfig::load_from_file(path)?,
        None => ProcessingConfig::default(),
    };

    let names = ProductNames::new(&day, &args.output_dir, &config.export_version);
    if names.any_exists("json") {
        info!(
            "Products for {} already exist in {}, nothing to do",
            args.satellite_date,
            args.output_dir.display()
        );
        return Ok(());
    }

    let mut processor = DayProcessor::new(day, config);
    let context = processor.context().clone();

    let ephemeris = load_ephemeris(args.previous_orbit.as_deref(), &args.orbit)?;
    info!("{}Loaded {} ephemeris samples", context, ephemeris.len());

    let inputs: DayInputs = serde_json::from_str(&std::fs::read_to_string(&args.inputs)?)?;
    let gains = match &args.gain_maps {
        Some(path) => load_gain_maps(path)?,
        None => StaticGainMaps::new(),
    };

    let products = processor.process(&inputs, &ephemeris, &gains)?;
    products.save_to_files(&names)?;
    info!(
        "{}Wrote {}",
        context,
        ProductNames::with_extension(&names.full_cadence, "json").display()
    );
    Ok(())
}
