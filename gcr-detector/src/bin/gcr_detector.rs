//! Report cosmic-ray and hot-pixel hits in ready-state TII frames
//!
//! Scans a directory of full-cadence products for one satellite and prints
//! time, sensor, hit count and location of every affected image, plus a
//! daily total.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin gcr_detector -- products/ A
//! cargo run --release --bin gcr_detector -- products/ B --product-version 0101 --binned
//! RUST_LOG=debug cargo run --release --bin gcr_detector -- products/ C -c gcr.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use gcr_detector::scan::{find_products, load_records};
use gcr_detector::{BinnedDetector, GcrConfig, GcrInput, HotPixelDetector};
use log::{info, warn};
use tracis::config::EXPORT_VERSION;
use tracis::{Satellite, Sensor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding full-cadence products
    directory: PathBuf,

    /// Satellite letter: A, B or C
    satellite: char,

    /// Product version
    #[arg(short = 'p', long = "product-version", default_value = EXPORT_VERSION)]
    product_version: String,

    /// Also search frame-to-frame block differences on the H sensor
    #[arg(short, long)]
    binned: bool,

    /// Detector configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let satellite = Satellite::from_letter(args.satellite)?;
    let config = match &args.config {
        Some(path) => GcrConfig::load_from_file(path)?,
        None => GcrConfig::default(),
    };

    let products = find_products(&args.directory, satellite, &args.product_version)?;
    if products.is_empty() {
        info!("Swarm {satellite}: no full-cadence products found");
        return Ok(());
    }
    info!("Found {} files", products.len());

    let detector = HotPixelDetector::new(config.clone());
    let mut binned = BinnedDetector::new(&config);
    let status_interval = (products.len() / 10).max(1);

    for (processed, path) in products.iter().enumerate() {
        let records = match load_records(path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let inputs: Vec<GcrInput> = records.iter().map(GcrInput::from).collect();

        let report = detector.process_day(&inputs)?;
        for line in report.lines() {
            println!("{line}");
        }
        if args.binned {
            for hit in binned.process_day(&inputs, Sensor::H)? {
                println!("{hit}");
            }
        }

        if (processed + 1) % status_interval == 0 {
            info!(
                "Processed {} files ({:.1}%)",
                processed + 1,
                (processed + 1) as f64 / products.len() as f64 * 100.0
            );
        }
    }
    Ok(())
}
