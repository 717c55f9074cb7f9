use ndarray::Array2;
use tempfile::tempdir;
use tracis::ephemeris::EphemerisSample;
use tracis::geometry::{IMAGE_COLS, IMAGE_ROWS};
use tracis::pipeline::{DayInputs, NoGainMaps};
use tracis::products::{ProductNames, SatelliteDay};
use tracis::records::SensorImage;
use tracis::{DayProcessor, EphemerisSeries, ImageAux, ImagePair, ProcessingConfig, Sensor};

use gcr_detector::scan::{find_products, load_records};
use gcr_detector::{BinnedDetector, GcrConfig, GcrInput, HotPixelDetector};

// 2023-03-17T00:00:00Z
const DAY_START: f64 = 1_679_011_200.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// High voltages off
fn ready_aux() -> ImageAux {
    ImageAux {
        bias_voltage: 0.5,
        mcp_voltage: -3.0,
        phosphor_voltage: 10.0,
        ..Default::default()
    }
}

fn noisy_background() -> Array2<u16> {
    Array2::from_shape_fn((IMAGE_ROWS, IMAGE_COLS), |(row, col)| {
        30 + ((row * 7 + col * 3) % 5) as u16
    })
}

fn ephemeris() -> EphemerisSeries {
    let samples = (0..12)
        .map(|i| {
            EphemerisSample::from_position_velocity(
                DAY_START - 60.0 + 60.0 * i as f64,
                [0.0, 6_871_000.0, 0.0],
                [7_500.0, 0.0, 0.0],
            )
        })
        .collect();
    EphemerisSeries::from_samples(samples).unwrap()
}

/// Write one day's product with a cosmic-ray hit in the second H image.
fn write_product(directory: &std::path::Path) {
    let day = SatelliteDay::parse("B20230317").unwrap();
    let mut hit = noisy_background();
    hit[[25, 12]] = 900;

    let frames = [noisy_background(), hit, noisy_background()];
    let inputs = DayInputs {
        image_pairs: frames
            .iter()
            .enumerate()
            .map(|(i, h)| ImagePair {
                time: DAY_START + 2.0 * i as f64,
                h: Some(SensorImage::new(h.clone(), ready_aux())),
                v: Some(SensorImage::new(noisy_background(), ready_aux())),
            })
            .collect(),
        column_sums: Vec::new(),
    };

    let config = ProcessingConfig::default();
    let names = ProductNames::new(&day, directory, &config.export_version);
    let mut processor = DayProcessor::new(day, config);
    processor
        .process(&inputs, &ephemeris(), &NoGainMaps)
        .unwrap()
        .save_to_files(&names)
        .unwrap();
}

#[test]
fn test_hits_found_in_written_product() {
    init_logging();
    let dir = tempdir().unwrap();
    write_product(dir.path());

    let products = find_products(dir.path(), tracis::Satellite::B, "0102").unwrap();
    assert_eq!(products.len(), 1);
    let records = load_records(&products[0]).unwrap();
    assert_eq!(records.len(), 3);

    let inputs: Vec<GcrInput> = records.iter().map(GcrInput::from).collect();
    let report = HotPixelDetector::default().process_day(&inputs).unwrap();

    assert_eq!(report.total(Sensor::H), 1);
    assert_eq!(report.total(Sensor::V), 0);
    assert_eq!(
        report.lines(),
        vec![
            "1679011202.0 H image 2: 1 hot pixels 0.0 N 90.0 E @ R=6871.00 km".to_string(),
            "Processed 20230317 1 H GCRs 0 V GCRs".to_string(),
        ]
    );
}

#[test]
fn test_binned_search_on_written_product() {
    init_logging();
    let dir = tempdir().unwrap();
    write_product(dir.path());

    let products = find_products(dir.path(), tracis::Satellite::B, "0102").unwrap();
    let records = load_records(&products[0]).unwrap();
    let inputs: Vec<GcrInput> = records.iter().map(GcrInput::from).collect();

    // A single 870-count excess is far below the block threshold
    let mut binned = BinnedDetector::new(&GcrConfig::default());
    assert!(binned.process_day(&inputs, Sensor::H).unwrap().is_empty());

    let mut config = GcrConfig::default();
    config.binned.threshold = 500;
    let mut binned = BinnedDetector::new(&config);
    let hits = binned.process_day(&inputs, Sensor::H).unwrap();
    // First frame against zeros flags every populated block; then only the hit
    let after_first: Vec<_> = hits.iter().filter(|hit| hit.index > 0).collect();
    assert_eq!(after_first.len(), 1);
    assert_eq!((after_first[0].row, after_first[0].col), (4, 3));
    assert_eq!(after_first[0].index, 1);
}
