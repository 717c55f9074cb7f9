//! Discovery of full-cadence products in a directory.

use std::path::{Path, PathBuf};

use tracis::{ImageRecord, Satellite};

use crate::error::GcrError;

/// Whether a file name is a full-cadence JSON product of the given
/// satellite and version, e.g.
/// `SW_OPER_EFIATISL1B_20230317T000000_20230317T235959_0102.json`.
pub fn is_full_cadence_product(name: &str, satellite: Satellite, version: &str) -> bool {
    let Some(stem) = name.strip_suffix(".json") else {
        return false;
    };
    stem.is_ascii()
        && stem.len() == 51 + version.len()
        && stem.starts_with("SW_OPER_EFI")
        && stem[11..].starts_with(satellite.letter())
        && stem[12..].starts_with("TISL1B")
        && stem[50..].strip_prefix('_') == Some(version)
}

/// Matching products in `directory`, sorted by name and therefore by date.
pub fn find_products(
    directory: &Path,
    satellite: Satellite,
    version: &str,
) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if entry.file_type()?.is_file() && is_full_cadence_product(name, satellite, version) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read the image records of one full-cadence product.
pub fn load_records(path: &Path) -> Result<Vec<ImageRecord>, GcrError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NAME: &str = "SW_OPER_EFIATISL1B_20230317T000000_20230317T235959_0102.json";

    #[test]
    fn test_product_name_match() {
        assert!(is_full_cadence_product(NAME, Satellite::A, "0102"));
        assert!(!is_full_cadence_product(NAME, Satellite::B, "0102"));
        assert!(!is_full_cadence_product(NAME, Satellite::A, "0101"));
        assert!(!is_full_cadence_product(
            &NAME.replace("TISL1B", "TISH1B"),
            Satellite::A,
            "0102"
        ));
        assert!(!is_full_cadence_product(
            &NAME.replace(".json", ".cdf"),
            Satellite::A,
            "0102"
        ));
        assert!(!is_full_cadence_product("short.json", Satellite::A, "0102"));
    }

    #[test]
    fn test_find_products_sorted() {
        let dir = tempdir().unwrap();
        let later = NAME.replace("20230317", "20230318");
        for name in [later.as_str(), NAME, "notes.txt"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }

        let found = find_products(dir.path(), Satellite::A, "0102").unwrap();
        assert_eq!(found, vec![dir.path().join(NAME), dir.path().join(&later)]);
        assert!(find_products(dir.path(), Satellite::C, "0102")
            .unwrap()
            .is_empty());
        assert!(load_records(&found[0]).unwrap().is_empty());
        assert!(matches!(
            load_records(&dir.path().join("notes.txt")),
            Ok(records) if records.is_empty()
        ));
        assert!(matches!(
            load_records(&dir.path().join("missing.json")),
            Err(GcrError::Io(_))
        ));
    }
}
