//! Record storage
//!
//! Loading, saving and scanning of base scene JSON files. Every call goes to
//! disk; nothing is cached between operations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::record::BaseSceneRecord;
use crate::core::fs::{atomic_write_json_pretty, read_json};
use crate::core::paths::{CATEGORIES_FILE, SUBPROJECTS_FILE};
use crate::core::{CoreError, CoreResult};

/// Loads and validates a record
pub fn load_record(json_file: &Path) -> CoreResult<BaseSceneRecord> {
    let record = read_record(json_file)?;
    record.validate()?;
    Ok(record)
}

/// Parses a record without checking its invariants.
///
/// Deletion goes through here so a broken record can still be removed.
pub fn read_record(json_file: &Path) -> CoreResult<BaseSceneRecord> {
    if !json_file.is_file() {
        return Err(CoreError::RecordNotFound(json_file.display().to_string()));
    }
    read_json(json_file).map_err(|e| match e {
        CoreError::JsonError(e) => {
            CoreError::RecordCorrupted(format!("{}: {}", json_file.display(), e))
        }
        other => other,
    })
}

/// Validates and writes a record atomically
pub fn save_record(json_file: &Path, record: &BaseSceneRecord) -> CoreResult<()> {
    record.validate()?;
    atomic_write_json_pretty(json_file, record)?;
    debug!("Wrote record {}", json_file.display());
    Ok(())
}

/// Base scene JSON files directly inside `scope_dir`, keyed by file stem.
///
/// A missing directory yields an empty map.
pub fn scan_records(scope_dir: &Path) -> CoreResult<BTreeMap<String, PathBuf>> {
    let mut found = BTreeMap::new();
    if !scope_dir.is_dir() {
        return Ok(found);
    }

    for entry in WalkDir::new(scope_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry during record scan");
                continue;
            }
        };
        if let Some(stem) = record_stem(entry.path()) {
            found.insert(stem, entry.path().to_path_buf());
        }
    }

    Ok(found)
}

/// Every base scene JSON file under a host database directory
pub fn scan_all_records(database_dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(database_dir)
        .min_depth(2)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| record_stem(entry.path()).is_some())
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Whether a record in `scope_dir` already uses `name` (case-insensitive).
///
/// Compares the `Name` stored in each record. Unreadable siblings are matched
/// on their file stem.
pub fn name_taken(scope_dir: &Path, name: &str) -> CoreResult<Option<String>> {
    for (stem, path) in scan_records(scope_dir)? {
        let existing = match read_json::<BaseSceneRecord>(&path) {
            Ok(record) => record.name,
            Err(e) => {
                warn!("Cannot read {} while checking names: {}", path.display(), e);
                stem
            }
        };
        if existing.eq_ignore_ascii_case(name) {
            return Ok(Some(existing));
        }
    }
    Ok(None)
}

fn record_stem(path: &Path) -> Option<String> {
    if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let file_name = path.file_name()?.to_str()?;
    if file_name == SUBPROJECTS_FILE || file_name == CATEGORIES_FILE {
        return None;
    }
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::record::VersionRecord;
    use crate::core::{Category, TimelineRanges};
    use tempfile::TempDir;

    fn record(name: &str) -> BaseSceneRecord {
        let mut r = BaseSceneRecord::new(
            name,
            Category::Model,
            "gn",
            "ws",
            &format!("scenes/Model/{name}"),
            "None",
        );
        r.push_version(VersionRecord {
            path: format!("scenes/Model/{name}/{name}_Model_gn_v001.mb"),
            note: String::new(),
            user: "gn".to_string(),
            workstation: "ws".to_string(),
            previews: BTreeMap::new(),
            thumbnail: None,
            ranges: TimelineRanges::default(),
        });
        r
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Model").join("Shot01.json");
        let r = record("Shot01");

        save_record(&path, &r).unwrap();
        assert_eq!(load_record(&path).unwrap(), r);
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            load_record(&missing),
            Err(CoreError::RecordNotFound(_))
        ));

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "{\"Name\": ").unwrap();
        assert!(matches!(
            load_record(&corrupt),
            Err(CoreError::RecordCorrupted(_))
        ));
    }

    #[test]
    fn test_save_refuses_invalid_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let mut r = record("a");
        r.referenced_version = Some(1);
        assert!(save_record(&path, &r).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_scan_records_skips_non_records() {
        let dir = TempDir::new().unwrap();
        save_record(&dir.path().join("B.json"), &record("B")).unwrap();
        save_record(&dir.path().join("A.json"), &record("A")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join(SUBPROJECTS_FILE), "[]").unwrap();
        std::fs::create_dir(dir.path().join("Seq010")).unwrap();

        let found = scan_records(dir.path()).unwrap();
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(scan_records(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_scan_all_records() {
        let dir = TempDir::new().unwrap();
        save_record(&dir.path().join("Model").join("A.json"), &record("A")).unwrap();
        save_record(
            &dir.path().join("Rig").join("Seq010").join("B.json"),
            &record("B"),
        )
        .unwrap();
        std::fs::write(dir.path().join(CATEGORIES_FILE), "[]").unwrap();

        let all = scan_all_records(dir.path());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_name_taken_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        save_record(&dir.path().join("Shot01.json"), &record("Shot01")).unwrap();

        assert_eq!(
            name_taken(dir.path(), "SHOT01").unwrap(),
            Some("Shot01".to_string())
        );
        assert_eq!(name_taken(dir.path(), "Shot02").unwrap(), None);
    }
}
