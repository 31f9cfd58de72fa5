//! Best-effort deletion
//!
//! Each file is removed independently. A failure is logged and collected in
//! the [`DeletionReport`]; it never stops the remaining steps.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::manager::SceneManager;
use super::store::read_record;
use crate::core::activity::ActivityAction;
use crate::core::host::SceneHost;
use crate::core::CoreResult;

/// One path that could not be removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a best-effort deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<DeletionFailure>,
}

impl DeletionReport {
    /// True when nothing failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Removes a file. A file that does not exist counts as removed.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        match std::fs::remove_file(path) {
            Ok(()) => {
                self.removed.push(path.to_path_buf());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Already gone: {}", path.display());
                true
            }
            Err(e) => {
                self.fail(path, e);
                false
            }
        }
    }

    /// Removes an empty directory
    pub fn remove_empty_dir(&mut self, path: &Path) -> bool {
        match std::fs::remove_dir(path) {
            Ok(()) => {
                self.removed.push(path.to_path_buf());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                self.fail(path, e);
                false
            }
        }
    }

    fn fail(&mut self, path: &Path, error: std::io::Error) {
        warn!("Cannot delete {}: {}", path.display(), error);
        self.failures.push(DeletionFailure {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }
}

impl<H: SceneHost> SceneManager<H> {
    /// Deletes every version file, thumbnail, the reference copy, the shot
    /// directory (if it ended up empty) and finally the record.
    ///
    /// Preview clips are kept. The record is not validated first; entries
    /// with empty paths are skipped.
    pub fn delete_base_scene(&self, json_file: &Path) -> CoreResult<DeletionReport> {
        let record = read_record(json_file)?;
        let mut report = DeletionReport::default();

        for version in &record.versions {
            if !version.path.is_empty() {
                report.remove_file(&self.layout.resolve(&version.path));
            }
            if let Some(thumb) = &version.thumbnail {
                report.remove_file(&self.layout.resolve(thumb));
            }
        }
        if let Some(reference) = record.reference_file.as_deref().filter(|r| !r.is_empty()) {
            report.remove_file(&self.layout.resolve(reference));
        }
        if record.path.trim().is_empty() {
            debug!("{} has no shot directory", json_file.display());
        } else {
            report.remove_empty_dir(&self.layout.resolve(&record.path));
        }
        report.remove_file(json_file);

        let user = self.config.user.clone();
        self.record_activity(ActivityAction::Delete, &user, &record.path);
        if report.is_complete() {
            info!("Deleted base scene {}", record.name);
        } else {
            warn!(
                "Deleted base scene {} with {} failure(s)",
                record.name,
                report.failures.len()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::FileSceneHost;
    use crate::core::paths::SoftwarePaths;
    use crate::core::settings::ManagerConfig;
    use crate::core::{Category, CoreError};
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> SceneManager<FileSceneHost> {
        let project = dir.path().join("show");
        std::fs::create_dir_all(&project).unwrap();
        let work = dir.path().join("work.mb");
        std::fs::write(&work, b"data").unwrap();
        SceneManager::open(
            ManagerConfig::new(&project, SoftwarePaths::maya()),
            FileSceneHost::with_scene(work, "mb"),
        )
        .unwrap()
    }

    #[test]
    fn test_delete_base_scene_removes_everything() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let v1 = m
            .create_base_scene(Category::Model, "Generic", "Prop", 0, true, "")
            .unwrap();
        let v2 = m.save_version("Generic", false, "").unwrap();
        let json = m.find_base_scene(Category::Model, 0, "Prop").unwrap();
        let shot_dir = v1.parent().unwrap().to_path_buf();

        let report = m.delete_base_scene(&json).unwrap();
        assert!(report.is_complete(), "{:?}", report.failures);
        assert!(!v1.exists());
        assert!(!v2.exists());
        assert!(!shot_dir.exists());
        assert!(!json.exists());
        assert!(report.removed.contains(&json));

        assert!(matches!(
            m.delete_base_scene(&json),
            Err(CoreError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_delete_continues_past_failures() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let v1 = m
            .create_base_scene(Category::Rig, "Generic", "Hero", 0, false, "")
            .unwrap();
        m.save_version("Generic", false, "").unwrap();
        let json = m.find_base_scene(Category::Rig, 0, "Hero").unwrap();

        // A stray file keeps the shot directory, a missing version is skipped
        std::fs::remove_file(&v1).unwrap();
        let shot_dir = v1.parent().unwrap().to_path_buf();
        std::fs::write(shot_dir.join("notes.txt"), b"keep").unwrap();

        let report = m.delete_base_scene(&json).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, shot_dir);
        assert!(shot_dir.join("notes.txt").exists());
        assert!(!json.exists());
    }

    #[test]
    fn test_delete_record_that_fails_validation() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let v1 = m
            .create_base_scene(Category::Model, "Generic", "Prop", 0, false, "")
            .unwrap();
        let json = m.find_base_scene(Category::Model, 0, "Prop").unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&json).unwrap()).unwrap();
        raw["ReferenceFile"] = "scenes/Model/Prop/Prop_Model_forReference.mb".into();
        raw["ReferencedVersion"] = 5.into();
        std::fs::write(&json, serde_json::to_vec_pretty(&raw).unwrap()).unwrap();
        assert!(matches!(
            crate::core::ledger::load_record(&json),
            Err(CoreError::RecordCorrupted(_))
        ));

        let report = m.delete_base_scene(&json).unwrap();
        assert!(report.is_complete(), "{:?}", report.failures);
        assert!(!v1.exists());
        assert!(!v1.parent().unwrap().exists());
        assert!(!json.exists());
    }

    #[test]
    fn test_report_serializes() {
        let mut report = DeletionReport::default();
        report.failures.push(DeletionFailure {
            path: PathBuf::from("a"),
            error: "denied".to_string(),
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["error"], "denied");
        assert!(!report.is_complete());
    }
}
