//! End-to-end Ledger Scenarios
//!
//! Drives the scene manager through full workflows with a recording host and
//! checks the ledger invariants on disk after every step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::core::host::SceneHost;
use crate::core::ledger::{load_record, save_record, BaseSceneRecord, SceneManager};
use crate::core::paths::SoftwarePaths;
use crate::core::settings::ManagerConfig;
use crate::core::{Category, CoreError, CoreResult, ReferenceStatus, TimelineRanges};

/// Host that writes distinct bytes on every save and remembers every call
#[derive(Default)]
struct RecordingHost {
    current: Option<PathBuf>,
    saves: Vec<PathBuf>,
    opens: Vec<(PathBuf, bool)>,
}

impl SceneHost for RecordingHost {
    fn software(&self) -> String {
        "Recorder 1.0".to_string()
    }

    fn scene_extension(&self) -> String {
        "mb".to_string()
    }

    fn current_scene_path(&self) -> Option<PathBuf> {
        self.current.clone()
    }

    fn save_current(&mut self, path: &Path) -> CoreResult<()> {
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(path, format!("scene state {}", self.saves.len() + 1))?;
        self.saves.push(path.to_path_buf());
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn open(&mut self, path: &Path, force: bool) -> CoreResult<()> {
        if !path.is_file() {
            return Err(CoreError::FileNotFound(path.display().to_string()));
        }
        self.opens.push((path.to_path_buf(), force));
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn timeline_ranges(&self) -> TimelineRanges {
        TimelineRanges::new(1001, 1001, 1100, 1100)
    }

    fn create_thumbnail(&mut self, target: &Path) -> CoreResult<bool> {
        std::fs::create_dir_all(target.parent().unwrap())?;
        std::fs::write(target, b"jpg")?;
        Ok(true)
    }

    fn create_preview(&mut self, preview_dir: &Path, camera: &str) -> CoreResult<Option<PathBuf>> {
        let clip = preview_dir.join(format!("{camera}.avi"));
        std::fs::write(&clip, b"avi")?;
        Ok(Some(clip))
    }
}

fn open_manager(dir: &TempDir) -> SceneManager<RecordingHost> {
    let project = dir.path().join("show");
    std::fs::create_dir_all(&project).unwrap();
    let config = ManagerConfig::new(&project, SoftwarePaths::maya()).with_workstation("ws01");
    SceneManager::open(config, RecordingHost::default()).unwrap()
}

/// Every file under `root` with its contents
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let bytes = std::fs::read(e.path()).unwrap();
            (e.into_path(), bytes)
        })
        .collect()
}

fn record_of(m: &SceneManager<RecordingHost>, name: &str) -> (PathBuf, BaseSceneRecord) {
    let json = m.find_base_scene(Category::Model, 0, name).unwrap();
    let record = load_record(&json).unwrap();
    (json, record)
}

#[test]
fn test_scenario_shot01_with_reference_and_two_saves() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);

    m.create_base_scene(Category::Model, "Generic", "Shot01", 0, true, "initial")
        .unwrap();
    let (json, record) = record_of(&m, "Shot01");
    assert_eq!(
        json,
        m.layout().database_dir.join("Model").join("Shot01.json")
    );
    assert_eq!(record.versions.len(), 1);
    assert_eq!(record.referenced_version, Some(1));
    let reference = m
        .layout()
        .project_dir
        .join("scenes/Model/Shot01/Shot01_Model_forReference.mb");
    assert_eq!(
        record.reference_file.as_deref(),
        Some("scenes/Model/Shot01/Shot01_Model_forReference.mb")
    );
    assert!(reference.is_file());

    m.save_version("Generic", false, "second").unwrap();
    m.save_version("Generic", false, "third").unwrap();

    let (_, record) = record_of(&m, "Shot01");
    assert_eq!(record.versions.len(), 3);
    for (i, suffix) in ["_v001.mb", "_v002.mb", "_v003.mb"].iter().enumerate() {
        assert!(
            record.versions[i].path.ends_with(suffix),
            "{}",
            record.versions[i].path
        );
    }
    assert_eq!(record.referenced_version, Some(1));
    assert_eq!(m.host().saves.len(), 3);
}

#[test]
fn test_version_count_matches_saves() {
    for n in 1..=5usize {
        let dir = TempDir::new().unwrap();
        let mut m = open_manager(&dir);
        m.create_base_scene(Category::Model, "Generic", "Prop", 0, false, "")
            .unwrap();
        for _ in 1..n {
            m.save_version("Generic", false, "").unwrap();
        }

        let (_, record) = record_of(&m, "Prop");
        assert_eq!(record.versions.len(), n);
        assert!(record.versions[n - 1]
            .path
            .ends_with(&format!("_v{:03}.mb", n)));
        for version in &record.versions {
            assert!(m.layout().resolve(&version.path).is_file());
        }
    }
}

#[test]
fn test_promote_makes_byte_identical_reference() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, false, "")
        .unwrap();
    m.save_version("Generic", false, "").unwrap();
    m.save_version("Generic", false, "").unwrap();
    let (json, _) = record_of(&m, "Prop");

    for v in 1..=3 {
        m.promote_reference(&json, v).unwrap();
        let record = load_record(&json).unwrap();
        assert_eq!(record.referenced_version, Some(v));

        let reference = std::fs::read(m.layout().resolve(record.reference_file.as_deref().unwrap()))
            .unwrap();
        let source = std::fs::read(m.layout().resolve(&record.versions[v - 1].path)).unwrap();
        assert_eq!(reference, source);
        assert_eq!(
            m.check_reference(&json, true).unwrap(),
            ReferenceStatus::Valid
        );
    }
}

#[test]
fn test_promote_out_of_range_leaves_record_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, false, "")
        .unwrap();
    m.save_version("Generic", false, "").unwrap();
    let (json, before) = record_of(&m, "Prop");

    for bad in [0, before.versions.len() + 1] {
        let err = m.promote_reference(&json, bad).unwrap_err();
        assert!(matches!(err, CoreError::VersionOutOfRange { .. }));
    }
    assert_eq!(load_record(&json).unwrap(), before);
    assert!(!m
        .layout()
        .project_dir
        .join("scenes/Model/Prop/Prop_Model_forReference.mb")
        .exists());
}

#[test]
fn test_name_conflict_performs_no_writes() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Shot01", 0, true, "")
        .unwrap();

    let before = snapshot(dir.path());
    let saves_before = m.host().saves.len();
    for name in ["Shot01", "shot01", "SHOT01"] {
        assert!(matches!(
            m.create_base_scene(Category::Model, "Generic", name, 0, false, ""),
            Err(CoreError::NameConflict(_))
        ));
    }
    assert_eq!(snapshot(dir.path()), before);
    assert_eq!(m.host().saves.len(), saves_before);

    // Same name in another category is a different scope
    m.create_base_scene(Category::Rig, "Generic", "shot01", 0, false, "")
        .unwrap();
}

#[test]
fn test_record_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, true, "first")
        .unwrap();
    m.save_version("Generic", false, "second").unwrap();
    let (json, _) = record_of(&m, "Prop");
    m.capture_preview(&json, 2, "persp").unwrap();
    let record = load_record(&json).unwrap();

    let text = serde_json::to_string_pretty(&record).unwrap();
    let back: BaseSceneRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(back, record);

    let copy = dir.path().join("copy.json");
    save_record(&copy, &record).unwrap();
    assert_eq!(load_record(&copy).unwrap(), record);
}

#[test]
fn test_shallow_check_reference() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, true, "")
        .unwrap();
    let (json, record) = record_of(&m, "Prop");
    assert_eq!(
        m.check_reference(&json, false).unwrap(),
        ReferenceStatus::Valid
    );

    std::fs::remove_file(m.layout().resolve(record.reference_file.as_deref().unwrap())).unwrap();
    assert_eq!(
        m.check_reference(&json, false).unwrap(),
        ReferenceStatus::Missing
    );
}

#[test]
fn test_save_with_reference_tracks_latest() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, true, "")
        .unwrap();
    m.save_version("Generic", true, "").unwrap();

    let (json, record) = record_of(&m, "Prop");
    assert_eq!(record.referenced_version, Some(2));
    assert_eq!(
        m.check_reference(&json, true).unwrap(),
        ReferenceStatus::Valid
    );
}

#[test]
fn test_host_metadata_is_recorded() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, false, "")
        .unwrap();
    let (json, record) = record_of(&m, "Prop");

    let version = &record.versions[0];
    assert_eq!(version.ranges.0, [1001, 1001, 1100, 1100]);
    assert_eq!(
        version.thumbnail.as_deref(),
        Some("smDatabase/mayaDB/Model/Prop_v001_thumb.jpg")
    );
    assert_eq!(record.software.as_deref(), Some("Recorder 1.0"));

    let preview = m.capture_preview(&json, 1, "persp").unwrap();
    assert_eq!(preview.as_deref(), Some("Playblasts/Model/Prop/persp.avi"));

    let version = m.load_version(&json, 1, false).unwrap();
    assert_eq!(m.host().opens, vec![(version, false)]);
}

#[test]
fn test_delete_then_recreate() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, true, "")
        .unwrap();
    let (json, _) = record_of(&m, "Prop");

    let report = m.delete_base_scene(&json).unwrap();
    assert!(report.is_complete(), "{:?}", report.failures);
    assert!(m.scan_base_scenes(Category::Model, 0).unwrap().is_empty());

    m.create_base_scene(Category::Model, "Generic", "Prop", 0, false, "")
        .unwrap();
    let (_, record) = record_of(&m, "Prop");
    assert_eq!(record.versions.len(), 1);
    assert!(!record.has_reference());
}

#[test]
fn test_atomic_writes_leave_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let mut m = open_manager(&dir);
    m.create_base_scene(Category::Model, "Generic", "Prop", 0, true, "")
        .unwrap();
    m.save_version("Generic", true, "").unwrap();
    let (json, _) = record_of(&m, "Prop");
    m.promote_reference(&json, 1).unwrap();

    for path in snapshot(dir.path()).keys() {
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(
            !name.ends_with(".tmp") && !name.ends_with(".bak"),
            "leftover {}",
            path.display()
        );
    }
}
