//! Reference promotion
//!
//! A base scene has at most one reference copy, always at
//! `<shotDir>/<name>_<category>_forReference.<ext>`. Promoting another version
//! overwrites that same file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::deletion::DeletionReport;
use super::manager::SceneManager;
use super::record::BaseSceneRecord;
use super::store::{load_record, read_record, save_record};
use crate::core::activity::ActivityAction;
use crate::core::fs::{atomic_copy_file, atomic_write_json_pretty, files_identical};
use crate::core::host::SceneHost;
use crate::core::paths::reference_file_name;
use crate::core::{CoreResult, ReferenceStatus, VersionNumber};

impl<H: SceneHost> SceneManager<H> {
    /// Copies `version` over the reference file and records it.
    ///
    /// The range is checked before anything is touched; an out-of-range
    /// version leaves the record and the reference file as they were.
    pub fn promote_reference(&self, json_file: &Path, version: VersionNumber) -> CoreResult<()> {
        let mut record = load_record(json_file)?;
        record.check_version(version)?;

        let reference = self.copy_to_reference(&mut record, version)?;
        save_record(json_file, &record)?;

        let user = self.config.user.clone();
        self.record_activity(ActivityAction::Promote, &user, &reference);
        info!("Promoted {} version {} to reference", record.name, version);
        Ok(())
    }

    /// Checks the reference copy of a base scene.
    ///
    /// `deep` additionally compares the bytes against the referenced version.
    pub fn check_reference(&self, json_file: &Path, deep: bool) -> CoreResult<ReferenceStatus> {
        let record = load_record(json_file)?;
        let (Some(reference), Some(version)) = (&record.reference_file, record.referenced_version)
        else {
            return Ok(ReferenceStatus::NoReference);
        };

        let reference_file = self.layout.resolve(reference);
        if !reference_file.is_file() {
            return Ok(ReferenceStatus::Missing);
        }
        if !deep {
            return Ok(ReferenceStatus::Valid);
        }

        let source = self.layout.resolve(&record.version(version)?.path);
        if !source.is_file() {
            warn!(
                "Referenced version {} of {} is missing: {}",
                version,
                record.name,
                source.display()
            );
            return Ok(ReferenceStatus::Mismatched);
        }

        if files_identical(&reference_file, &source)? {
            Ok(ReferenceStatus::Valid)
        } else {
            Ok(ReferenceStatus::Mismatched)
        }
    }

    /// Deletes the reference copy and clears the reference fields.
    ///
    /// A reference file that is already gone counts as deleted. Any other
    /// removal failure is reported and the record keeps pointing at the file.
    ///
    /// The record is not validated first, so a stale `ReferencedVersion` does
    /// not block the cleanup.
    pub fn delete_reference(&self, json_file: &Path) -> CoreResult<DeletionReport> {
        let mut record = read_record(json_file)?;
        let mut report = DeletionReport::default();
        if record.reference_file.is_none() && record.referenced_version.is_none() {
            return Ok(report);
        }
        let reference = record.reference_file.clone().unwrap_or_default();

        if !reference.is_empty() && !report.remove_file(&self.layout.resolve(&reference)) {
            return Ok(report);
        }

        record.clear_reference();
        atomic_write_json_pretty(json_file, &record)?;

        let user = self.config.user.clone();
        self.record_activity(ActivityAction::DeleteReference, &user, &reference);
        info!("Deleted reference of {}", record.name);
        Ok(report)
    }

    /// Absolute reference path of `record`; the extension follows `version_file`
    pub(super) fn reference_path(&self, record: &BaseSceneRecord, version_file: &Path) -> PathBuf {
        let stem = reference_file_name(&record.name, record.category);
        let file_name = match version_file.extension() {
            Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
            None => stem,
        };
        self.layout.resolve(&record.path).join(file_name)
    }

    /// Copies a version over the reference path and sets the reference
    /// fields on `record` (not saved). Returns the relative reference path.
    ///
    /// A previous reference under another extension is removed so only one
    /// reference file exists.
    pub(super) fn copy_to_reference(
        &self,
        record: &mut BaseSceneRecord,
        version: VersionNumber,
    ) -> CoreResult<String> {
        let source = self.layout.resolve(&record.version(version)?.path);
        let target = self.reference_path(record, &source);
        atomic_copy_file(&source, &target)?;

        if let Some(previous) = record.reference_file.as_deref().filter(|p| !p.is_empty()) {
            let previous = self.layout.resolve(previous);
            if previous != target {
                match std::fs::remove_file(&previous) {
                    Ok(()) => debug!("Removed old reference {}", previous.display()),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => warn!("Cannot remove old reference {}: {}", previous.display(), e),
                }
            }
        }

        let relative = self.relative(&target)?;
        record.set_reference(relative.clone(), version);
        Ok(relative)
    }
}
