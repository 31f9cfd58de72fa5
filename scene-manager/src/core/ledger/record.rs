//! Base scene records
//!
//! One JSON document per base scene. Keys are PascalCase so files written by
//! existing host tools stay readable.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{Category, CoreError, CoreResult, TimelineRanges, VersionNumber, NO_SUB_PROJECT};

/// Schema tag written into every record
pub const RECORD_SCHEMA_ID: &str = "SmV02_sceneFile";

/// Date format used in note stamps
const NOTE_DATE_FORMAT: &str = "%d/%m/%Y-%H:%M";

// =============================================================================
// Version Record
// =============================================================================

/// One saved iteration of a base scene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Project-relative scene file
    #[serde(rename = "RelativePath")]
    pub path: String,

    #[serde(rename = "Note", default)]
    pub note: String,

    /// Author initials
    #[serde(rename = "User")]
    pub user: String,

    #[serde(rename = "Workstation", default)]
    pub workstation: String,

    /// Camera/view name → project-relative preview clip
    #[serde(rename = "Preview", default)]
    pub previews: BTreeMap<String, String>,

    /// Project-relative still thumbnail
    #[serde(
        rename = "Thumb",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub thumbnail: Option<String>,

    #[serde(rename = "Ranges", default)]
    pub ranges: TimelineRanges,
}

impl VersionRecord {
    /// Appends a stamped note below the existing text
    pub fn append_note(&mut self, user: &str, text: &str, now: DateTime<Local>) {
        let stamped = stamp_note(user, text, now);
        self.note = if self.note.is_empty() {
            stamped
        } else {
            format!("{}\n{}", self.note, stamped)
        };
    }
}

/// `[<user>] on <dd/mm/YYYY-HH:MM>\n<text>\n`
pub fn stamp_note(user: &str, text: &str, now: DateTime<Local>) -> String {
    format!("[{}] on {}\n{}\n", user, now.format(NOTE_DATE_FORMAT), text)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// =============================================================================
// Base Scene Record
// =============================================================================

/// One logical shot or asset and its save history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseSceneRecord {
    #[serde(rename = "ID", default = "default_schema_id")]
    pub id: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Category")]
    pub category: Category,

    /// Initials of the user who created the base scene
    #[serde(rename = "Creator")]
    pub creator: String,

    /// Workstation the base scene was created on
    #[serde(rename = "CreatorHost", default)]
    pub creator_host: String,

    /// Project-relative shot directory
    #[serde(rename = "Path")]
    pub path: String,

    #[serde(rename = "SubProject", default = "default_sub_project")]
    pub sub_project: String,

    /// Host name and version that created the record
    #[serde(rename = "Software", default, skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,

    #[serde(rename = "Versions", default)]
    pub versions: Vec<VersionRecord>,

    #[serde(rename = "ReferenceFile", default)]
    pub reference_file: Option<String>,

    #[serde(rename = "ReferencedVersion", default)]
    pub referenced_version: Option<VersionNumber>,
}

fn default_schema_id() -> String {
    RECORD_SCHEMA_ID.to_string()
}

fn default_sub_project() -> String {
    NO_SUB_PROJECT.to_string()
}

impl BaseSceneRecord {
    /// Creates a record with no versions
    pub fn new(
        name: &str,
        category: Category,
        creator: &str,
        creator_host: &str,
        path: &str,
        sub_project: &str,
    ) -> Self {
        Self {
            id: default_schema_id(),
            name: name.to_string(),
            category,
            creator: creator.to_string(),
            creator_host: creator_host.to_string(),
            path: path.to_string(),
            sub_project: sub_project.to_string(),
            software: None,
            versions: Vec::new(),
            reference_file: None,
            referenced_version: None,
        }
    }

    pub fn with_software(mut self, software: &str) -> Self {
        self.software = Some(software.to_string());
        self
    }

    /// Number of the latest version, 0 for an empty record
    pub fn latest_version(&self) -> VersionNumber {
        self.versions.len()
    }

    /// Appends a version; returns its number
    pub fn push_version(&mut self, version: VersionRecord) -> VersionNumber {
        self.versions.push(version);
        self.versions.len()
    }

    /// Fails unless `1 <= version <= len(versions)`
    pub fn check_version(&self, version: VersionNumber) -> CoreResult<()> {
        if version == 0 || version > self.versions.len() {
            return Err(CoreError::VersionOutOfRange {
                requested: version,
                available: self.versions.len(),
            });
        }
        Ok(())
    }

    pub fn version(&self, version: VersionNumber) -> CoreResult<&VersionRecord> {
        self.check_version(version)?;
        Ok(&self.versions[version - 1])
    }

    pub fn version_mut(&mut self, version: VersionNumber) -> CoreResult<&mut VersionRecord> {
        self.check_version(version)?;
        Ok(&mut self.versions[version - 1])
    }

    pub fn has_reference(&self) -> bool {
        self.reference_file.is_some()
    }

    pub fn set_reference(&mut self, file: String, version: VersionNumber) {
        self.reference_file = Some(file);
        self.referenced_version = Some(version);
    }

    pub fn clear_reference(&mut self) {
        self.reference_file = None;
        self.referenced_version = None;
    }

    /// Checks structural invariants.
    ///
    /// Reference fields are both set or both unset, and the referenced
    /// version exists.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::RecordCorrupted("record has no name".to_string()));
        }
        if self.versions.is_empty() {
            return Err(CoreError::RecordCorrupted(format!(
                "{} has no versions",
                self.name
            )));
        }
        match (&self.reference_file, self.referenced_version) {
            (None, None) => Ok(()),
            (Some(_), Some(v)) if v >= 1 && v <= self.versions.len() => Ok(()),
            (Some(_), Some(v)) => Err(CoreError::RecordCorrupted(format!(
                "{} references version {} but has {} versions",
                self.name,
                v,
                self.versions.len()
            ))),
            _ => Err(CoreError::RecordCorrupted(format!(
                "{} has only one of ReferenceFile/ReferencedVersion set",
                self.name
            ))),
        }
    }
}
