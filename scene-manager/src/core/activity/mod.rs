//! Activity Log Module
//!
//! Append-only JSONL journal of who saved, loaded, promoted or deleted which
//! scene file. One file per host database (`<databaseDir>/activity.jsonl`).
//! The ledger records stay the source of truth; this log is informational and
//! tolerant of corrupt lines.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CoreResult, EntryId};

/// Activity log file name inside the host database directory
pub const ACTIVITY_FILE: &str = "activity.jsonl";

// =============================================================================
// Entry Types
// =============================================================================

/// What happened
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Save,
    Load,
    Promote,
    DeleteReference,
    Delete,
}

/// One journal line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// Unique entry ID (ULID)
    pub id: EntryId,
    pub action: ActivityAction,
    /// ISO 8601 timestamp
    pub timestamp: String,
    pub user: String,
    pub workstation: String,
    /// Project-relative path the action touched
    pub path: String,
}

impl ActivityEntry {
    /// Creates an entry with generated ULID and current timestamp
    pub fn new(action: ActivityAction, user: &str, workstation: &str, path: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            action,
            timestamp: Utc::now().to_rfc3339(),
            user: user.to_string(),
            workstation: workstation.to_string(),
            path: path.to_string(),
        }
    }

    /// Parses timestamp as DateTime
    pub fn timestamp_as_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// =============================================================================
// Activity Log
// =============================================================================

/// Result of reading the journal
#[derive(Debug, Default)]
pub struct ActivityReadResult {
    pub entries: Vec<ActivityEntry>,
    /// Lines that failed to parse (line number, error message)
    pub errors: Vec<(usize, String)>,
}

/// Append-only activity journal backed by a JSONL file
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a single entry
    pub fn append(&self, entry: &ActivityEntry) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(entry)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// Reads every entry, collecting unparsable lines instead of failing
    pub fn read_all(&self) -> CoreResult<ActivityReadResult> {
        if !self.path.exists() {
            return Ok(ActivityReadResult::default());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut result = ActivityReadResult::default();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line_number = line_num + 1;
            match line_result {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ActivityEntry>(trimmed) {
                        Ok(entry) => result.entries.push(entry),
                        Err(e) => result
                            .errors
                            .push((line_number, format!("JSON parse error: {}", e))),
                    }
                }
                Err(e) => result.errors.push((line_number, format!("IO error: {}", e))),
            }
        }

        Ok(result)
    }

    /// Last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> CoreResult<Vec<ActivityEntry>> {
        let entries = self.read_all()?.entries;
        let start = entries.len().saturating_sub(count);
        Ok(entries.into_iter().skip(start).collect())
    }
}
