//! Filesystem utilities.
//!
//! Crash-tolerant write primitives shared by every JSON database in the
//! project, plus name validation for anything that becomes a path component.
//!
//! All JSON writes go through [`atomic_write_json_pretty`]; scene copies
//! (reference promotion) go through [`atomic_copy_file`]. A partial write must
//! never leave a half-written record in place of a good one.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Name Validation Utilities
// =============================================================================

/// Validates that an identifier component is safe to use in file paths.
///
/// Rejects empty strings, traversal sequences (`..`), path separators,
/// drive letter indicators and control characters.
pub fn validate_path_id_component(id: &str, label: &str) -> Result<(), String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(format!("{label} is empty or contains only whitespace"));
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err(format!(
            "Invalid {label}: contains path traversal characters"
        ));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(format!("Invalid {label}: contains control characters"));
    }
    Ok(())
}

fn scene_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex is valid"))
}

/// Normalizes a base scene name.
///
/// `|` is accepted and rewritten to `__`; after that only ASCII letters,
/// digits, `_` and `-` are allowed.
pub fn sanitize_scene_name(name: &str) -> CoreResult<String> {
    let text = name.trim().replace('|', "__");
    if text.is_empty() {
        return Err(CoreError::InvalidName("name is empty".to_string()));
    }
    if !scene_name_pattern().is_match(&text) {
        return Err(CoreError::InvalidName(format!(
            "'{name}' contains illegal characters (allowed: A-Z a-z 0-9 _ -)"
        )));
    }
    Ok(text)
}

// =============================================================================
// JSON Helpers
// =============================================================================

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Reads a JSON file, returning `None` if it does not exist.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> CoreResult<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

// =============================================================================
// Atomic Writes
// =============================================================================

/// Write bytes to `path` using an atomic replace pattern.
///
/// Implementation notes:
/// - Write to a sibling temporary file.
/// - Flush and sync the temp file.
/// - Swap into place by renaming.
/// - If the destination exists, it is first moved aside as a `.bak` file, then removed.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)?;
    Ok(())
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

/// Copy `src` over `dest` through a sibling temp file and rename.
///
/// Readers of `dest` see either the old file or the complete new one.
pub fn atomic_copy_file(src: &Path, dest: &Path) -> CoreResult<u64> {
    if !src.is_file() {
        return Err(CoreError::FileNotFound(src.display().to_string()));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(dest);
    let copied = match std::fs::copy(src, &tmp_path) {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(CoreError::IoError(e));
        }
    };
    File::open(&tmp_path)?.sync_all()?;

    atomic_replace(dest, &tmp_path)?;
    Ok(copied)
}

/// Byte-for-byte comparison of two files.
pub fn files_identical(a: &Path, b: &Path) -> CoreResult<bool> {
    let meta_a = std::fs::metadata(a)?;
    let meta_b = std::fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let n = reader_a.read(&mut buf_a)?;
        if n == 0 {
            return Ok(true);
        }
        reader_b.read_exact(&mut buf_b[..n])?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}

// =============================================================================
// Advisory Locking
// =============================================================================

/// Runs `op` while holding an advisory lock on `lock_path`.
///
/// Used for files shared between machines (user directory, preferences).
/// The lock file is created if missing and never deleted.
pub fn with_lock<T>(
    lock_path: &Path,
    exclusive: bool,
    op: impl FnOnce() -> CoreResult<T>,
) -> CoreResult<T> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;

    if exclusive {
        fs2::FileExt::lock_exclusive(&lock_file)?;
    } else {
        fs2::FileExt::lock_shared(&lock_file)?;
    }

    let result = op();

    if let Err(e) = fs2::FileExt::unlock(&lock_file) {
        tracing::warn!("Failed to unlock {}: {}", lock_path.display(), e);
    }

    result
}

/// Sibling lock file path: `<file>.lock`
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    lock.set_file_name(format!("{file_name}.lock"));
    lock
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "tmp".to_string());
    tmp.set_file_name(format!("{file_name}.tmp"));
    tmp
}

fn bak_path_for(path: &Path) -> PathBuf {
    let mut bak = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "bak".to_string());
    bak.set_file_name(format!("{file_name}.bak"));
    bak
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // Windows: rename-over-existing may fail depending on filesystem; use a backup swap.
    let bak = bak_path_for(dest);
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(CoreError::IoError(e))
        }
    }
}
