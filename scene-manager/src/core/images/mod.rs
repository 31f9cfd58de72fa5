//! Image Sequence Listing
//!
//! Groups frame-numbered renders (`beauty.0001.exr`, `beauty.0002.exr`, ...)
//! into sequences. Files without a frame number are listed as single images.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::{CoreError, CoreResult};

/// Extension groups offered as filters; the key is the group name.
pub const IMAGE_FORMATS: &[(&str, &[&str])] = &[
    ("jpg", &["jpg", "jpeg"]),
    ("png", &["png"]),
    ("exr", &["exr"]),
    ("tif", &["tif", "tiff"]),
    ("tga", &["tga"]),
];

fn frame_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<head>.*?)(?P<frame>\d+)(?P<tail>\.[^.]+)$").expect("static regex is valid")
    })
}

// =============================================================================
// Query
// =============================================================================

/// What to list and how
#[derive(Clone, Debug)]
pub struct SequenceQuery {
    /// Descend into sub-folders
    pub recursive: bool,
    /// Format group names from [`IMAGE_FORMATS`]; empty lists nothing
    pub formats: Vec<String>,
    /// Case-insensitive substring the sequence name must contain
    pub name_filter: Option<String>,
}

impl Default for SequenceQuery {
    fn default() -> Self {
        Self {
            recursive: false,
            formats: IMAGE_FORMATS.iter().map(|(k, _)| k.to_string()).collect(),
            name_filter: None,
        }
    }
}

impl SequenceQuery {
    /// Fails with `ValidationError` for a format group that does not exist
    pub fn with_formats<S: AsRef<str>>(mut self, formats: &[S]) -> CoreResult<Self> {
        let mut groups = Vec::new();
        for format in formats {
            let format = format.as_ref().trim().trim_start_matches('.').to_lowercase();
            let group = IMAGE_FORMATS
                .iter()
                .find(|(key, exts)| *key == format || exts.contains(&format.as_str()))
                .ok_or_else(|| CoreError::ValidationError(format!("unknown image format: {format}")))?;
            if !groups.iter().any(|g| g == group.0) {
                groups.push(group.0.to_string());
            }
        }
        self.formats = groups;
        Ok(self)
    }

    fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        IMAGE_FORMATS
            .iter()
            .filter(|(key, _)| self.formats.iter().any(|f| f == key))
            .any(|(_, exts)| exts.contains(&extension.as_str()))
    }

    fn accepts_name(&self, name: &str) -> bool {
        match self.name_filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => {
                name.to_lowercase().contains(&filter.to_lowercase())
            }
            _ => true,
        }
    }
}

// =============================================================================
// Sequence
// =============================================================================

/// Frame-numbered files sharing a folder, head and tail
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSequence {
    pub directory: PathBuf,
    /// Everything before the frame number, e.g. `beauty.`
    pub head: String,
    /// Extension including the dot, e.g. `.exr`
    pub tail: String,
    /// Digits of the shortest frame number; 0 for a single unnumbered image
    pub padding: usize,
    /// Sorted frame numbers; empty for an unnumbered image
    pub frames: Vec<u64>,
    /// First file of the sequence
    pub first_file: PathBuf,
    pub modified: Option<DateTime<Local>>,
}

impl ImageSequence {
    pub fn start(&self) -> Option<u64> {
        self.frames.first().copied()
    }

    pub fn end(&self) -> Option<u64> {
        self.frames.last().copied()
    }

    /// Frames between start and end that have no file
    pub fn missing_frames(&self) -> Vec<u64> {
        let mut missing = Vec::new();
        for pair in self.frames.windows(2) {
            missing.extend(pair[0] + 1..pair[1]);
        }
        missing
    }

    /// `beauty.####.exr` style name
    pub fn pattern(&self) -> String {
        if self.frames.is_empty() {
            return format!("{}{}", self.head, self.tail);
        }
        format!("{}{}{}", self.head, "#".repeat(self.padding.max(1)), self.tail)
    }

    /// Contiguous frame runs, e.g. `1-5 7-10`
    pub fn range_label(&self) -> String {
        let mut runs: Vec<(u64, u64)> = Vec::new();
        for &frame in &self.frames {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == frame => *end = frame,
                _ => runs.push((frame, frame)),
            }
        }
        runs.iter()
            .map(|(a, b)| if a == b { a.to_string() } else { format!("{a}-{b}") })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// =============================================================================
// Listing
// =============================================================================

/// Lists the image sequences under `root`, sorted by folder then name
pub fn list_sequences(root: &Path, query: &SequenceQuery) -> CoreResult<Vec<ImageSequence>> {
    if !root.is_dir() {
        return Err(CoreError::FileNotFound(root.display().to_string()));
    }
    if query.formats.is_empty() {
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if !query.recursive {
        walker = walker.max_depth(1);
    }

    // (directory, head, tail) -> (frame digits, path)
    let mut groups: BTreeMap<(PathBuf, String, String), Vec<(String, PathBuf)>> = BTreeMap::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry during image scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(extension) = path.extension().map(|e| e.to_string_lossy().to_string()) else {
            continue;
        };
        if !query.accepts_extension(&extension) {
            continue;
        }
        let Some(directory) = path.parent().map(Path::to_path_buf) else {
            continue;
        };
        let file_name = entry.file_name().to_string_lossy().to_string();

        let (head, tail, digits) = match frame_pattern().captures(&file_name) {
            Some(caps) => (
                caps["head"].to_string(),
                caps["tail"].to_string(),
                caps["frame"].to_string(),
            ),
            None => (
                file_name
                    .strip_suffix(&format!(".{extension}"))
                    .unwrap_or(&file_name)
                    .to_string(),
                format!(".{extension}"),
                String::new(),
            ),
        };
        groups
            .entry((directory, head, tail))
            .or_default()
            .push((digits, path.to_path_buf()));
    }

    let mut sequences = Vec::new();
    for ((directory, head, tail), files) in groups {
        // An unnumbered file next to numbered ones of the same name stays separate
        let (unnumbered, numbered): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|(digits, _)| digits.is_empty());
        for (_, path) in unnumbered {
            sequences.push(build_sequence(&directory, &head, &tail, Vec::new(), path));
        }
        if numbered.is_empty() {
            continue;
        }

        let mut frames: Vec<(u64, usize, PathBuf)> = numbered
            .into_iter()
            .filter_map(|(digits, path)| Some((digits.parse().ok()?, digits.len(), path)))
            .collect();
        frames.sort();
        frames.dedup_by_key(|(frame, _, _)| *frame);
        let Some((_, _, first)) = frames.first().cloned() else {
            continue;
        };
        let padding = frames.iter().map(|(_, len, _)| *len).min().unwrap_or(0);
        let mut sequence = build_sequence(
            &directory,
            &head,
            &tail,
            frames.iter().map(|(f, _, _)| *f).collect(),
            first,
        );
        sequence.padding = padding;
        sequences.push(sequence);
    }

    sequences.retain(|s| query.accepts_name(&s.pattern()));
    Ok(sequences)
}

fn build_sequence(
    directory: &Path,
    head: &str,
    tail: &str,
    frames: Vec<u64>,
    first_file: PathBuf,
) -> ImageSequence {
    let modified = std::fs::metadata(&first_file)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from);
    ImageSequence {
        directory: directory.to_path_buf(),
        head: head.to_string(),
        tail: tail.to_string(),
        padding: 0,
        frames,
        first_file,
        modified,
    }
}
