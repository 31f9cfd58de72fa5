//! Host Abstraction
//!
//! The ledger never talks to Maya, 3ds Max, Nuke, Photoshop or Houdini
//! directly. Each host binding implements [`SceneHost`]; the ledger only needs
//! to save the open scene somewhere, open a file, and know which file is open.
//!
//! [`FileSceneHost`] is a host without an application behind it: the "open
//! scene" is a file on disk and saving copies it. The CLI and tests use it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::{CoreError, CoreResult, TimelineRanges};

/// Capabilities the ledger consumes from a host application
pub trait SceneHost {
    /// Host name and version recorded on new base scenes (e.g. `"Maya 2020"`)
    fn software(&self) -> String;

    /// Extension used for new scene files, without the dot
    fn scene_extension(&self) -> String;

    /// Absolute path of the open scene, `None` for an unsaved scene
    fn current_scene_path(&self) -> Option<PathBuf>;

    /// Saves the open scene to `path`; the open scene becomes `path`
    fn save_current(&mut self, path: &Path) -> CoreResult<()>;

    /// Opens `path`; `force` discards unsaved changes of the open scene
    fn open(&mut self, path: &Path, force: bool) -> CoreResult<()>;

    /// Timeline ranges of the open scene
    fn timeline_ranges(&self) -> TimelineRanges {
        TimelineRanges::default()
    }

    /// Writes a still thumbnail to `target`. Returns `false` if unsupported.
    fn create_thumbnail(&mut self, _target: &Path) -> CoreResult<bool> {
        Ok(false)
    }

    /// Writes a preview clip for `camera` into `preview_dir`.
    ///
    /// Returns the absolute path of the written clip, or `None` if unsupported.
    fn create_preview(&mut self, _preview_dir: &Path, _camera: &str) -> CoreResult<Option<PathBuf>> {
        Ok(None)
    }
}

// =============================================================================
// File Scene Host
// =============================================================================

/// Host whose open scene is a plain file
#[derive(Debug, Clone)]
pub struct FileSceneHost {
    current: Option<PathBuf>,
    extension: String,
    ranges: TimelineRanges,
}

impl FileSceneHost {
    /// Creates a host with no open scene
    pub fn new(extension: &str) -> Self {
        Self {
            current: None,
            extension: extension.trim_start_matches('.').to_string(),
            ranges: TimelineRanges::default(),
        }
    }

    /// Creates a host with `scene` open; the extension follows the file
    pub fn with_scene(scene: impl Into<PathBuf>, default_extension: &str) -> Self {
        let scene = scene.into();
        let extension = scene
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| default_extension.trim_start_matches('.').to_string());
        Self {
            current: Some(scene),
            extension,
            ranges: TimelineRanges::default(),
        }
    }

    pub fn with_ranges(mut self, ranges: TimelineRanges) -> Self {
        self.ranges = ranges;
        self
    }
}

impl SceneHost for FileSceneHost {
    fn software(&self) -> String {
        format!("Standalone {}", env!("CARGO_PKG_VERSION"))
    }

    fn scene_extension(&self) -> String {
        self.extension.clone()
    }

    fn current_scene_path(&self) -> Option<PathBuf> {
        self.current.clone()
    }

    fn save_current(&mut self, path: &Path) -> CoreResult<()> {
        let source = self
            .current
            .clone()
            .ok_or_else(|| CoreError::HostFailed("no scene is open".to_string()))?;
        if !source.is_file() {
            return Err(CoreError::HostFailed(format!(
                "open scene is missing on disk: {}",
                source.display()
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if source != path {
            std::fs::copy(&source, path)?;
        }
        debug!("Saved {} as {}", source.display(), path.display());
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn open(&mut self, path: &Path, force: bool) -> CoreResult<()> {
        if !path.is_file() {
            return Err(CoreError::FileNotFound(path.display().to_string()));
        }
        info!("Opening {} (force: {})", path.display(), force);
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn timeline_ranges(&self) -> TimelineRanges {
        self.ranges
    }
}
