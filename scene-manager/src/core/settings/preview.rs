//! Preview (playblast) settings
//!
//! Flat key/value file consumed by host adapters when they render previews.
//! Keys keep the PascalCase names hosts already read.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::fs::{atomic_write_json_pretty, read_json_opt};
use crate::core::CoreResult;

/// Playblast configuration of one project/host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PreviewSettings {
    /// Width, height
    pub resolution: (u32, u32),
    pub format: String,
    pub codec: String,
    /// Scale in percent of `resolution`
    pub percent: u32,
    pub quality: u32,
    pub show_frame_number: bool,
    pub show_scene_name: bool,
    pub show_category: bool,
    pub show_frame_range: bool,
    #[serde(rename = "ShowFPS")]
    pub show_fps: bool,
    pub polygon_only: bool,
    pub show_grid: bool,
    pub clear_selection: bool,
    pub display_textures: bool,
    pub wire_on_shaded: bool,
    pub use_default_material: bool,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            resolution: (1280, 720),
            format: "avi".to_string(),
            codec: "IYUV Codec".to_string(),
            percent: 100,
            quality: 100,
            show_frame_number: true,
            show_scene_name: false,
            show_category: false,
            show_frame_range: true,
            show_fps: true,
            polygon_only: true,
            show_grid: false,
            clear_selection: true,
            display_textures: true,
            wire_on_shaded: false,
            use_default_material: false,
        }
    }
}

impl PreviewSettings {
    /// Clamps numeric fields into ranges hosts accept.
    pub fn normalize(&mut self) {
        self.percent = self.percent.clamp(1, 100);
        self.quality = self.quality.clamp(1, 100);
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            self.resolution = Self::default().resolution;
        }
        if self.format.trim().is_empty() {
            self.format = Self::default().format;
        }
    }

    /// Loads settings from `path`, writing defaults if the file is missing.
    ///
    /// An unreadable file is left in place and defaults are returned.
    pub fn load_or_create(path: &Path) -> CoreResult<Self> {
        match read_json_opt::<PreviewSettings>(path) {
            Ok(Some(mut settings)) => {
                settings.normalize();
                Ok(settings)
            }
            Ok(None) => {
                let settings = Self::default();
                atomic_write_json_pretty(path, &settings)?;
                info!("Created preview settings at {}", path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!(
                    "Failed to read preview settings {}, using defaults: {}",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let mut normalized = self.clone();
        normalized.normalize();
        atomic_write_json_pretty(path, &normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_written_on_first_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Playblasts").join("pbSettings.json");

        let settings = PreviewSettings::load_or_create(&path).unwrap();
        assert_eq!(settings, PreviewSettings::default());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"ShowFPS\": true"));
        assert!(text.contains("\"Codec\": \"IYUV Codec\""));
    }

    #[test]
    fn test_save_normalizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pb.json");
        let settings = PreviewSettings {
            percent: 400,
            resolution: (0, 720),
            ..PreviewSettings::default()
        };
        settings.save(&path).unwrap();

        let loaded = PreviewSettings::load_or_create(&path).unwrap();
        assert_eq!(loaded.percent, 100);
        assert_eq!(loaded.resolution, (1280, 720));
    }

    #[test]
    fn test_unreadable_file_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pb.json");
        std::fs::write(&path, "garbage").unwrap();

        let settings = PreviewSettings::load_or_create(&path).unwrap();
        assert_eq!(settings, PreviewSettings::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }
}
