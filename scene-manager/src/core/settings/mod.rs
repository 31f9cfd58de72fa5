//! Settings
//!
//! - [`ManagerConfig`]: explicit startup configuration of a [`SceneManager`]
//!   (project, host folders, user, padding). No process-wide state.
//! - [`UserPrefs`] / [`PrefsManager`]: per-user UI state persisted in
//!   `~/SceneManager/smCurrents.json`.
//! - [`PreviewSettings`]: per-project playblast configuration.
//!
//! [`SceneManager`]: crate::core::ledger::SceneManager

mod preview;

pub use preview::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::database::DEFAULT_USER;
use crate::core::fs::{atomic_write_json_pretty, lock_path_for, read_json_opt, with_lock};
use crate::core::paths::{SoftwarePaths, DEFAULT_VERSION_PADDING, MASTER_DIR};
use crate::core::{CoreError, CoreResult};

/// Folder under the home directory holding per-user files
pub const USER_SETTINGS_DIR: &str = "SceneManager";

/// Per-user preferences file name
pub const USER_PREFS_FILE: &str = "smCurrents.json";

/// User directory file name, inside `smDatabase/` unless configured otherwise
pub const USERS_FILE: &str = "sceneManagerUsers.json";

/// Accepted range for version number zero padding
pub const PADDING_RANGE: std::ops::RangeInclusive<usize> = 1..=6;

// =============================================================================
// Manager Configuration
// =============================================================================

/// Startup configuration of a scene manager
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub project_dir: PathBuf,
    pub software: SoftwarePaths,
    /// Full name of the acting user, looked up in the user directory
    pub user: String,
    /// Zero padding of version numbers in file names
    pub padding: usize,
    /// User directory JSON (studios point this at a network share)
    pub users_file: PathBuf,
    workstation: Option<String>,
}

impl ManagerConfig {
    pub fn new(project_dir: impl Into<PathBuf>, software: SoftwarePaths) -> Self {
        let project_dir = project_dir.into();
        let users_file = project_dir.join(MASTER_DIR).join(USERS_FILE);
        Self {
            project_dir,
            software,
            user: DEFAULT_USER.0.to_string(),
            padding: DEFAULT_VERSION_PADDING,
            users_file,
            workstation: None,
        }
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.trim().to_string();
        self
    }

    /// Sets the padding, clamped to [`PADDING_RANGE`]
    pub fn with_padding(mut self, padding: usize) -> Self {
        let clamped = padding.clamp(*PADDING_RANGE.start(), *PADDING_RANGE.end());
        if clamped != padding {
            warn!("Version padding {} out of range, using {}", padding, clamped);
        }
        self.padding = clamped;
        self
    }

    pub fn with_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.users_file = path.into();
        self
    }

    /// Overrides the machine name recorded on versions
    pub fn with_workstation(mut self, name: &str) -> Self {
        self.workstation = Some(name.to_string());
        self
    }

    /// Machine name recorded on versions
    pub fn workstation(&self) -> String {
        if let Some(name) = &self.workstation {
            return name.clone();
        }
        match hostname::get() {
            Ok(name) => name.to_string_lossy().to_string(),
            Err(e) => {
                warn!("Failed to read hostname: {}", e);
                "unknown".to_string()
            }
        }
    }
}

// =============================================================================
// User Preferences
// =============================================================================

/// Last-used selections of one artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPrefs {
    /// Category tab index
    #[serde(default)]
    pub current_tab_index: usize,
    /// Sub-project index
    #[serde(default)]
    pub current_sub_index: usize,
    /// Full user name
    #[serde(default = "default_user")]
    pub current_user: String,
    /// `true` = load mode, `false` = reference mode
    #[serde(default)]
    pub current_mode: bool,
}

fn default_user() -> String {
    DEFAULT_USER.0.to_string()
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            current_tab_index: 0,
            current_sub_index: 0,
            current_user: default_user(),
            current_mode: false,
        }
    }
}

impl UserPrefs {
    /// Clamps indices into the known category / sub-project counts.
    pub fn normalize(&mut self, category_count: usize, sub_project_count: usize) {
        if self.current_tab_index >= category_count.max(1) {
            self.current_tab_index = 0;
        }
        if self.current_sub_index >= sub_project_count.max(1) {
            self.current_sub_index = 0;
        }
        let user = self.current_user.trim();
        self.current_user = if user.is_empty() {
            default_user()
        } else {
            user.to_string()
        };
    }
}

/// Loads and saves [`UserPrefs`]
pub struct PrefsManager {
    prefs_path: PathBuf,
}

impl PrefsManager {
    pub fn new(prefs_path: PathBuf) -> Self {
        Self { prefs_path }
    }

    /// `~/SceneManager/smCurrents.json`
    pub fn for_current_user() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Internal("home directory is unknown".to_string()))?;
        Ok(Self::new(home.join(USER_SETTINGS_DIR).join(USER_PREFS_FILE)))
    }

    pub fn prefs_path(&self) -> &Path {
        &self.prefs_path
    }

    /// Loads preferences, falling back to defaults on any failure
    pub fn load(&self) -> UserPrefs {
        let lock = lock_path_for(&self.prefs_path);
        let result = with_lock(&lock, false, || read_json_opt::<UserPrefs>(&self.prefs_path));

        match result {
            Ok(Some(prefs)) => prefs,
            Ok(None) => {
                info!("Preferences file not found, using defaults");
                UserPrefs::default()
            }
            Err(e) => {
                warn!("Failed to load preferences, using defaults: {}", e);
                UserPrefs::default()
            }
        }
    }

    /// Saves preferences atomically
    pub fn save(&self, prefs: &UserPrefs) -> CoreResult<()> {
        let lock = lock_path_for(&self.prefs_path);
        with_lock(&lock, true, || atomic_write_json_pretty(&self.prefs_path, prefs))?;
        info!("Preferences saved to {}", self.prefs_path.display());
        Ok(())
    }

    /// Deletes the preferences file and returns defaults
    pub fn reset(&self) -> CoreResult<UserPrefs> {
        let lock = lock_path_for(&self.prefs_path);
        with_lock(&lock, true, || {
            if self.prefs_path.exists() {
                std::fs::remove_file(&self.prefs_path)?;
                info!("Preferences file deleted");
            }
            Ok(UserPrefs::default())
        })
    }
}
