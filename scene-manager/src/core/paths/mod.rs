//! Path Resolution
//!
//! Deterministic project layout for base scenes:
//!
//! ```text
//! <project>/<scenesDir>/<Category>[/<SubProject>]/<Name>/<Name>_<Category>_<ini>_v001.<ext>
//! <project>/smDatabase/<databaseDir>/<Category>[/<SubProject>]/<Name>.json
//! <project>/Playblasts/<Category>[/<SubProject>]/<Name>/
//! ```
//!
//! Paths recorded in the ledger are project-relative with forward slashes.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Category, CoreResult, VersionNumber, NO_SUB_PROJECT};

/// Folder holding every host's database under the project root
pub const MASTER_DIR: &str = "smDatabase";

/// Folder holding previews (playblasts) under the project root
pub const PREVIEWS_DIR: &str = "Playblasts";

/// Rendered image sequences under the project root
pub const IMAGES_DIR: &str = "images";

/// Sub-project list file name inside the host database directory
pub const SUBPROJECTS_FILE: &str = "subPdata.json";

/// Category list file name inside the host database directory
pub const CATEGORIES_FILE: &str = "categories.json";

/// Suffix of the promoted reference copy
pub const REFERENCE_SUFFIX: &str = "forReference";

/// Default zero padding for version numbers in file names
pub const DEFAULT_VERSION_PADDING: usize = 3;

// =============================================================================
// Software Paths
// =============================================================================

/// Host-specific folder names inside a project
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwarePaths {
    /// Display name of the host
    pub nice_name: String,
    /// Database folder under `smDatabase/`
    pub database_dir: String,
    /// Scenes folder under the project root
    pub scenes_dir: String,
    /// Preview settings file under `Playblasts/`
    pub pb_settings_file: String,
}

impl SoftwarePaths {
    fn new(nice_name: &str, database_dir: &str, scenes_dir: &str, pb_settings_file: &str) -> Self {
        Self {
            nice_name: nice_name.to_string(),
            database_dir: database_dir.to_string(),
            scenes_dir: scenes_dir.to_string(),
            pb_settings_file: pb_settings_file.to_string(),
        }
    }

    pub fn maya() -> Self {
        Self::new("Maya", "mayaDB", "scenes", "pbSettings.json")
    }

    pub fn max() -> Self {
        Self::new("3dsMax", "maxDB", "scenes_3dsMax", "pbSettings_3dsMax.json")
    }

    pub fn houdini() -> Self {
        Self::new("Houdini", "houdiniDB", "scenes_houdini", "pbSettings_houdini.json")
    }

    pub fn nuke() -> Self {
        Self::new("Nuke", "nukeDB", "scenes_nuke", "pbSettings_nuke.json")
    }

    pub fn photoshop() -> Self {
        Self::new("Photoshop", "psDB", "scenes_ps", "pbSettings_ps.json")
    }
}

impl Default for SoftwarePaths {
    fn default() -> Self {
        Self::maya()
    }
}

// =============================================================================
// Project Layout
// =============================================================================

/// Absolute folder layout of one project for one host
#[derive(Clone, Debug)]
pub struct ProjectLayout {
    pub project_dir: PathBuf,
    pub master_dir: PathBuf,
    pub database_dir: PathBuf,
    pub scenes_dir: PathBuf,
    pub previews_dir: PathBuf,
    pub images_dir: PathBuf,
    pub pb_settings_file: PathBuf,
    pub subprojects_file: PathBuf,
    pub categories_file: PathBuf,
}

/// All paths belonging to one base scene
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseScenePaths {
    /// Folder holding every version and the reference copy
    pub shot_dir: PathBuf,
    /// Folder holding the JSON record
    pub database_dir: PathBuf,
    /// The JSON record itself
    pub json_file: PathBuf,
    /// Folder holding previews for this scene
    pub preview_dir: PathBuf,
}

impl BaseScenePaths {
    /// Creates every folder that will be written to
    pub fn ensure(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.shot_dir)?;
        std::fs::create_dir_all(&self.database_dir)?;
        Ok(())
    }
}

/// Base scene resolved from a host's currently open file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenSceneInfo {
    pub json_file: PathBuf,
    pub category: Category,
    pub sub_project: String,
    pub shot_name: String,
    /// Version parsed from the `_vNNN` file name suffix, if present
    pub version: Option<VersionNumber>,
    pub preview_dir: PathBuf,
}

impl ProjectLayout {
    /// Builds the layout for `project_dir`; nothing is created on disk.
    pub fn new(project_dir: impl Into<PathBuf>, software: &SoftwarePaths) -> Self {
        let project_dir = normalize_lexically(&project_dir.into());
        let master_dir = project_dir.join(MASTER_DIR);
        let database_dir = master_dir.join(&software.database_dir);
        let scenes_dir = project_dir.join(&software.scenes_dir);
        let previews_dir = project_dir.join(PREVIEWS_DIR);
        let images_dir = project_dir.join(IMAGES_DIR);
        let pb_settings_file = previews_dir.join(&software.pb_settings_file);
        let subprojects_file = database_dir.join(SUBPROJECTS_FILE);
        let categories_file = database_dir.join(CATEGORIES_FILE);

        Self {
            project_dir,
            master_dir,
            database_dir,
            scenes_dir,
            previews_dir,
            images_dir,
            pb_settings_file,
            subprojects_file,
            categories_file,
        }
    }

    /// Creates the top-level folders of the layout
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        for dir in [
            &self.master_dir,
            &self.database_dir,
            &self.scenes_dir,
            &self.previews_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Folder holding the JSON records of one category/sub-project scope
    pub fn scope_database_dir(&self, category: Category, sub_project: &str) -> PathBuf {
        with_sub_project(self.database_dir.join(category.as_str()), sub_project)
    }

    /// Resolves every path of a base scene
    pub fn base_scene_paths(
        &self,
        category: Category,
        sub_project: &str,
        name: &str,
    ) -> BaseScenePaths {
        let shot_dir =
            with_sub_project(self.scenes_dir.join(category.as_str()), sub_project).join(name);
        let database_dir = self.scope_database_dir(category, sub_project);
        let json_file = database_dir.join(format!("{name}.json"));
        let preview_dir =
            with_sub_project(self.previews_dir.join(category.as_str()), sub_project).join(name);

        BaseScenePaths {
            shot_dir,
            database_dir,
            json_file,
            preview_dir,
        }
    }

    /// Converts an absolute path to the project-relative form stored in records
    pub fn to_relative(&self, absolute: &Path) -> Option<String> {
        to_relative(&self.project_dir, absolute)
    }

    /// Resolves a project-relative record path
    pub fn resolve(&self, relative: &str) -> PathBuf {
        resolve_to_absolute(&self.project_dir, relative)
    }

    /// Finds the base scene a host scene file belongs to.
    ///
    /// Walks `<Category>[/<SubProject>]/<Name>/<file>` upward from the scene
    /// and returns `None` unless the matching JSON record exists.
    pub fn locate_open_scene(
        &self,
        scene_file: &Path,
        sub_projects: &[String],
    ) -> Option<OpenSceneInfo> {
        let shot_dir = scene_file.parent()?;
        let shot_name = dir_name(shot_dir)?;

        let upper_dir = shot_dir.parent()?;
        let upper_name = dir_name(upper_dir)?;

        let is_sub_project = sub_projects
            .iter()
            .skip(1)
            .any(|s| s.as_str() == upper_name);

        let (category_name, sub_project) = if is_sub_project {
            (dir_name(upper_dir.parent()?)?, upper_name)
        } else {
            (upper_name, NO_SUB_PROJECT.to_string())
        };

        let category: Category = match category_name.parse() {
            Ok(c) => c,
            Err(_) => {
                debug!(
                    "Scene {} is not inside a category folder",
                    scene_file.display()
                );
                return None;
            }
        };

        let paths = self.base_scene_paths(category, &sub_project, &shot_name);
        if !paths.json_file.is_file() {
            debug!("No record at {}", paths.json_file.display());
            return None;
        }

        let version = scene_file
            .file_stem()
            .and_then(|s| parse_version_suffix(&s.to_string_lossy()));

        Some(OpenSceneInfo {
            json_file: paths.json_file,
            category,
            sub_project,
            shot_name,
            version,
            preview_dir: paths.preview_dir,
        })
    }
}

fn with_sub_project(base: PathBuf, sub_project: &str) -> PathBuf {
    if sub_project.is_empty() || sub_project == NO_SUB_PROJECT {
        base
    } else {
        base.join(sub_project)
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

// =============================================================================
// File Name Templates
// =============================================================================

/// `<name>_<category>_<initials>_v<NNN>` without extension
pub fn version_file_name(
    name: &str,
    category: Category,
    initials: &str,
    version: VersionNumber,
    padding: usize,
) -> String {
    format!(
        "{name}_{category}_{initials}_v{version:0width$}",
        width = padding
    )
}

/// `<name>_<category>_forReference` without extension
pub fn reference_file_name(name: &str, category: Category) -> String {
    format!("{name}_{category}_{REFERENCE_SUFFIX}")
}

/// Parses the trailing `_vNNN` of a version file stem
pub fn parse_version_suffix(stem: &str) -> Option<VersionNumber> {
    let (_, digits) = stem.rsplit_once("_v")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// =============================================================================
// Relative / Absolute Conversion
// =============================================================================

/// Resolve a URI to an absolute path
///
/// If the URI is already absolute, returns it as-is.
/// If relative, resolves it against the project root.
pub fn resolve_to_absolute(project_root: &Path, uri: &str) -> PathBuf {
    let normalized = uri.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Convert an absolute path to a project-relative path
///
/// Returns `None` for paths outside the project. The returned string uses
/// forward slashes for cross-platform consistency.
pub fn to_relative(project_root: &Path, absolute: &Path) -> Option<String> {
    let root = normalize_lexically(project_root);
    let path = normalize_lexically(absolute);

    if let Ok(rel) = path.strip_prefix(&root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    // Symlinked roots (e.g. /var -> /private/var) only match once canonicalized.
    let canonical_root = dunce_canonicalize(project_root);
    let canonical_path = dunce_canonicalize(absolute);
    canonical_path
        .strip_prefix(&canonical_root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Removes `.` and resolves `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }
    if result.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        result
    }
}

/// Canonicalize a path, falling back to lexical normalization for paths that
/// do not exist yet.
fn dunce_canonicalize(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(canonical) => strip_unc_prefix(canonical),
        Err(_) => match path.parent().and_then(|p| std::fs::canonicalize(p).ok()) {
            Some(parent) => match path.file_name() {
                Some(name) => strip_unc_prefix(parent).join(name),
                None => normalize_lexically(path),
            },
            None => normalize_lexically(path),
        },
    }
}

/// Strip the Windows UNC prefix (\\?\) from a canonicalized path.
/// On non-Windows platforms, this is a no-op.
fn strip_unc_prefix(path: PathBuf) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let s = path.to_string_lossy();
        if let Some(stripped) = s.strip_prefix(r"\\?\") {
            return PathBuf::from(stripped);
        }
    }
    path
}
