//! Project Scaffolding
//!
//! New projects are folders named `<brand_><name>_<client>_<yymmdd>` under a
//! common projects root, pre-populated with the folder tree hosts expect.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::core::fs::validate_path_id_component;
use crate::core::paths::{MASTER_DIR, PREVIEWS_DIR};
use crate::core::{CoreError, CoreResult};

/// Folders created inside every new project
pub const PROJECT_FOLDERS: &[&str] = &[
    "_COMP",
    "_REF",
    "_TRACK",
    "_TRANSFER/FBX",
    "_TRANSFER/ALEMBIC",
    "_TRANSFER/OBJ",
    "_TRANSFER/MA",
    "assets",
    "cache",
    "clips",
    "data",
    "images/_CompRenders",
    "movies",
    "particles",
    PREVIEWS_DIR,
    "renderData/depth",
    "renderData/shaders",
    "scenes",
    "scripts",
    MASTER_DIR,
    "sound",
    "sourceimages/_FOOTAGE",
    "sourceimages/_HDR",
];

/// Builds the folder path of a new project.
///
/// `name`, `client` and `root` are mandatory; `brand` is optional.
pub fn resolve_project_path(
    root: &Path,
    name: &str,
    brand: Option<&str>,
    client: &str,
    date: NaiveDate,
) -> CoreResult<PathBuf> {
    if root.as_os_str().is_empty() || name.trim().is_empty() || client.trim().is_empty() {
        return Err(CoreError::ValidationError(
            "project root, name and client are mandatory".to_string(),
        ));
    }
    validate_path_id_component(name, "project name").map_err(CoreError::InvalidName)?;
    validate_path_id_component(client, "client name").map_err(CoreError::InvalidName)?;

    let brand = match brand.map(str::trim).filter(|b| !b.is_empty()) {
        Some(b) => {
            validate_path_id_component(b, "brand name").map_err(CoreError::InvalidName)?;
            format!("{b}_")
        }
        None => String::new(),
    };

    let folder = format!(
        "{}{}_{}_{}",
        brand,
        name.trim(),
        client.trim(),
        date.format("%y%m%d")
    );
    Ok(root.join(folder))
}

/// Creates a new project folder tree; returns the project path
pub fn create_project(
    root: &Path,
    name: &str,
    brand: Option<&str>,
    client: &str,
    date: NaiveDate,
) -> CoreResult<PathBuf> {
    let project = resolve_project_path(root, name, brand, client, date)?;
    if project.exists() {
        return Err(CoreError::ProjectExists(project.display().to_string()));
    }

    for folder in PROJECT_FOLDERS {
        std::fs::create_dir_all(project.join(folder))?;
    }
    info!("Created project {}", project.display());
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_resolve_project_path() {
        let root = Path::new("/projects");
        assert_eq!(
            resolve_project_path(root, "Robots", Some("Acme"), "Studio", date()).unwrap(),
            PathBuf::from("/projects/Acme_Robots_Studio_240309")
        );
        assert_eq!(
            resolve_project_path(root, "Robots", Some("  "), "Studio", date()).unwrap(),
            PathBuf::from("/projects/Robots_Studio_240309")
        );
    }

    #[test]
    fn test_mandatory_fields() {
        let root = Path::new("/projects");
        assert!(matches!(
            resolve_project_path(root, "", None, "Studio", date()),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            resolve_project_path(root, "Robots", None, " ", date()),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            resolve_project_path(root, "../Robots", None, "Studio", date()),
            Err(CoreError::InvalidName(_))
        ));
    }

    #[test]
    fn test_create_project_tree() {
        let dir = TempDir::new().unwrap();
        let project = create_project(dir.path(), "Robots", None, "Studio", date()).unwrap();

        assert!(project.join("scenes").is_dir());
        assert!(project.join("smDatabase").is_dir());
        assert!(project.join("sourceimages/_HDR").is_dir());

        let leaf_count = WalkDir::new(&project)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .count();
        assert!(leaf_count >= PROJECT_FOLDERS.len());

        assert!(matches!(
            create_project(dir.path(), "Robots", None, "Studio", date()),
            Err(CoreError::ProjectExists(_))
        ));
    }
}
