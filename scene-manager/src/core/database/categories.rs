//! Category list
//!
//! Projects may narrow or reorder the categories shown to artists. Entries
//! that are not part of the closed [`Category`] set are ignored.

use std::path::Path;

use tracing::warn;

use crate::core::fs::{atomic_write_json_pretty, read_json_opt};
use crate::core::{Category, CoreResult};

/// Loads the project's categories, writing the default list if missing
pub fn load_categories(path: &Path) -> CoreResult<Vec<Category>> {
    let Some(names) = read_json_opt::<Vec<String>>(path)? else {
        let defaults: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
        atomic_write_json_pretty(path, &defaults)?;
        return Ok(Category::ALL.to_vec());
    };

    let mut categories = Vec::with_capacity(names.len());
    for name in &names {
        match name.parse::<Category>() {
            Ok(c) if !categories.contains(&c) => categories.push(c),
            Ok(_) => {}
            Err(_) => warn!("Ignoring unknown category '{}' in {}", name, path.display()),
        }
    }

    if categories.is_empty() {
        warn!("No usable categories in {}, using defaults", path.display());
        return Ok(Category::ALL.to_vec());
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.json");

        let categories = load_categories(&path).unwrap();
        assert_eq!(categories, Category::ALL.to_vec());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"Shading\""));
    }

    #[test]
    fn test_filters_unknown_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"["Rig", "Lighting", "model", "Rig"]"#).unwrap();

        let categories = load_categories(&path).unwrap();
        assert_eq!(categories, vec![Category::Rig, Category::Model]);
    }

    #[test]
    fn test_empty_list_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, "[]").unwrap();

        assert_eq!(load_categories(&path).unwrap().len(), 7);
    }
}
