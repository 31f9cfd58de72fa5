//! Sub-project list
//!
//! Append-only ordered list stored as a flat JSON array. Index 0 is always
//! the `"None"` sentinel meaning "no sub-project".

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::fs::{atomic_write_json_pretty, read_json_opt, validate_path_id_component};
use crate::core::{Category, CoreError, CoreResult, NO_SUB_PROJECT};

/// Sub-project names of one project/host database
#[derive(Debug, Clone)]
pub struct SubProjectList {
    path: PathBuf,
    names: Vec<String>,
}

impl SubProjectList {
    /// Loads the list, creating `["None"]` on disk if the file is missing
    pub fn load_or_create(path: &Path) -> CoreResult<Self> {
        let names = match read_json_opt::<Vec<String>>(path)? {
            Some(mut names) => {
                if names.first().map(String::as_str) != Some(NO_SUB_PROJECT) {
                    warn!(
                        "Sub-project list {} has no '{}' sentinel, inserting it",
                        path.display(),
                        NO_SUB_PROJECT
                    );
                    names.retain(|n| n != NO_SUB_PROJECT);
                    names.insert(0, NO_SUB_PROJECT.to_string());
                }
                names
            }
            None => {
                let names = vec![NO_SUB_PROJECT.to_string()];
                atomic_write_json_pretty(path, &names)?;
                names
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            names,
        })
    }

    /// All names, sentinel first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name at `index`
    pub fn get(&self, index: usize) -> CoreResult<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(CoreError::SubProjectNotFound(index))
    }

    /// Index of `name`, if present
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Appends a sub-project and persists the list.
    ///
    /// Adding an existing name is not an error; its index is returned.
    pub fn add(&mut self, name: &str) -> CoreResult<usize> {
        let name = name.trim();
        validate_path_id_component(name, "sub-project name").map_err(CoreError::InvalidName)?;
        // A sub-project folder named like a category is indistinguishable from it
        if name.parse::<Category>().is_ok() {
            return Err(CoreError::InvalidName(format!(
                "sub-project name '{name}' is a category name"
            )));
        }

        if let Some(index) = self.index_of(name) {
            warn!("{} is already in sub-projects list", name);
            return Ok(index);
        }

        self.names.push(name.to_string());
        atomic_write_json_pretty(&self.path, &self.names)?;
        info!("Added sub-project '{}' at index {}", name, self.names.len() - 1);
        Ok(self.names.len() - 1)
    }
}
