//! User directory
//!
//! Maps an artist's full name to the initials embedded in version file names.
//! The file usually lives on a studio-wide network path, so reads and writes
//! happen under an advisory lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::fs::{
    atomic_write_json_pretty, lock_path_for, read_json_opt, sanitize_scene_name, with_lock,
};
use crate::core::{CoreError, CoreResult};

/// Default user written to a fresh directory
pub const DEFAULT_USER: (&str, &str) = ("Generic", "gn");

/// Full name → initials
#[derive(Debug, Clone)]
pub struct UserDirectory {
    path: PathBuf,
    users: BTreeMap<String, String>,
}

impl UserDirectory {
    /// Loads the directory, creating it with the generic user if missing
    pub fn load_or_create(path: &Path) -> CoreResult<Self> {
        let lock = lock_path_for(path);
        let users = with_lock(&lock, true, || {
            match read_json_opt::<BTreeMap<String, String>>(path)? {
                Some(users) if !users.is_empty() => Ok(users),
                _ => {
                    let users = default_users();
                    atomic_write_json_pretty(path, &users)?;
                    info!("Created user directory at {}", path.display());
                    Ok(users)
                }
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            users,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.users.keys().map(String::as_str).collect()
    }

    /// Initials for `name`
    pub fn initials(&self, name: &str) -> CoreResult<&str> {
        self.users
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CoreError::UserNotFound(name.to_string()))
    }

    /// Adds or replaces a user and persists the directory.
    ///
    /// The file is re-read under the lock so concurrent additions from other
    /// machines are kept.
    pub fn add_user(&mut self, name: &str, initials: &str) -> CoreResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidName("user name is empty".to_string()));
        }
        let initials = sanitize_scene_name(initials)?;

        let lock = lock_path_for(&self.path);
        let path = self.path.clone();
        self.users = with_lock(&lock, true, || {
            let mut users = read_json_opt::<BTreeMap<String, String>>(&path)?.unwrap_or_default();
            if let Some(old) = users.insert(name.to_string(), initials.clone()) {
                warn!("Replacing initials of {} ({} -> {})", name, old, initials);
            }
            atomic_write_json_pretty(&path, &users)?;
            Ok(users)
        })?;
        Ok(())
    }

    /// Removes a user; returns whether it existed
    pub fn remove_user(&mut self, name: &str) -> CoreResult<bool> {
        let lock = lock_path_for(&self.path);
        let path = self.path.clone();
        let (users, removed) = with_lock(&lock, true, || {
            let mut users = read_json_opt::<BTreeMap<String, String>>(&path)?.unwrap_or_default();
            let removed = users.remove(name).is_some();
            if removed {
                atomic_write_json_pretty(&path, &users)?;
            }
            Ok((users, removed))
        })?;
        self.users = users;
        Ok(removed)
    }
}

fn default_users() -> BTreeMap<String, String> {
    let mut users = BTreeMap::new();
    users.insert(DEFAULT_USER.0.to_string(), DEFAULT_USER.1.to_string());
    users
}
