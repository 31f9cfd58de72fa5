//! Scene manager
//!
//! Drives a [`SceneHost`] through the base scene workflow: create, save new
//! versions, load, annotate. Reference and deletion operations live in
//! sibling modules as further `impl` blocks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use super::record::{stamp_note, BaseSceneRecord, VersionRecord};
use super::store::{load_record, name_taken, save_record, scan_all_records, scan_records};
use crate::core::activity::{ActivityAction, ActivityEntry, ActivityLog, ACTIVITY_FILE};
use crate::core::database::{load_categories, SubProjectList, UserDirectory};
use crate::core::fs::sanitize_scene_name;
use crate::core::host::SceneHost;
use crate::core::images::{list_sequences, ImageSequence, SequenceQuery};
use crate::core::paths::{version_file_name, BaseScenePaths, OpenSceneInfo, ProjectLayout};
use crate::core::settings::{ManagerConfig, PreviewSettings};
use crate::core::{Category, CoreError, CoreResult, VersionNumber};

/// Version ledger bound to one project, one host and one user directory
pub struct SceneManager<H: SceneHost> {
    pub(super) config: ManagerConfig,
    pub(super) layout: ProjectLayout,
    pub(super) host: H,
    users: UserDirectory,
    sub_projects: SubProjectList,
    categories: Vec<Category>,
    activity: ActivityLog,
}

impl<H: SceneHost> SceneManager<H> {
    /// Opens the project's database for `host`, creating missing folders
    /// and data files.
    pub fn open(config: ManagerConfig, host: H) -> CoreResult<Self> {
        if !config.project_dir.is_dir() {
            return Err(CoreError::FileNotFound(format!(
                "project directory {}",
                config.project_dir.display()
            )));
        }

        let layout = ProjectLayout::new(&config.project_dir, &config.software);
        layout.ensure_dirs()?;

        let sub_projects = SubProjectList::load_or_create(&layout.subprojects_file)?;
        let categories = load_categories(&layout.categories_file)?;
        let users = UserDirectory::load_or_create(&config.users_file)?;
        let activity = ActivityLog::new(layout.database_dir.join(ACTIVITY_FILE));

        info!(
            "Scene manager opened at {} for {}",
            layout.project_dir.display(),
            config.software.nice_name
        );

        Ok(Self {
            config,
            layout,
            host,
            users,
            sub_projects,
            categories,
            activity,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn users_mut(&mut self) -> &mut UserDirectory {
        &mut self.users
    }

    pub fn sub_projects(&self) -> &SubProjectList {
        &self.sub_projects
    }

    /// Categories enabled for this project
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Appends a sub-project; returns its index
    pub fn add_sub_project(&mut self, name: &str) -> CoreResult<usize> {
        self.sub_projects.add(name)
    }

    /// Preview settings of this project/host, created with defaults if missing
    pub fn preview_settings(&self) -> CoreResult<PreviewSettings> {
        PreviewSettings::load_or_create(&self.layout.pb_settings_file)
    }

    // =========================================================================
    // Create / Save
    // =========================================================================

    /// Saves the open host scene as version 1 of a new base scene.
    ///
    /// Returns the absolute path of the saved scene file.
    pub fn create_base_scene(
        &mut self,
        category: Category,
        user: &str,
        name: &str,
        sub_project_index: usize,
        make_reference: bool,
        notes: &str,
    ) -> CoreResult<PathBuf> {
        let name = sanitize_scene_name(name)?;
        if !self.categories.contains(&category) {
            return Err(CoreError::UnknownCategory(category.to_string()));
        }
        let sub_project = self.sub_projects.get(sub_project_index)?.to_string();
        let initials = self.users.initials(user)?.to_string();

        let paths = self
            .layout
            .base_scene_paths(category, &sub_project, &name);
        if let Some(existing) = name_taken(&paths.database_dir, &name)? {
            return Err(CoreError::NameConflict(format!(
                "{} (existing: {}) in {}/{}",
                name, existing, category, sub_project
            )));
        }

        paths.ensure()?;
        let scene_file = self.version_path(&paths, &name, category, &initials, 1);
        self.host.save_current(&scene_file)?;

        let workstation = self.config.workstation();
        let thumbnail = self.capture_thumbnail_for(&paths, &name, 1);
        let version = VersionRecord {
            path: self.relative(&scene_file)?,
            note: stamp_note(user, notes, Local::now()),
            user: initials.clone(),
            workstation: workstation.clone(),
            previews: BTreeMap::new(),
            thumbnail,
            ranges: self.host.timeline_ranges(),
        };

        let mut record = BaseSceneRecord::new(
            &name,
            category,
            &initials,
            &workstation,
            &self.relative(&paths.shot_dir)?,
            &sub_project,
        )
        .with_software(&self.host.software());
        record.push_version(version);

        if make_reference {
            self.copy_to_reference(&mut record, 1)?;
        }

        save_record(&paths.json_file, &record)?;
        self.record_activity(ActivityAction::Create, user, &record.versions[0].path);
        info!(
            "Created base scene {} ({}/{}) at {}",
            name,
            category,
            sub_project,
            scene_file.display()
        );
        Ok(scene_file)
    }

    /// Saves the open host scene as the next version of its base scene.
    ///
    /// Returns the absolute path of the saved scene file.
    pub fn save_version(
        &mut self,
        user: &str,
        make_reference: bool,
        notes: &str,
    ) -> CoreResult<PathBuf> {
        let info = self.current_base_scene()?;
        let mut record = load_record(&info.json_file)?;
        let initials = self.users.initials(user)?.to_string();

        let paths =
            self.layout
                .base_scene_paths(record.category, &record.sub_project, &record.name);
        let number = record.latest_version() + 1;
        paths.ensure()?;
        let scene_file = self.version_path(&paths, &record.name, record.category, &initials, number);
        self.host.save_current(&scene_file)?;

        let thumbnail = self.capture_thumbnail_for(&paths, &record.name, number);
        let version = VersionRecord {
            path: self.relative(&scene_file)?,
            note: stamp_note(user, notes, Local::now()),
            user: initials,
            workstation: self.config.workstation(),
            previews: BTreeMap::new(),
            thumbnail,
            ranges: self.host.timeline_ranges(),
        };
        record.push_version(version);

        if make_reference {
            self.copy_to_reference(&mut record, number)?;
        }

        save_record(&info.json_file, &record)?;
        self.record_activity(ActivityAction::Save, user, &record.versions[number - 1].path);
        info!("Saved {} version {}", record.name, number);
        Ok(scene_file)
    }

    /// Resolves the open host scene to its base scene
    pub fn current_base_scene(&self) -> CoreResult<OpenSceneInfo> {
        let current = self
            .host
            .current_scene_path()
            .ok_or_else(|| CoreError::NotABaseScene("scene is not saved".to_string()))?;
        self.layout
            .locate_open_scene(&current, self.sub_projects.names())
            .ok_or_else(|| CoreError::NotABaseScene(current.display().to_string()))
    }

    // =========================================================================
    // Load / Annotate
    // =========================================================================

    /// Opens a version in the host; returns the opened file
    pub fn load_version(
        &mut self,
        json_file: &Path,
        version: VersionNumber,
        force: bool,
    ) -> CoreResult<PathBuf> {
        let record = load_record(json_file)?;
        let scene_file = self.layout.resolve(&record.version(version)?.path);
        if !scene_file.is_file() {
            return Err(CoreError::FileNotFound(scene_file.display().to_string()));
        }

        self.host.open(&scene_file, force)?;
        let user = self.config.user.clone();
        self.record_activity(ActivityAction::Load, &user, &record.versions[version - 1].path);
        info!("Loaded {} version {}", record.name, version);
        Ok(scene_file)
    }

    /// Appends a stamped note to a version
    pub fn add_note(
        &self,
        json_file: &Path,
        version: VersionNumber,
        user: &str,
        note: &str,
    ) -> CoreResult<()> {
        let mut record = load_record(json_file)?;
        record
            .version_mut(version)?
            .append_note(user, note, Local::now());
        save_record(json_file, &record)
    }

    // =========================================================================
    // Previews / Thumbnails
    // =========================================================================

    /// Records `preview` (absolute) for `camera` on a version, replacing any
    /// previous entry for that camera.
    pub fn set_preview(
        &self,
        json_file: &Path,
        version: VersionNumber,
        camera: &str,
        preview: &Path,
    ) -> CoreResult<()> {
        let relative = self.relative(preview)?;
        let mut record = load_record(json_file)?;
        let previous = record
            .version_mut(version)?
            .previews
            .insert(camera.to_string(), relative);
        if let Some(previous) = previous {
            debug!("Replaced preview {} of {}", previous, record.name);
        }
        save_record(json_file, &record)
    }

    /// Asks the host for a preview of `camera` and records it.
    ///
    /// Returns the relative preview path, `None` if the host cannot preview.
    pub fn capture_preview(
        &mut self,
        json_file: &Path,
        version: VersionNumber,
        camera: &str,
    ) -> CoreResult<Option<String>> {
        let record = load_record(json_file)?;
        record.check_version(version)?;
        let paths = self
            .layout
            .base_scene_paths(record.category, &record.sub_project, &record.name);
        std::fs::create_dir_all(&paths.preview_dir)?;

        let Some(preview) = self.host.create_preview(&paths.preview_dir, camera)? else {
            return Ok(None);
        };
        self.set_preview(json_file, version, camera, &preview)?;
        Ok(Some(self.relative(&preview)?))
    }

    /// Removes the preview entry of `camera` and deletes its file (best
    /// effort). Returns whether an entry existed.
    pub fn remove_preview(
        &self,
        json_file: &Path,
        version: VersionNumber,
        camera: &str,
    ) -> CoreResult<bool> {
        let mut record = load_record(json_file)?;
        let Some(relative) = record.version_mut(version)?.previews.remove(camera) else {
            return Ok(false);
        };

        let file = self.layout.resolve(&relative);
        if let Err(e) = std::fs::remove_file(&file) {
            warn!("Cannot delete preview {}: {}", file.display(), e);
        }
        save_record(json_file, &record)?;
        Ok(true)
    }

    /// Records `thumbnail` (absolute) on a version
    pub fn set_thumbnail(
        &self,
        json_file: &Path,
        version: VersionNumber,
        thumbnail: &Path,
    ) -> CoreResult<()> {
        let relative = self.relative(thumbnail)?;
        let mut record = load_record(json_file)?;
        record.version_mut(version)?.thumbnail = Some(relative);
        save_record(json_file, &record)
    }

    /// Asks the host to (re)write the thumbnail of a version.
    ///
    /// Returns the relative path, `None` if the host cannot make thumbnails.
    pub fn capture_thumbnail(
        &mut self,
        json_file: &Path,
        version: VersionNumber,
    ) -> CoreResult<Option<String>> {
        let record = load_record(json_file)?;
        record.check_version(version)?;
        let paths = self
            .layout
            .base_scene_paths(record.category, &record.sub_project, &record.name);
        let target = self.thumbnail_path(&paths, &record.name, version);

        if !self.host.create_thumbnail(&target)? {
            return Ok(None);
        }
        self.set_thumbnail(json_file, version, &target)?;
        Ok(Some(self.relative(&target)?))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Record files of one category/sub-project scope, by name
    pub fn scan_base_scenes(
        &self,
        category: Category,
        sub_project_index: usize,
    ) -> CoreResult<BTreeMap<String, PathBuf>> {
        let sub_project = self.sub_projects.get(sub_project_index)?;
        scan_records(&self.layout.scope_database_dir(category, sub_project))
    }

    /// Loads every readable record of a scope; unreadable ones are skipped
    pub fn list_base_scenes(
        &self,
        category: Category,
        sub_project_index: usize,
    ) -> CoreResult<Vec<(PathBuf, BaseSceneRecord)>> {
        let mut records = Vec::new();
        for (name, json_file) in self.scan_base_scenes(category, sub_project_index)? {
            match load_record(&json_file) {
                Ok(record) => records.push((json_file, record)),
                Err(e) => warn!("Skipping base scene {}: {}", name, e),
            }
        }
        Ok(records)
    }

    /// Every readable base scene of this host across all categories and
    /// sub-projects
    pub fn list_all_base_scenes(&self) -> Vec<(PathBuf, BaseSceneRecord)> {
        scan_all_records(&self.layout.database_dir)
            .into_iter()
            .filter_map(|json_file| match load_record(&json_file) {
                Ok(record) => Some((json_file, record)),
                Err(e) => {
                    warn!("Skipping {}: {}", json_file.display(), e);
                    None
                }
            })
            .collect()
    }

    /// Image sequences under the project's images folder
    pub fn list_image_sequences(&self, query: &SequenceQuery) -> CoreResult<Vec<ImageSequence>> {
        list_sequences(&self.layout.images_dir, query)
    }

    /// JSON record of a named base scene
    pub fn find_base_scene(
        &self,
        category: Category,
        sub_project_index: usize,
        name: &str,
    ) -> CoreResult<PathBuf> {
        let sub_project = self.sub_projects.get(sub_project_index)?;
        let json_file = self
            .layout
            .base_scene_paths(category, sub_project, name)
            .json_file;
        if !json_file.is_file() {
            return Err(CoreError::RecordNotFound(format!(
                "{} in {}/{}",
                name, category, sub_project
            )));
        }
        Ok(json_file)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn version_path(
        &self,
        paths: &BaseScenePaths,
        name: &str,
        category: Category,
        initials: &str,
        version: VersionNumber,
    ) -> PathBuf {
        let stem = version_file_name(name, category, initials, version, self.config.padding);
        let extension = self.host.scene_extension();
        if extension.is_empty() {
            paths.shot_dir.join(stem)
        } else {
            paths.shot_dir.join(format!("{stem}.{extension}"))
        }
    }

    /// `<databaseDir>/<name>_v<NNN>_thumb.jpg`
    fn thumbnail_path(&self, paths: &BaseScenePaths, name: &str, version: VersionNumber) -> PathBuf {
        paths.database_dir.join(format!(
            "{name}_v{version:0width$}_thumb.jpg",
            width = self.config.padding
        ))
    }

    /// Thumbnail of a version being saved; failures only cost the thumbnail.
    fn capture_thumbnail_for(
        &mut self,
        paths: &BaseScenePaths,
        name: &str,
        version: VersionNumber,
    ) -> Option<String> {
        let target = self.thumbnail_path(paths, name, version);
        match self.host.create_thumbnail(&target) {
            Ok(true) => self.layout.to_relative(&target),
            Ok(false) => None,
            Err(e) => {
                warn!("Thumbnail for {} v{} failed: {}", name, version, e);
                None
            }
        }
    }

    pub(super) fn relative(&self, absolute: &Path) -> CoreResult<String> {
        self.layout.to_relative(absolute).ok_or_else(|| {
            CoreError::ValidationError(format!(
                "{} is outside the project {}",
                absolute.display(),
                self.layout.project_dir.display()
            ))
        })
    }

    /// Activity is informational; failing to log never fails an operation.
    pub(super) fn record_activity(&self, action: ActivityAction, user: &str, path: &str) {
        let entry = ActivityEntry::new(action, user, &self.config.workstation(), path);
        if let Err(e) = self.activity.append(&entry) {
            warn!("Failed to write activity log: {}", e);
        }
    }
}
