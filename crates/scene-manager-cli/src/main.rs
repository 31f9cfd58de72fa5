//! Scene Manager command line
//!
//! Headless access to the version ledger. The "open scene" is a file on disk
//! given with `--scene`; saving copies it into the ledger.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;

use scene_manager_lib::core::host::FileSceneHost;
use scene_manager_lib::core::images::{list_sequences, SequenceQuery};
use scene_manager_lib::core::ledger::{load_record, SceneManager};
use scene_manager_lib::core::paths::SoftwarePaths;
use scene_manager_lib::core::project::create_project;
use scene_manager_lib::core::settings::{ManagerConfig, PrefsManager};
use scene_manager_lib::core::{Category, CoreError, VersionNumber};

#[derive(Parser)]
#[command(
    name = "scene-manager-cli",
    version,
    about = "Versioned base scenes for 3D projects"
)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Host whose folders and database are used
    #[arg(long, global = true, value_enum, default_value_t = Software::Maya)]
    software: Software,

    /// Full user name (default: last used user)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Scene file treated as the open scene
    #[arg(long, global = true, value_name = "FILE")]
    scene: Option<PathBuf>,

    /// Zero padding of version numbers
    #[arg(long, global = true, default_value_t = 3)]
    padding: usize,

    /// User directory JSON (default: <project>/smDatabase/sceneManagerUsers.json)
    #[arg(long, global = true, value_name = "PATH")]
    users_file: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Preferences file (default: ~/SceneManager/smCurrents.json)
    #[arg(long, global = true, value_name = "PATH")]
    prefs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Software {
    Maya,
    Max,
    Houdini,
    Nuke,
    Photoshop,
}

impl Software {
    fn paths(self) -> SoftwarePaths {
        match self {
            Software::Maya => SoftwarePaths::maya(),
            Software::Max => SoftwarePaths::max(),
            Software::Houdini => SoftwarePaths::houdini(),
            Software::Nuke => SoftwarePaths::nuke(),
            Software::Photoshop => SoftwarePaths::photoshop(),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Software::Maya => "mb",
            Software::Max => "max",
            Software::Houdini => "hip",
            Software::Nuke => "nk",
            Software::Photoshop => "psd",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project folder tree
    InitProject {
        /// Folder holding all projects
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        client: String,
        #[arg(long)]
        brand: Option<String>,
    },
    /// Save the open scene as version 1 of a new base scene
    Create {
        #[arg(long)]
        category: Category,
        #[arg(long)]
        name: String,
        /// Sub-project index (0 = none)
        #[arg(long, default_value_t = 0)]
        sub_project: usize,
        /// Also promote version 1 to the reference file
        #[arg(long)]
        reference: bool,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Save the open scene as the next version of its base scene
    Save {
        #[arg(long)]
        reference: bool,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Promote a version to the reference file
    Promote {
        #[command(flatten)]
        target: SceneTarget,
        #[arg(long)]
        version: VersionNumber,
    },
    /// Check the reference file of a base scene
    Check {
        #[command(flatten)]
        target: SceneTarget,
        /// Compare bytes against the referenced version
        #[arg(long)]
        deep: bool,
    },
    /// Delete a base scene with all its versions
    Delete {
        #[command(flatten)]
        target: SceneTarget,
    },
    /// Delete the reference file of a base scene
    DeleteReference {
        #[command(flatten)]
        target: SceneTarget,
    },
    /// Open a version (default: latest)
    Load {
        #[command(flatten)]
        target: SceneTarget,
        #[arg(long)]
        version: Option<VersionNumber>,
        /// Discard unsaved changes
        #[arg(long)]
        force: bool,
    },
    /// List base scenes
    List {
        /// Limit to one category
        #[arg(long)]
        category: Option<Category>,
        #[arg(long, default_value_t = 0)]
        sub_project: usize,
        /// Every category and sub-project of the project
        #[arg(long, conflicts_with_all = ["category", "sub_project"])]
        all: bool,
    },
    /// Print a base scene record
    Show {
        #[command(flatten)]
        target: SceneTarget,
    },
    /// Append a note to a version
    Note {
        #[command(flatten)]
        target: SceneTarget,
        #[arg(long)]
        version: VersionNumber,
        text: String,
    },
    /// Manage sub-projects
    #[command(subcommand)]
    SubProject(SubProjectCommand),
    /// Manage the user directory
    #[command(subcommand)]
    User(UserCommand),
    /// Show recent activity
    History {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Print the preview settings, creating defaults if missing
    PreviewSettings,
    /// Show or reset the remembered user preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
    /// List rendered image sequences under <project>/images
    Images {
        /// Folder below the images folder
        #[arg(long, value_name = "DIR")]
        folder: Option<PathBuf>,
        /// Descend into sub-folders
        #[arg(short, long)]
        recursive: bool,
        /// Image formats to include (jpg, png, exr, tif, tga); default all
        #[arg(long = "format", value_name = "EXT")]
        formats: Vec<String>,
        /// Only sequences whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Subcommand)]
enum PrefsCommand {
    Show,
    Reset,
}

#[derive(Subcommand)]
enum SubProjectCommand {
    Add { name: String },
    List,
}

#[derive(Subcommand)]
enum UserCommand {
    Add { name: String, initials: String },
    Remove { name: String },
    List,
}

#[derive(Args)]
struct SceneTarget {
    #[arg(long)]
    category: Category,
    #[arg(long)]
    name: String,
    #[arg(long, default_value_t = 0)]
    sub_project: usize,
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let mut dir_error = None;
    let (file_layer, guard) = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "scene-manager.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                dir_error = Some((dir, e));
                (None, None)
            }
        },
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Logging already initialised");
    }
    if let Some((dir, e)) = dir_error {
        warn!("Cannot create log directory {}: {}; logging to stderr only", dir.display(), e);
    }

    guard
}

// =============================================================================
// Output
// =============================================================================

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneEntry {
    name: String,
    category: Category,
    sub_project: String,
    versions: usize,
    referenced_version: Option<VersionNumber>,
    json_file: PathBuf,
}

// =============================================================================
// Commands
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_dir.as_deref());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let kind = e
                    .downcast_ref::<CoreError>()
                    .map(CoreError::kind)
                    .unwrap_or("error");
                let payload = serde_json::json!({ "error": kind, "message": format!("{e:#}") });
                println!("{payload}");
            } else {
                eprintln!("error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn prefs_manager(&self) -> Option<PrefsManager> {
        match &self.prefs {
            Some(path) => Some(PrefsManager::new(path.clone())),
            None => match PrefsManager::for_current_user() {
                Ok(prefs) => Some(prefs),
                Err(e) => {
                    warn!("Preferences unavailable: {}", e);
                    None
                }
            },
        }
    }

    fn project_dir(&self) -> Result<PathBuf> {
        match &self.project {
            Some(p) => Ok(p.clone()),
            None => std::env::current_dir().context("Failed to read current directory"),
        }
    }

    fn open_manager(&self, user: &str) -> Result<SceneManager<FileSceneHost>> {
        let project = self.project_dir()?;
        let mut config = ManagerConfig::new(&project, self.software.paths())
            .with_user(user)
            .with_padding(self.padding);
        if let Some(users_file) = &self.users_file {
            config = config.with_users_file(users_file);
        }

        let host = match &self.scene {
            Some(scene) => FileSceneHost::with_scene(absolute(scene)?, self.software.extension()),
            None => FileSceneHost::new(self.software.extension()),
        };

        SceneManager::open(config, host)
            .with_context(|| format!("Failed to open project {}", project.display()))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("Failed to read current directory")?
        .join(path))
}

fn locate(m: &SceneManager<FileSceneHost>, target: &SceneTarget) -> Result<PathBuf> {
    Ok(m.find_base_scene(target.category, target.sub_project, &target.name)?)
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::InitProject {
        root,
        name,
        client,
        brand,
    } = &cli.command
    {
        let today = chrono::Local::now().date_naive();
        let project = create_project(root, name, brand.as_deref(), client, today)
            .context("Failed to create project")?;
        let prefs = cli.prefs_manager();
        let user = resolve_user(cli, prefs.as_ref());
        let mut config = ManagerConfig::new(&project, cli.software.paths()).with_user(&user);
        if let Some(users_file) = &cli.users_file {
            config = config.with_users_file(users_file);
        }
        let m = SceneManager::open(config, FileSceneHost::new(cli.software.extension()))?;
        m.preview_settings()?;
        return emit(cli.json, &serde_json::json!({ "project": project }), || {
            format!("Created project {}", project.display())
        });
    }

    if let Commands::Prefs(command) = &cli.command {
        let Some(prefs) = cli.prefs_manager() else {
            bail!("no preferences location; pass --prefs <PATH>");
        };
        let current = match command {
            PrefsCommand::Show => prefs.load(),
            PrefsCommand::Reset => prefs.reset()?,
        };
        return emit(cli.json, &current, || {
            format!(
                "user: {}\ncategory tab: {}\nsub-project: {}\nmode: {}",
                current.current_user,
                current.current_tab_index,
                current.current_sub_index,
                if current.current_mode { "load" } else { "reference" }
            )
        });
    }

    let prefs = cli.prefs_manager();
    let user = resolve_user(cli, prefs.as_ref());
    debug!("Acting as {}", user);
    let mut m = cli.open_manager(&user)?;

    match &cli.command {
        Commands::InitProject { .. } | Commands::Prefs(_) => unreachable!("handled above"),
        Commands::Create {
            category,
            name,
            sub_project,
            reference,
            note,
        } => {
            if cli.scene.is_none() {
                bail!("create needs --scene <FILE> to save from");
            }
            let path = m
                .create_base_scene(*category, &user, name, *sub_project, *reference, note)
                .with_context(|| format!("Failed to create base scene {name}"))?;
            remember(prefs.as_ref(), &m, &user, Some(*category), *sub_project);
            emit(cli.json, &serde_json::json!({ "path": path }), || {
                format!("Saved {}", path.display())
            })
        }
        Commands::Save { reference, note } => {
            let path = m
                .save_version(&user, *reference, note)
                .context("Failed to save version")?;
            remember(prefs.as_ref(), &m, &user, None, 0);
            emit(cli.json, &serde_json::json!({ "path": path }), || {
                format!("Saved {}", path.display())
            })
        }
        Commands::Promote { target, version } => {
            let json_file = locate(&m, target)?;
            m.promote_reference(&json_file, *version)?;
            emit(
                cli.json,
                &serde_json::json!({ "referencedVersion": version }),
                || format!("{} version {} is now the reference", target.name, version),
            )
        }
        Commands::Check { target, deep } => {
            let json_file = locate(&m, target)?;
            let status = m.check_reference(&json_file, *deep)?;
            emit(cli.json, &serde_json::json!({ "status": status }), || {
                format!("{}: {}", target.name, status)
            })
        }
        Commands::Delete { target } => {
            let json_file = locate(&m, target)?;
            let report = m.delete_base_scene(&json_file)?;
            emit(cli.json, &report, || {
                deletion_text(&target.name, report.removed.len(), &report.failures)
            })
        }
        Commands::DeleteReference { target } => {
            let json_file = locate(&m, target)?;
            let report = m.delete_reference(&json_file)?;
            emit(cli.json, &report, || {
                deletion_text(&target.name, report.removed.len(), &report.failures)
            })
        }
        Commands::Load {
            target,
            version,
            force,
        } => {
            let json_file = locate(&m, target)?;
            let version = match version {
                Some(v) => *v,
                None => load_record(&json_file)?.latest_version(),
            };
            let path = m.load_version(&json_file, version, *force)?;
            emit(cli.json, &serde_json::json!({ "path": path }), || {
                format!("Opened {}", path.display())
            })
        }
        Commands::List {
            category,
            sub_project,
            all,
        } => {
            let records = if *all {
                m.list_all_base_scenes()
            } else {
                let categories = match category {
                    Some(c) => vec![*c],
                    None => m.categories().to_vec(),
                };
                let mut records = Vec::new();
                for category in categories {
                    records.extend(m.list_base_scenes(category, *sub_project)?);
                }
                records
            };
            let entries: Vec<SceneEntry> = records
                .into_iter()
                .map(|(json_file, record)| SceneEntry {
                    versions: record.versions.len(),
                    referenced_version: record.referenced_version,
                    name: record.name,
                    category: record.category,
                    sub_project: record.sub_project,
                    json_file,
                })
                .collect();
            emit(cli.json, &entries, || {
                entries
                    .iter()
                    .map(|e| {
                        let reference = e
                            .referenced_version
                            .map(|v| format!(" (ref v{v})"))
                            .unwrap_or_default();
                        format!("{:<10} {:<24} v{}{}", e.category, e.name, e.versions, reference)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Show { target } => {
            let record = load_record(&locate(&m, target)?)?;
            emit(cli.json, &record, || {
                let mut lines = vec![format!(
                    "{} [{} / {}] by {} on {}",
                    record.name, record.category, record.sub_project, record.creator, record.creator_host
                )];
                for (i, v) in record.versions.iter().enumerate() {
                    lines.push(format!("  v{:03} {} ({}@{})", i + 1, v.path, v.user, v.workstation));
                }
                if let Some(reference) = &record.reference_file {
                    lines.push(format!("  reference: {reference}"));
                }
                lines.join("\n")
            })
        }
        Commands::Note {
            target,
            version,
            text,
        } => {
            let json_file = locate(&m, target)?;
            m.add_note(&json_file, *version, &user, text)?;
            emit(cli.json, &serde_json::json!({ "version": version }), || {
                format!("Added note to {} v{:03}", target.name, version)
            })
        }
        Commands::SubProject(SubProjectCommand::Add { name }) => {
            let index = m.add_sub_project(name)?;
            emit(cli.json, &serde_json::json!({ "index": index }), || {
                format!("{name} is sub-project {index}")
            })
        }
        Commands::SubProject(SubProjectCommand::List) => {
            let names = m.sub_projects().names();
            emit(cli.json, &names, || {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| format!("{i:>3} {n}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::User(UserCommand::Add { name, initials }) => {
            m.users_mut().add_user(name, initials)?;
            emit(
                cli.json,
                &serde_json::json!({ "name": name, "initials": initials }),
                || format!("Added {name} ({initials})"),
            )
        }
        Commands::User(UserCommand::Remove { name }) => {
            if !m.users_mut().remove_user(name)? {
                bail!("no user named {name}");
            }
            emit(cli.json, &serde_json::json!({ "removed": name }), || {
                format!("Removed {name}")
            })
        }
        Commands::User(UserCommand::List) => {
            let users = m.users();
            let listing: Vec<(String, String)> = users
                .names()
                .into_iter()
                .map(|n| (n.to_string(), users.initials(n).unwrap_or_default().to_string()))
                .collect();
            emit(cli.json, &listing, || {
                listing
                    .iter()
                    .map(|(n, i)| format!("{i:<6} {n}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::History { count } => {
            let entries = m.activity().recent(*count)?;
            emit(cli.json, &entries, || {
                entries
                    .iter()
                    .map(|e| format!("{} {:?} {} {}", e.timestamp, e.action, e.user, e.path))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Images {
            folder,
            recursive,
            formats,
            filter,
        } => {
            let mut query = SequenceQuery {
                recursive: *recursive,
                name_filter: filter.clone(),
                ..SequenceQuery::default()
            };
            if !formats.is_empty() {
                query = query.with_formats(formats.as_slice())?;
            }
            let sequences = match folder {
                Some(sub) => list_sequences(&m.layout().images_dir.join(sub), &query)?,
                None => m.list_image_sequences(&query)?,
            };
            emit(cli.json, &sequences, || {
                sequences
                    .iter()
                    .map(|s| {
                        let missing = s.missing_frames();
                        let gaps = if missing.is_empty() {
                            String::new()
                        } else {
                            format!(" ({} missing)", missing.len())
                        };
                        format!(
                            "{} {}{}  {}",
                            s.pattern(),
                            s.range_label(),
                            gaps,
                            s.directory.display()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::PreviewSettings => {
            let settings = m.preview_settings()?;
            emit(cli.json, &settings, || {
                format!(
                    "{}x{} {} ({}) at {}%",
                    settings.resolution.0,
                    settings.resolution.1,
                    settings.format,
                    settings.codec,
                    settings.percent
                )
            })
        }
    }
}

fn resolve_user(cli: &Cli, prefs: Option<&PrefsManager>) -> String {
    if let Some(user) = &cli.user {
        return user.clone();
    }
    prefs.map(|p| p.load().current_user).unwrap_or_else(|| {
        scene_manager_lib::core::database::DEFAULT_USER.0.to_string()
    })
}

/// Stores the last used user and selection; failures only cost convenience.
fn remember(
    prefs: Option<&PrefsManager>,
    m: &SceneManager<FileSceneHost>,
    user: &str,
    category: Option<Category>,
    sub_project: usize,
) {
    let Some(prefs) = prefs else {
        return;
    };
    let mut current = prefs.load();
    current.current_user = user.to_string();
    if let Some(category) = category {
        current.current_tab_index = m
            .categories()
            .iter()
            .position(|c| *c == category)
            .unwrap_or(0);
        current.current_sub_index = sub_project;
    }
    current.normalize(m.categories().len(), m.sub_projects().len());
    if let Err(e) = prefs.save(&current) {
        warn!("Failed to save preferences: {}", e);
    }
}

fn deletion_text(
    name: &str,
    removed: usize,
    failures: &[scene_manager_lib::core::ledger::DeletionFailure],
) -> String {
    let mut lines = vec![format!("{name}: removed {removed} item(s)")];
    for failure in failures {
        lines.push(format!(
            "  could not remove {}: {}",
            failure.path.display(),
            failure.error
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("scene-manager-cli").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_parse_create() {
        let parsed = cli(&[
            "--project", "/p", "--scene", "/w.mb", "create", "--category", "model", "--name",
            "Shot01", "--reference",
        ]);
        match parsed.command {
            Commands::Create {
                category,
                name,
                sub_project,
                reference,
                ..
            } => {
                assert_eq!(category, Category::Model);
                assert_eq!(name, "Shot01");
                assert_eq!(sub_project, 0);
                assert!(reference);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_category() {
        let result = Cli::try_parse_from([
            "scene-manager-cli",
            "check",
            "--category",
            "Lighting",
            "--name",
            "A",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_save_promote_flow() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("show");
        std::fs::create_dir_all(&project).unwrap();
        let work = dir.path().join("work.mb");
        std::fs::write(&work, b"scene").unwrap();
        let project_arg = project.to_string_lossy().to_string();
        let work_arg = work.to_string_lossy().to_string();
        let prefs_file = dir.path().join("smCurrents.json");
        let prefs_arg = prefs_file.to_string_lossy().to_string();

        let create = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "--scene",
            &work_arg, "create", "--category", "Model", "--name", "Shot01",
        ]);
        run(&create).unwrap();

        let v1 = project.join("scenes/Model/Shot01/Shot01_Model_gn_v001.mb");
        assert!(v1.is_file());
        let remembered = PrefsManager::new(prefs_file.clone()).load();
        assert_eq!(remembered.current_user, "Generic");
        assert_eq!(remembered.current_tab_index, 0);
        let v1_arg = v1.to_string_lossy().to_string();

        let save = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "--scene",
            &v1_arg, "save",
        ]);
        run(&save).unwrap();
        assert!(project
            .join("scenes/Model/Shot01/Shot01_Model_gn_v002.mb")
            .is_file());

        let promote = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "promote", "--category", "Model",
            "--name", "Shot01", "--version", "2",
        ]);
        run(&promote).unwrap();
        assert!(project
            .join("scenes/Model/Shot01/Shot01_Model_forReference.mb")
            .is_file());

        let bad = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "promote", "--category", "Model",
            "--name", "Shot01", "--version", "7",
        ]);
        let err = run(&bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::VersionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_user_remove_and_list_all() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("show");
        std::fs::create_dir_all(&project).unwrap();
        let work = dir.path().join("work.mb");
        std::fs::write(&work, b"scene").unwrap();
        let project_arg = project.to_string_lossy().to_string();
        let work_arg = work.to_string_lossy().to_string();
        let prefs_arg = dir.path().join("prefs.json").to_string_lossy().to_string();
        let base = ["--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic"];
        let with = |rest: &[&str]| cli(&[&base[..], rest].concat());

        run(&with(&["user", "add", "Jane Artist", "ja"])).unwrap();
        run(&with(&["user", "remove", "Jane Artist"])).unwrap();
        assert!(run(&with(&["user", "remove", "Jane Artist"])).is_err());

        run(&with(&["sub-project", "add", "Seq010"])).unwrap();
        run(&with(&[
            "--scene", &work_arg, "create", "--category", "Rig", "--name", "Hero",
            "--sub-project", "1",
        ]))
        .unwrap();
        let parsed = with(&["list", "--all"]);
        assert!(matches!(parsed.command, Commands::List { all: true, .. }));
        run(&parsed).unwrap();

        assert!(Cli::try_parse_from([
            "scene-manager-cli", "list", "--all", "--category", "Rig"
        ])
        .is_err());
    }

    #[test]
    fn test_prefs_show_and_reset() {
        let dir = TempDir::new().unwrap();
        let prefs_file = dir.path().join("prefs.json");
        let prefs_arg = prefs_file.to_string_lossy().to_string();
        PrefsManager::new(prefs_file.clone())
            .save(&scene_manager_lib::core::settings::UserPrefs {
                current_user: "Jane Artist".to_string(),
                ..Default::default()
            })
            .unwrap();

        run(&cli(&["--prefs", &prefs_arg, "prefs", "show"])).unwrap();
        assert!(prefs_file.exists());
        run(&cli(&["--prefs", &prefs_arg, "prefs", "reset"])).unwrap();
        assert!(!prefs_file.exists());
    }

    #[test]
    fn test_unusable_log_dir_falls_back_to_stderr() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(init_logging(false, Some(&blocker.join("logs"))).is_none());
    }

    #[test]
    fn test_images_command() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("show");
        let renders = project.join("images").join("shot010");
        std::fs::create_dir_all(&renders).unwrap();
        for frame in 1..=3 {
            std::fs::write(renders.join(format!("beauty.{frame:04}.exr")), b"px").unwrap();
        }
        let project_arg = project.to_string_lossy().to_string();
        let prefs_arg = dir.path().join("prefs.json").to_string_lossy().to_string();

        let images = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "images",
            "--recursive", "--format", "exr", "--filter", "beauty",
        ]);
        match &images.command {
            Commands::Images {
                recursive, formats, ..
            } => {
                assert!(*recursive);
                assert_eq!(formats, &vec!["exr".to_string()]);
            }
            _ => panic!("expected images"),
        }
        run(&images).unwrap();

        let bad = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "images",
            "--format", "gif",
        ]);
        assert!(matches!(
            run(&bad).unwrap_err().downcast_ref::<CoreError>(),
            Some(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_create_requires_scene() {
        let dir = TempDir::new().unwrap();
        let project_arg = dir.path().to_string_lossy().to_string();
        let prefs_arg = dir.path().join("prefs.json").to_string_lossy().to_string();
        let create = cli(&[
            "--project", &project_arg, "--prefs", &prefs_arg, "--user", "Generic", "create",
            "--category", "Rig", "--name", "A",
        ]);
        assert!(run(&create).is_err());
    }
}
