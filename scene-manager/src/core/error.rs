//! Scene Manager Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::VersionNumber;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Ledger Errors
    // =========================================================================
    #[error("Base scene name is not unique: {0}")]
    NameConflict(String),

    #[error("This is not a base scene: {0}")]
    NotABaseScene(String),

    #[error("Version {requested} is out of range (scene has {available} versions)")]
    VersionOutOfRange {
        requested: VersionNumber,
        available: usize,
    },

    #[error("Base scene record not found: {0}")]
    RecordNotFound(String),

    #[error("Base scene record corrupted: {0}")]
    RecordCorrupted(String),

    // =========================================================================
    // Naming / Lookup Errors
    // =========================================================================
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Sub-project index {0} does not exist")]
    SubProjectNotFound(usize),

    #[error("User not found in user directory: {0}")]
    UserNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    // =========================================================================
    // Host Errors
    // =========================================================================
    #[error("Host operation failed: {0}")]
    HostFailed(String),

    // =========================================================================
    // Project Errors
    // =========================================================================
    #[error("Project already exists: {0}")]
    ProjectExists(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Short machine-readable kind, used by the CLI's JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NameConflict(_) => "nameConflict",
            Self::NotABaseScene(_) => "notABaseScene",
            Self::VersionOutOfRange { .. } => "versionOutOfRange",
            Self::RecordNotFound(_) => "recordNotFound",
            Self::RecordCorrupted(_) => "recordCorrupted",
            Self::InvalidName(_) => "invalidName",
            Self::UnknownCategory(_) => "unknownCategory",
            Self::SubProjectNotFound(_) => "subProjectNotFound",
            Self::UserNotFound(_) => "userNotFound",
            Self::FileNotFound(_) => "fileNotFound",
            Self::HostFailed(_) => "hostFailed",
            Self::ProjectExists(_) => "projectExists",
            Self::ValidationError(_) => "validation",
            Self::IoError(_) => "io",
            Self::JsonError(_) => "json",
            Self::Internal(_) => "internal",
        }
    }
}
