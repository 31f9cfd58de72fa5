//! Scene Manager Core
//!
//! Version ledger, path resolution, project databases and host abstraction.

pub mod activity;
pub mod database;
pub mod fs;
pub mod host;
pub mod images;
pub mod ledger;
pub mod paths;
pub mod project;
pub mod settings;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_scenarios;
