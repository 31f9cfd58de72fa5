//! Project Database Module
//!
//! Shared JSON files that every base scene of a project refers to:
//! the sub-project list, the user directory and the category list.

mod categories;
mod subprojects;
mod users;

pub use categories::*;
pub use subprojects::*;
pub use users::*;
