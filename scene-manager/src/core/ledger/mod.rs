//! Version Ledger
//!
//! Per-base-scene JSON records tracking sequential versions and the single
//! promoted reference copy. Every operation loads the record from disk,
//! modifies it and writes it back atomically; the file is the only authority.

mod deletion;
mod manager;
mod record;
mod reference;
mod store;

pub use deletion::*;
pub use manager::*;
pub use record::*;
pub use store::*;
