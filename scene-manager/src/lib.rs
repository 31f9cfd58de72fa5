//! Scene Manager Core Library
//!
//! Versioned "base scene" bookkeeping for 3D content-creation pipelines.
//! Host applications (Maya, 3ds Max, Nuke, Photoshop, Houdini) plug in through
//! the [`core::host::SceneHost`] trait; everything else in this crate is
//! host-independent: the per-scene JSON ledger, project path layout, shared
//! project databases, settings and the activity log.

pub mod core;

pub use crate::core::{CoreError, CoreResult};
