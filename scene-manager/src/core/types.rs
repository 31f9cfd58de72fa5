//! Scene Manager Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::CoreError;

// =============================================================================
// ID Types
// =============================================================================

/// Human-facing version number (1-based)
pub type VersionNumber = usize;

/// Activity log entry identifier (ULID)
pub type EntryId = String;

/// Sentinel sub-project name stored at index 0 of the sub-project list
pub const NO_SUB_PROJECT: &str = "None";

// =============================================================================
// Category
// =============================================================================

/// Base scene category
///
/// Categories form a closed set; the scenes directory and the database
/// directory both contain one folder per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Model,
    Shading,
    Rig,
    Layout,
    Animation,
    Render,
    Other,
}

impl Category {
    /// All categories in canonical display order
    pub const ALL: [Category; 7] = [
        Category::Model,
        Category::Shading,
        Category::Rig,
        Category::Layout,
        Category::Animation,
        Category::Render,
        Category::Other,
    ];

    /// Folder and file-name token for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Model => "Model",
            Category::Shading => "Shading",
            Category::Rig => "Rig",
            Category::Layout => "Layout",
            Category::Animation => "Animation",
            Category::Render => "Render",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::UnknownCategory(trimmed.to_string()))
    }
}

// =============================================================================
// Timeline Ranges
// =============================================================================

/// Timeline ranges captured at save time
///
/// Stored as `[animationStart, playbackMin, playbackMax, animationEnd]`.
/// Hosts may write fractional frames; they are rounded when read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineRanges(pub [i64; 4]);

impl<'de> Deserialize<'de> for TimelineRanges {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let frames = <[f64; 4]>::deserialize(deserializer)?;
        Ok(Self(frames.map(|f| f.round() as i64)))
    }
}

impl TimelineRanges {
    /// Creates ranges, swapping inverted start/end pairs
    pub fn new(anim_start: i64, min: i64, max: i64, anim_end: i64) -> Self {
        let (min, max) = if min > max {
            warn!("Playback range inverted ({}~{}), swapping", min, max);
            (max, min)
        } else {
            (min, max)
        };
        let (anim_start, anim_end) = if anim_start > anim_end {
            warn!(
                "Animation range inverted ({}~{}), swapping",
                anim_start, anim_end
            );
            (anim_end, anim_start)
        } else {
            (anim_start, anim_end)
        };
        Self([anim_start, min, max, anim_end])
    }

    pub fn animation_start(&self) -> i64 {
        self.0[0]
    }

    pub fn playback_min(&self) -> i64 {
        self.0[1]
    }

    pub fn playback_max(&self) -> i64 {
        self.0[2]
    }

    pub fn animation_end(&self) -> i64 {
        self.0[3]
    }
}

impl Default for TimelineRanges {
    fn default() -> Self {
        Self([1, 1, 100, 100])
    }
}

// =============================================================================
// Reference Status
// =============================================================================

/// Result of checking a base scene's reference copy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceStatus {
    /// No reference has been promoted
    NoReference,
    /// A reference is recorded but the file is gone
    Missing,
    /// Reference exists (and matches its version when checked deeply)
    Valid,
    /// Reference differs from the version it was promoted from
    Mismatched,
}

impl fmt::Display for ReferenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferenceStatus::NoReference => "no reference",
            ReferenceStatus::Missing => "missing",
            ReferenceStatus::Valid => "valid",
            ReferenceStatus::Mismatched => "mismatched",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_case_insensitive() {
        assert_eq!("model".parse::<Category>().unwrap(), Category::Model);
        assert_eq!(" RIG ".parse::<Category>().unwrap(), Category::Rig);
        assert!(matches!(
            "Lighting".parse::<Category>(),
            Err(CoreError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_category_serializes_as_folder_name() {
        assert_eq!(
            serde_json::to_string(&Category::Animation).unwrap(),
            "\"Animation\""
        );
    }

    #[test]
    fn test_timeline_ranges_inversion() {
        let ranges = TimelineRanges::new(100, 50, 10, 1);
        assert_eq!(ranges.0, [1, 10, 50, 100]);
    }

    #[test]
    fn test_timeline_ranges_serialize_as_array() {
        let json = serde_json::to_string(&TimelineRanges::new(1, 5, 20, 24)).unwrap();
        assert_eq!(json, "[1,5,20,24]");
    }
}
