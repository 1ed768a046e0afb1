//! Device Classifier
//!
//! Assigns a device category from the marker children of its sysfs entry.
//! Rules are checked in order and the first marker present wins.

use crate::domain::ports::DeviceCategory;
use crate::error::Result;
use crate::hardware::discovery::sysfs::exists;
use std::path::Path;
use tracing::trace;

// =============================================================================
// Marker Rules
// =============================================================================

/// A sysfs child whose existence alone implies a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRule {
    pub marker: &'static str,
    pub category: DeviceCategory,
}

/// Classification rules, most specific first
///
/// Some kernels expose `device` next to `md` or `dm` for layered devices,
/// so the generic disk marker must come last.
pub const MARKER_RULES: [MarkerRule; 3] = [
    MarkerRule {
        marker: "md",
        category: DeviceCategory::Raid,
    },
    MarkerRule {
        marker: "dm",
        category: DeviceCategory::DeviceMapper,
    },
    MarkerRule {
        marker: "device",
        category: DeviceCategory::Disk,
    },
];

// =============================================================================
// Classification
// =============================================================================

/// Classify the device whose sysfs entry is `entry`
///
/// Fails if any marker's existence cannot be determined; an unreadable
/// marker is never treated as absent.
pub fn classify(entry: &Path) -> Result<DeviceCategory> {
    for rule in &MARKER_RULES {
        if exists(&entry.join(rule.marker))? {
            trace!("{} has marker {:?} -> {}", entry.display(), rule.marker, rule.category);
            return Ok(rule.category);
        }
    }

    trace!("{} has no category marker", entry.display());
    Ok(DeviceCategory::Unknown)
}
