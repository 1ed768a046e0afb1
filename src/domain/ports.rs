//! Domain Ports - Core types and trait definitions for the inventory
//!
//! These traits define the boundaries between discovery logic and the
//! external identification tool. Adapters implement these traits to provide
//! concrete functionality.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

/// Prefix of every device node path
pub const DEVICE_NODE_PREFIX: &str = "/dev";

// =============================================================================
// Device Category
// =============================================================================

/// Origin of a block device, as read from its sysfs markers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceCategory {
    #[default]
    Unknown,
    Disk,
    Raid,
    DeviceMapper,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 4] = [
        DeviceCategory::Unknown,
        DeviceCategory::Disk,
        DeviceCategory::Raid,
        DeviceCategory::DeviceMapper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Unknown => "unknown",
            DeviceCategory::Disk => "disk",
            DeviceCategory::Raid => "raid",
            DeviceCategory::DeviceMapper => "device-mapper",
        }
    }
}

impl std::fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(DeviceCategory::Unknown),
            "disk" => Ok(DeviceCategory::Disk),
            "raid" | "md" => Ok(DeviceCategory::Raid),
            "device-mapper" | "dm" => Ok(DeviceCategory::DeviceMapper),
            other => Err(Error::Configuration(format!(
                "Unknown device category: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Block Device Identity
// =============================================================================

/// Anything with a device node path the identification tool can inspect
pub trait BlockDevice {
    /// Absolute device node path, e.g. `/dev/sda`
    fn device_path(&self) -> String;
}

/// Bare names get the `/dev` prefix, absolute paths are used as given.
impl BlockDevice for str {
    fn device_path(&self) -> String {
        if self.starts_with('/') {
            self.to_string()
        } else {
            format!("{}/{}", DEVICE_NODE_PREFIX, self)
        }
    }
}

impl BlockDevice for String {
    fn device_path(&self) -> String {
        self.as_str().device_path()
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for &T {
    fn device_path(&self) -> String {
        (**self).device_path()
    }
}

// =============================================================================
// Filesystem Attributes
// =============================================================================

/// Filesystem identification of a device
///
/// A field is `None` when the tool did not report it. `Some("")` means the
/// tool reported the key with an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub uuid: Option<String>,
    #[serde(rename = "type")]
    pub fs_type: Option<String>,
    pub label: Option<String>,
}

impl Attributes {
    /// True if no recognized key was reported
    pub fn is_empty(&self) -> bool {
        self.uuid.is_none() && self.fs_type.is_none() && self.label.is_none()
    }
}

// =============================================================================
// Attribute Source Port
// =============================================================================

/// Port for filesystem identification
pub trait AttributeSource: Send + Sync {
    /// Identify the filesystem on a device
    fn lookup(&self, device: &dyn BlockDevice) -> Result<Attributes>;
}
