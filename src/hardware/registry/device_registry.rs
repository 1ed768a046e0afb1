//! Device Registry
//!
//! Builds device collections from `/sys/block`. Every pass is all-or-nothing:
//! the first device that fails to probe aborts the pass, and the error names
//! that device.

use crate::error::{Error, Result};
use crate::hardware::discovery::{Device, SysfsTree, SYSFS_BLOCK_ROOT};
use crate::hardware::registry::Devices;
use std::path::PathBuf;
use tracing::debug;

// =============================================================================
// Registry Configuration
// =============================================================================

/// Configuration for the device registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Path to the sysfs block root (for testing)
    pub sysfs_block_root: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sysfs_block_root: PathBuf::from(SYSFS_BLOCK_ROOT),
        }
    }
}

// =============================================================================
// Device Registry
// =============================================================================

/// Discovers block devices
///
/// Holds no state between passes; every call reads sysfs afresh.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    tree: SysfsTree,
}

impl DeviceRegistry {
    /// Create a new registry
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            tree: SysfsTree::new(config.sysfs_block_root),
        }
    }

    /// Create a registry over `/sys/block`
    pub fn default_registry() -> Self {
        Self::new(RegistryConfig::default())
    }

    pub fn tree(&self) -> &SysfsTree {
        &self.tree
    }

    /// Discover every device under the sysfs root
    ///
    /// Devices come back in directory listing order, which is not sorted.
    pub fn discover_all(&self) -> Result<Devices> {
        let names = self.tree.list_names()?;
        debug!(
            "Found {} entries under {}",
            names.len(),
            self.tree.root().display()
        );

        self.discover_from_names(&names)
    }

    /// Discover the named devices, in the order given
    ///
    /// Names may be bare (`sda`) or carry any prefix (`/dev/sda`). Duplicates
    /// are kept.
    pub fn discover_from_names<I, S>(&self, names: I) -> Result<Devices>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names.into_iter();
        let mut devices = Devices::with_capacity(names.size_hint().0);

        for name in names {
            devices.push(self.probe(name.as_ref())?);
        }

        debug!("Discovered {} block devices", devices.len());
        Ok(devices)
    }

    /// Probe a single device, tagging any failure with its name
    pub fn probe(&self, name: &str) -> Result<Device> {
        Device::probe_in(&self.tree, name).map_err(|e| Error::Discovery {
            name: name.to_string(),
            source: Box::new(e),
        })
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::default_registry()
    }
}
