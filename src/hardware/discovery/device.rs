//! Block Device Model
//!
//! A point-in-time snapshot of one `/sys/block` entry: base name, byte size,
//! and category.

use crate::domain::ports::{BlockDevice, DeviceCategory, DEVICE_NODE_PREFIX};
use crate::error::{Error, Result};
use crate::hardware::classification::classify;
use crate::hardware::discovery::sysfs::{SysfsTree, SECTOR_SIZE_BYTES, SIZE_ATTR};
use serde::Serialize;
use tracing::trace;

/// A block device discovered from sysfs
///
/// Immutable once built; probe again to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Device {
    name: String,
    size: u64,
    category: DeviceCategory,
}

impl Device {
    /// Probe a device in `/sys/block`
    ///
    /// Accepts a bare name (`sda`) or any path ending in it (`/dev/sda`).
    pub fn probe(name_or_path: &str) -> Result<Self> {
        Self::probe_in(&SysfsTree::default(), name_or_path)
    }

    /// Probe a device in the given sysfs tree
    pub fn probe_in(tree: &SysfsTree, name_or_path: &str) -> Result<Self> {
        let (name, entry) = tree.resolve(name_or_path)?;

        let sectors = tree.read_sectors(&entry)?;
        let size = sectors.checked_mul(SECTOR_SIZE_BYTES).ok_or_else(|| Error::Parse {
            origin: entry.join(SIZE_ATTR).display().to_string(),
            content: sectors.to_string(),
            reason: "sector count overflows a 64-bit byte size".to_string(),
        })?;

        let category = classify(&entry)?;

        trace!("Probed {}: {} bytes, {}", name, size, category);
        Ok(Self {
            name,
            size,
            category,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_sectors(name: &str, sectors: u64, category: DeviceCategory) -> Self {
        Self {
            name: name.to_string(),
            size: sectors * SECTOR_SIZE_BYTES,
            category,
        }
    }

    /// Base name, e.g. `sda`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity in bytes, always a multiple of 512
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sectors(&self) -> u64 {
        self.size / SECTOR_SIZE_BYTES
    }

    pub fn category(&self) -> DeviceCategory {
        self.category
    }

    /// Device node path, e.g. `/dev/sda`
    pub fn device_path(&self) -> String {
        format!("{}/{}", DEVICE_NODE_PREFIX, self.name)
    }
}

impl BlockDevice for Device {
    fn device_path(&self) -> String {
        Device::device_path(self)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", DEVICE_NODE_PREFIX, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    fn add_device(root: &std::path::Path, name: &str, size: &str, markers: &[&str]) {
        let entry = root.join(name);
        fs::create_dir(&entry).unwrap();
        fs::write(entry.join(SIZE_ATTR), size).unwrap();
        for marker in markers {
            fs::create_dir(entry.join(marker)).unwrap();
        }
    }

    #[test]
    fn test_probe_disk() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "sda", "1953525168\n", &["device"]);
        let tree = SysfsTree::new(tmp.path());

        let device = Device::probe_in(&tree, "sda").unwrap();

        assert_eq!(device.name(), "sda");
        assert_eq!(device.size(), 1953525168 * 512);
        assert_eq!(device.sectors(), 1953525168);
        assert_eq!(device.category(), DeviceCategory::Disk);
        assert_eq!(device.device_path(), "/dev/sda");
        assert_eq!(device.to_string(), "/dev/sda");
    }

    #[test]
    fn test_probe_size_is_sectors_times_512() {
        let tmp = TempDir::new().unwrap();
        let tree = SysfsTree::new(tmp.path());

        for (i, sectors) in [0u64, 1, 7, 2048, 1 << 40].iter().enumerate() {
            let name = format!("loop{}", i);
            add_device(tmp.path(), &name, &format!("{}\n", sectors), &[]);

            let device = Device::probe_in(&tree, &name).unwrap();
            assert_eq!(device.size(), sectors * 512);
            assert_eq!(device.size() % 512, 0);
            assert_eq!(device.category(), DeviceCategory::Unknown);
        }
    }

    #[test]
    fn test_probe_prefix_is_ignored() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "sda", "100\n", &["device"]);
        let tree = SysfsTree::new(tmp.path());

        let bare = Device::probe_in(&tree, "sda").unwrap();
        let prefixed = Device::probe_in(&tree, "/dev/sda").unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!(prefixed.name(), "sda");
    }

    #[test]
    fn test_probe_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let tree = SysfsTree::new(tmp.path());

        let err = Device::probe_in(&tree, "/dev/sdz").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_probe_raid_with_device_marker() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "md0", "4096\n", &["md", "device"]);
        let tree = SysfsTree::new(tmp.path());

        let device = Device::probe_in(&tree, "md0").unwrap();
        assert_eq!(device.category(), DeviceCategory::Raid);
    }

    #[test]
    fn test_probe_bad_size() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "dm-1", "lots\n", &["dm"]);
        let tree = SysfsTree::new(tmp.path());

        let err = Device::probe_in(&tree, "dm-1").unwrap_err();
        assert_matches!(err, Error::Parse { ref content, .. } if content == "lots\n");
    }

    #[test]
    fn test_probe_size_overflow() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "sda", &format!("{}\n", u64::MAX), &["device"]);
        let tree = SysfsTree::new(tmp.path());

        let err = Device::probe_in(&tree, "sda").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_probe_missing_size_is_io() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sda")).unwrap();
        let tree = SysfsTree::new(tmp.path());

        let err = Device::probe_in(&tree, "sda").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_device_serde() {
        let device = Device::from_sectors("dm-0", 8, DeviceCategory::DeviceMapper);
        let json = serde_json::to_value(&device).unwrap();

        assert_eq!(json["name"], "dm-0");
        assert_eq!(json["size"], 4096);
        assert_eq!(json["category"], "device-mapper");
    }
}
