//! Device Collections
//!
//! The ordered result of a discovery pass.

use crate::domain::ports::DeviceCategory;
use crate::hardware::discovery::Device;
use serde::Serialize;
use std::ops::Deref;

/// An ordered sequence of devices
///
/// Renders as the device node paths joined by single spaces, in the
/// collection's current order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Devices(Vec<Device>);

impl Devices {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, device: Device) {
        self.0.push(device);
    }

    /// Ascending by size; equal sizes keep their relative order
    pub fn sorted_by_size(&self) -> Devices {
        let mut sorted = self.clone();
        sorted.sort_by_size();
        sorted
    }

    /// Sort in place, ascending by size (stable)
    pub fn sort_by_size(&mut self) {
        self.0.sort_by_key(Device::size);
    }

    /// Devices of one category, in collection order
    pub fn with_category(&self, category: DeviceCategory) -> Devices {
        self.0
            .iter()
            .filter(|d| d.category() == category)
            .cloned()
            .collect()
    }

    /// Device node paths in collection order
    pub fn device_paths(&self) -> Vec<String> {
        self.0.iter().map(Device::device_path).collect()
    }

    /// Sum of all sizes in bytes, saturating at `u64::MAX`
    pub fn total_size(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, d| acc.saturating_add(d.size()))
    }

    pub fn into_inner(self) -> Vec<Device> {
        self.0
    }
}

impl Deref for Devices {
    type Target = [Device];

    fn deref(&self) -> &[Device] {
        &self.0
    }
}

impl From<Vec<Device>> for Devices {
    fn from(devices: Vec<Device>) -> Self {
        Self(devices)
    }
}

impl FromIterator<Device> for Devices {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Devices {
    type Item = Device;
    type IntoIter = std::vec::IntoIter<Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Devices {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for Devices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.device_paths().join(" "))
    }
}
