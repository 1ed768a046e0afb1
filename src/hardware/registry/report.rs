//! Inventory Reports
//!
//! Serializable snapshot of a discovery pass, optionally with filesystem
//! attributes for each device.

use crate::domain::ports::{Attributes, DeviceCategory};
use crate::hardware::discovery::Device;
use crate::hardware::registry::Devices;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;

/// One device in a report
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub name: String,
    pub device_path: String,
    pub size_bytes: u64,
    pub category: DeviceCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl DeviceReport {
    pub fn new(device: &Device, attributes: Option<Attributes>) -> Self {
        Self {
            name: device.name().to_string(),
            device_path: device.device_path(),
            size_bytes: device.size(),
            category: device.category(),
            attributes,
        }
    }
}

/// Inventory of one host at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub hostname: String,
    pub discovered_at: DateTime<Utc>,
    pub total_size_bytes: u64,
    pub devices: Vec<DeviceReport>,
}

impl InventoryReport {
    /// Build a report without attributes
    pub fn new(hostname: impl Into<String>, devices: &Devices) -> Self {
        Self::with_attributes(hostname, devices, Vec::new())
    }

    /// Build a report pairing each device with its attributes by position
    ///
    /// Devices past the end of `attributes` get none.
    pub fn with_attributes(
        hostname: impl Into<String>,
        devices: &Devices,
        attributes: Vec<Option<Attributes>>,
    ) -> Self {
        let mut attributes = attributes.into_iter();
        let devices: Vec<DeviceReport> = devices
            .iter()
            .map(|d| DeviceReport::new(d, attributes.next().flatten()))
            .collect();

        Self {
            hostname: hostname.into(),
            discovered_at: Utc::now(),
            total_size_bytes: devices_total(&devices),
            devices,
        }
    }
}

fn devices_total(devices: &[DeviceReport]) -> u64 {
    devices
        .iter()
        .fold(0u64, |acc, d| acc.saturating_add(d.size_bytes))
}

/// Get the local hostname
pub fn local_hostname() -> String {
    // Try /etc/hostname first
    if let Ok(hostname) = fs::read_to_string("/etc/hostname") {
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            return hostname.to_string();
        }
    }

    // Fall back to hostname command
    #[cfg(unix)]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("hostname").output() {
            let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if output.status.success() && !hostname.is_empty() {
                return hostname;
            }
        }
    }

    "unknown".to_string()
}
