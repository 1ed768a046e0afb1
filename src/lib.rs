//! Block Device Inventory
//!
//! Enumerates the block devices of a Linux host from sysfs, classifies each
//! one by origin, and looks up filesystem attributes through blkid. Nothing
//! here touches device contents; it only reads kernel metadata.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Device Registry                         │
//! │       discover_all() / discover_from_names() -> Devices        │
//! ├───────────────────────────────┬────────────────────────────────┤
//! │         Device Model          │       Device Classifier        │
//! │   name, size = sectors * 512  │   md -> dm -> device markers   │
//! ├───────────────────────────────┴────────────────────────────────┤
//! │                  Sysfs Tree (/sys/block/<name>)                │
//! └────────────────────────────────────────────────────────────────┘
//!
//! ┌────────────────────────────────────────────────────────────────┐
//! │        Attribute Lookup (blkid -o export /dev/<name>)          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hardware`]: Sysfs discovery, classification, registry, and blkid
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod domain;
pub mod error;
pub mod hardware;

// Re-export commonly used types
pub use domain::ports::{
    AttributeSource, Attributes, BlockDevice, DeviceCategory, DEVICE_NODE_PREFIX,
};

pub use error::{Error, ErrorKind, Result};

pub use hardware::{
    classify, parse_export, Blkid, BlkidConfig, Device, DeviceRegistry, DeviceReport, Devices,
    InventoryReport, RegistryConfig, SysfsTree, MARKER_RULES, SECTOR_SIZE_BYTES,
    SYSFS_BLOCK_ROOT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
