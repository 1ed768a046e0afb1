//! Hardware Discovery Module
//!
//! Reads block devices from the sysfs block tree and builds device
//! snapshots from it.

pub mod sysfs;
pub mod device;

pub use sysfs::*;
pub use device::*;
