//! Device Registry Module
//!
//! Whole-host and by-name discovery passes, the collections they return,
//! and serializable inventory reports.

pub mod collection;
pub mod device_registry;
pub mod report;

pub use collection::*;
pub use device_registry::*;
pub use report::*;
