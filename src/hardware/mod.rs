//! Hardware Module
//!
//! Provides block device discovery, classification, registry, and
//! filesystem identification.

pub mod discovery;
pub mod classification;
pub mod registry;
pub mod identify;

pub use discovery::*;
pub use classification::*;
pub use registry::*;
pub use identify::*;
