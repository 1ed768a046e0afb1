//! Domain layer - Core types and port definitions
//!
//! This module defines the device category, the block device identity
//! trait, and the attribute port that identification adapters implement.

pub mod ports;

pub use ports::*;
