//! Hardware Classification Module
//!
//! Classifies block devices by origin: physical disk, software RAID,
//! device-mapper, or unknown.

pub mod classifier;

pub use classifier::*;
