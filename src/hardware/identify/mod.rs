//! Filesystem Identification Module
//!
//! Looks up filesystem UUID, type and label through blkid.

pub mod blkid;

pub use blkid::*;
