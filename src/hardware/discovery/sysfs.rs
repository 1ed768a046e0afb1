//! Sysfs Block Tree
//!
//! Read-only access to `/sys/block`: one directory per device, with marker
//! children whose existence signals subsystem membership. Every helper here
//! separates "absent" from "could not tell", since the tree changes under us
//! while devices come and go.

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

// =============================================================================
// Constants
// =============================================================================

/// Root of the per-device metadata entries
pub const SYSFS_BLOCK_ROOT: &str = "/sys/block";

/// Sysfs reports capacity in 512-byte sectors regardless of the device's
/// logical block size
pub const SECTOR_SIZE_BYTES: u64 = 512;

/// Attribute holding the sector count
pub const SIZE_ATTR: &str = "size";

// =============================================================================
// Sysfs Tree
// =============================================================================

/// A sysfs block root, `/sys/block` unless pointed elsewhere for testing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsTree {
    root: PathBuf,
}

impl Default for SysfsTree {
    fn default() -> Self {
        Self::new(SYSFS_BLOCK_ROOT)
    }
}

impl SysfsTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a device name or path to its base name and sysfs entry
    ///
    /// Only the final path component counts, so `/dev/sda` and `sda` resolve
    /// to the same entry.
    pub fn resolve(&self, name_or_path: &str) -> Result<(String, PathBuf)> {
        let name = match Path::new(name_or_path).file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                return Err(Error::DeviceNotFound {
                    path: self.root.join(name_or_path),
                })
            }
        };

        let entry = self.root.join(&name);
        if !exists(&entry)? {
            return Err(Error::DeviceNotFound { path: entry });
        }

        Ok((name, entry))
    }

    /// List the device names under the root, in directory order
    ///
    /// A name that is not UTF-8 fails the listing rather than being mangled
    /// into one that no longer resolves.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| Error::io(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            let name = entry.file_name().into_string().map_err(|raw| Error::Parse {
                origin: self.root.display().to_string(),
                content: format!("{:?}", raw),
                reason: "device name is not valid UTF-8".to_string(),
            })?;
            names.push(name);
        }

        trace!("Listed {} entries under {}", names.len(), self.root.display());
        Ok(names)
    }

    /// Read a sysfs attribute of a device entry
    pub fn read_attr(&self, entry: &Path, attr: &str) -> Result<String> {
        let path = entry.join(attr);
        fs::read_to_string(&path).map_err(|e| Error::io(path, e))
    }

    /// Read the sector count of a device entry
    ///
    /// The attribute is an unsigned decimal integer, digits only, with at most
    /// one trailing newline.
    /// A missing attribute is an IO error even though the entry itself was
    /// found: the device vanished between the two reads.
    pub fn read_sectors(&self, entry: &Path) -> Result<u64> {
        let raw = self.read_attr(entry, SIZE_ATTR)?;
        let digits = raw.strip_suffix('\n').unwrap_or(&raw);
        let parse_error = |reason: String| Error::Parse {
            origin: entry.join(SIZE_ATTR).display().to_string(),
            content: raw.clone(),
            reason,
        };

        // u64::from_str also takes a leading '+'
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_error("expected a decimal sector count".to_string()));
        }

        digits.parse::<u64>().map_err(|e| parse_error(e.to_string()))
    }
}

// =============================================================================
// Existence Checks
// =============================================================================

/// Check whether a path exists
///
/// Only a plain "not found" counts as absence. A dangling symlink is
/// reported as an IO error, as is anything else that prevents the answer
/// (permissions, transient faults).
pub fn exists(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::symlink_metadata(path) {
            Ok(_) => Err(Error::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "broken symlink"),
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        },
        Err(e) => Err(Error::io(path, e)),
    }
}
