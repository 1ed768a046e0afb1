//! Error types for block device inventory
//!
//! Provides structured error types for sysfs discovery, classification,
//! and filesystem identification.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the inventory
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Discovery Errors
    // =========================================================================
    #[error("Device does not exist: {}", path.display())]
    DeviceNotFound { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create device {name}: {source}")]
    Discovery {
        name: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Parse error in {origin}: {reason} (content: {content:?})")]
    Parse {
        origin: String,
        content: String,
        reason: String,
    },

    // =========================================================================
    // Identification Tool Errors
    // =========================================================================
    #[error("{program} failed for {device}: {}", describe_status(*status, stderr))]
    ExternalTool {
        program: String,
        device: String,
        status: Option<i32>,
        stderr: String,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_status(status: Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    match (status, stderr.is_empty()) {
        (Some(code), true) => format!("exit status {}", code),
        (Some(code), false) => format!("exit status {}: {}", code, stderr),
        (None, true) => "terminated without exit status".to_string(),
        (None, false) => stderr.to_string(),
    }
}

/// Error category, independent of any context wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Io,
    Parse,
    ExternalTool,
    Configuration,
    Internal,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Category of the underlying failure, looking through `Discovery` context
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DeviceNotFound { .. } => ErrorKind::NotFound,
            Error::Io { .. } => ErrorKind::Io,
            Error::Discovery { source, .. } => source.kind(),
            Error::Parse { .. } => ErrorKind::Parse,
            Error::ExternalTool { .. } => ErrorKind::ExternalTool,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error may clear up on a later attempt
    ///
    /// The library never retries; this is a hint for callers that do.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io | ErrorKind::ExternalTool)
    }

    /// Name of the device that failed during a registry pass, if known
    pub fn device_name(&self) -> Option<&str> {
        match self {
            Error::Discovery { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Result type alias for the inventory
pub type Result<T> = std::result::Result<T, Error>;
