//! blkid Identification
//!
//! Reads filesystem UUID, type and label by running `blkid -o export` and
//! parsing its `KEY=VALUE` lines.

use crate::domain::ports::{AttributeSource, Attributes, BlockDevice};
use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// =============================================================================
// Constants
// =============================================================================

const ATTRIBUTE_UUID_KEY: &str = "UUID";
const ATTRIBUTE_TYPE_KEY: &str = "TYPE";
const ATTRIBUTE_LABEL_KEY: &str = "LABEL";

/// How often a running blkid is checked against its deadline
const DEADLINE_POLL_INTERVAL: Duration = Duration::from_millis(10);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the blkid adapter
#[derive(Debug, Clone)]
pub struct BlkidConfig {
    /// Program to run, looked up on `PATH` when not absolute
    pub program: PathBuf,

    /// Kill blkid if it runs longer than this
    pub timeout: Option<Duration>,
}

impl Default for BlkidConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("blkid"),
            timeout: None,
        }
    }
}

// =============================================================================
// blkid Adapter
// =============================================================================

/// Runs blkid against device nodes
#[derive(Debug, Clone)]
pub struct Blkid {
    config: BlkidConfig,
}

impl Blkid {
    pub fn new(config: BlkidConfig) -> Self {
        Self { config }
    }

    pub fn default_blkid() -> Self {
        Self::new(BlkidConfig::default())
    }

    pub fn program(&self) -> &Path {
        &self.config.program
    }

    /// Identify the filesystem on a device
    ///
    /// blkid's stderr is forwarded to ours as-is. A non-zero exit, including
    /// blkid's "nothing found" status, is an error. With a timeout configured,
    /// a blkid still running at the deadline is killed and reported as an
    /// `ExternalTool` error without an exit status.
    pub fn lookup(&self, device: &dyn BlockDevice) -> Result<Attributes> {
        let device_path = device.device_path();
        let program = self.config.program.display().to_string();
        let tool_error = |status: Option<i32>, stderr: String| Error::ExternalTool {
            program: program.clone(),
            device: device_path.clone(),
            status,
            stderr,
        };

        debug!("Running {} -o export {}", program, device_path);
        let child = Command::new(&self.config.program)
            .args(["-o", "export"])
            .arg(&device_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tool_error(None, e.to_string()))?;

        let output = match self.config.timeout {
            Some(timeout) => wait_with_deadline(child, timeout)
                .map_err(|e| tool_error(None, e.to_string()))?
                .ok_or_else(|| {
                    warn!("Killed {} on {} after {:?}", program, device_path, timeout);
                    tool_error(None, format!("timed out after {:?}", timeout))
                })?,
            None => child
                .wait_with_output()
                .map_err(|e| tool_error(None, e.to_string()))?,
        };

        if !output.stderr.is_empty() {
            let _ = std::io::stderr().write_all(&output.stderr);
        }

        if !output.status.success() {
            return Err(tool_error(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let stdout = decode_output(&device_path, output.stdout)?;
        parse_export(&device_path, &stdout)
    }

    /// Check if the configured program can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for Blkid {
    fn default() -> Self {
        Self::default_blkid()
    }
}

impl AttributeSource for Blkid {
    fn lookup(&self, device: &dyn BlockDevice) -> Result<Attributes> {
        Blkid::lookup(self, device)
    }
}

/// Wait for `child` until `timeout` elapses, killing it at the deadline
///
/// Returns `Ok(None)` when the child was killed. The pipes are drained on
/// helper threads so a chatty child cannot stall on a full pipe; on timeout
/// those threads are detached since a grandchild may still hold the pipes.
fn wait_with_deadline(mut child: Child, timeout: Duration) -> std::io::Result<Option<Output>> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(DEADLINE_POLL_INTERVAL);
    };

    Ok(Some(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    }))
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

// =============================================================================
// Export Format Parsing
// =============================================================================

/// Decode blkid's stdout, refusing bytes that are not UTF-8
fn decode_output(origin: &str, stdout: Vec<u8>) -> Result<String> {
    String::from_utf8(stdout).map_err(|e| Error::Parse {
        origin: origin.to_string(),
        content: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        reason: format!("output is not valid UTF-8: {}", e.utf8_error()),
    })
}

/// Parse `blkid -o export` output
///
/// Each non-empty line is split on its first `=`. Unknown keys are skipped;
/// a line without `=` fails the whole parse so a truncated listing is never
/// mistaken for a complete one. `origin` names the device in errors.
pub fn parse_export(origin: &str, output: &str) -> Result<Attributes> {
    let mut attrs = Attributes::default();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| Error::Parse {
            origin: origin.to_string(),
            content: line.to_string(),
            reason: "expected KEY=VALUE".to_string(),
        })?;

        match key {
            ATTRIBUTE_UUID_KEY => attrs.uuid = Some(value.to_string()),
            ATTRIBUTE_TYPE_KEY => attrs.fs_type = Some(value.to_string()),
            ATTRIBUTE_LABEL_KEY => attrs.label = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_export() {
        let attrs = parse_export("/dev/sda1", "UUID=abc-123\nTYPE=ext4\n").unwrap();

        assert_eq!(attrs.uuid.as_deref(), Some("abc-123"));
        assert_eq!(attrs.fs_type.as_deref(), Some("ext4"));
        assert_eq!(attrs.label, None);
    }

    #[test]
    fn test_parse_export_full_listing() {
        let output = "DEVNAME=/dev/sda1\n\
                      LABEL=data=archive\n\
                      UUID=3e6be9de-8139-11d1-9106-a43f08d823a6\n\
                      BLOCK_SIZE=4096\n\
                      TYPE=xfs\n\
                      PARTUUID=5f2a7c11-01\n";

        let attrs = parse_export("/dev/sda1", output).unwrap();

        assert_eq!(attrs.uuid.as_deref(), Some("3e6be9de-8139-11d1-9106-a43f08d823a6"));
        assert_eq!(attrs.fs_type.as_deref(), Some("xfs"));
        // Only the first '=' separates
        assert_eq!(attrs.label.as_deref(), Some("data=archive"));
    }

    #[test]
    fn test_parse_export_empty_value_is_present() {
        let attrs = parse_export("/dev/sdb", "LABEL=\nTYPE=vfat").unwrap();
        assert_eq!(attrs.label.as_deref(), Some(""));
        assert_eq!(attrs.uuid, None);
    }

    #[test]
    fn test_parse_export_empty_output() {
        let attrs = parse_export("/dev/sdb", "").unwrap();
        assert!(attrs.is_empty());

        let attrs = parse_export("/dev/sdb", "\n\n").unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_parse_export_malformed_line() {
        let err = parse_export("/dev/sdc", "UUID=abc-123\ngarbage\nTYPE=ext4\n").unwrap_err();

        assert_matches!(err, Error::Parse { ref origin, ref content, .. }
            if origin == "/dev/sdc" && content == "garbage");
    }

    #[test]
    fn test_decode_output_rejects_invalid_utf8() {
        let err = decode_output("/dev/sdd1", b"TYPE=vfat\nLABEL=\xffDATA\n".to_vec()).unwrap_err();

        assert_matches!(err, Error::Parse { ref origin, ref content, ref reason }
            if origin == "/dev/sdd1"
                && content.contains("LABEL=\u{FFFD}DATA")
                && reason.contains("UTF-8"));
    }

    #[test]
    fn test_blkid_config_defaults() {
        let blkid = Blkid::default();
        assert_eq!(blkid.program(), Path::new("blkid"));
        assert_eq!(blkid.config.timeout, None);
    }

    #[test]
    fn test_lookup_missing_program() {
        let blkid = Blkid::new(BlkidConfig {
            program: PathBuf::from("/nonexistent/blkid-for-tests"),
            ..Default::default()
        });

        let err = blkid.lookup(&"sda").unwrap_err();
        assert_matches!(err, Error::ExternalTool { status: None, ref device, .. }
            if device == "/dev/sda");
        assert!(!blkid.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_lookup_runs_tool() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        // All scripts are written before any is run, so no script is still
        // open for writing when a child is spawned.
        let tmp = TempDir::new().unwrap();
        let write_script = |name: &str, body: &str| {
            let path = tmp.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        };

        let ok = write_script("ok", r#"printf 'UUID=abc-123\nTYPE=ext4\nLABEL=%s\n' "$3""#);
        let failing = write_script("failing", "echo 'no filesystem found' >&2\nexit 2");
        let truncated = write_script("truncated", "printf 'UUID=abc-123\\nTYP'");
        let latin1 = write_script("latin1", r"printf 'TYPE=vfat\nLABEL=\351t\351\n'");
        let hung = write_script("hung", "exec sleep 30");

        let tool = |program: PathBuf| {
            Blkid::new(BlkidConfig {
                program,
                timeout: Some(Duration::from_secs(10)),
            })
        };

        let blkid = tool(ok);
        let attrs = blkid.lookup(&"sdb").unwrap();
        assert_eq!(attrs.uuid.as_deref(), Some("abc-123"));
        assert_eq!(attrs.fs_type.as_deref(), Some("ext4"));
        // The script echoes its device argument back as the label
        assert_eq!(attrs.label.as_deref(), Some("/dev/sdb"));

        // Full paths outside /dev/<name> reach the tool unchanged
        let attrs = blkid.lookup(&"/dev/mapper/root").unwrap();
        assert_eq!(attrs.label.as_deref(), Some("/dev/mapper/root"));

        let source: &dyn AttributeSource = &tool(failing);
        let err = source.lookup(&"/dev/sdb").unwrap_err();
        assert_matches!(err, Error::ExternalTool { status: Some(2), ref stderr, .. }
            if stderr.contains("no filesystem found"));
        assert!(err.is_transient());

        let err = tool(truncated).lookup(&"sdb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = tool(latin1).lookup(&"sdb").unwrap_err();
        assert_matches!(err, Error::Parse { ref origin, .. } if origin == "/dev/sdb");

        let blkid = Blkid::new(BlkidConfig {
            program: hung,
            timeout: Some(Duration::from_millis(200)),
        });
        let started = Instant::now();
        let err = blkid.lookup(&"sdb").unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_matches!(err, Error::ExternalTool { status: None, ref stderr, .. }
            if stderr.contains("timed out"));
    }
}
