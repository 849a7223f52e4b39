//! Activation state backed by a durable marker file
//!
//! The marker is a zero-byte file whose existence encodes "activated"
//! across process restarts. The in-memory flag and the marker are always
//! changed together so the two never disagree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::info;

pub const DEFAULT_MARKER_PATH: &str = "/etc/rfid-agent/.activated";

/// Shared activation state: written by the activation routine and the
/// heartbeat monitor, read by both runtime loops.
pub struct DeviceState {
    activated: AtomicBool,
    heartbeat_failures: AtomicU32,
    marker: PathBuf,
}

impl DeviceState {
    /// A pre-existing marker means the device starts activated without
    /// contacting the backend.
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        let marker = marker.into();
        let activated = marker.exists();
        if activated {
            info!(marker = %marker.display(), "activation_marker_found");
        }
        Self {
            activated: AtomicBool::new(activated),
            heartbeat_failures: AtomicU32::new(0),
            marker,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    /// Write the durable marker, then flip the flag
    pub fn mark_activated(&self) -> io::Result<()> {
        fs::File::create(&self.marker)?;
        self.activated.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Drop back to unactivated: flip the flag, delete the marker and
    /// reset the failure counter. Does not re-run activation; the device
    /// re-activates on the next process start.
    pub fn force_unactivated(&self) -> io::Result<()> {
        self.activated.store(false, Ordering::SeqCst);
        self.heartbeat_failures.store(0, Ordering::SeqCst);
        match fs::remove_file(&self.marker) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Record one heartbeat failure, returning the new consecutive count
    pub fn record_heartbeat_failure(&self) -> u32 {
        self.heartbeat_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_heartbeat_failures(&self) {
        self.heartbeat_failures.store(0, Ordering::SeqCst);
    }

    pub fn heartbeat_failures(&self) -> u32 {
        self.heartbeat_failures.load(Ordering::SeqCst)
    }
}
