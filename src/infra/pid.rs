//! PID file guard for process supervision
//!
//! Written at startup, removed on drop. Failure to write is non-fatal;
//! the supervisor just loses the convenience lookup.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_PID_PATH: &str = "/run/rfid-agent.pid";

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn create(path: &Path) -> Option<Self> {
        match fs::write(path, std::process::id().to_string()) {
            Ok(()) => {
                debug!(path = %path.display(), "pid_file_written");
                Some(Self { path: path.to_path_buf() })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "pid_file_write_failed");
                None
            }
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "pid_file_remove_failed");
        }
    }
}
