//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `netcheck` - TCP connectivity probe against public DNS resolvers
//! - `backend` - HTTPS client for the activation/heartbeat/scan API
//! - `reader` - serial RFID reader transport and UID response parsing
//! - `sysinfo` - best-effort host IP/MAC gathering for registration

pub mod backend;
pub mod netcheck;
pub mod reader;
pub mod sysinfo;

// Re-export commonly used types
pub use backend::{ActivationRequest, BackendApi, BackendError, HttpBackend};
pub use netcheck::wait_for_network;
pub use reader::{ReaderError, ReaderPort, ScanOutcome, SerialReader};
pub use sysinfo::SystemInfo;
