//! Infrastructure - configuration, durable state, process plumbing
//!
//! This module contains infrastructure concerns:
//! - `config` - device identity configuration (JSON loading, validation)
//! - `state` - activation flag and heartbeat failure counter, marker-backed
//! - `pid` - PID file guard for process supervision

pub mod config;
pub mod pid;
pub mod state;

// Re-export commonly used types
pub use config::{ConfigError, DeviceConfig, Identity};
pub use pid::PidFile;
pub use state::DeviceState;
