//! Services - runtime state machine and loops
//!
//! This module contains the core agent logic:
//! - `activation` - one-time registration with bounded retry
//! - `scanner` - tag presence polling loop with edge-triggered events
//! - `dispatcher` - event delivery with bounded-age retry queue
//! - `heartbeat` - liveness attestation and failure escalation

pub mod activation;
pub mod dispatcher;
pub mod heartbeat;
pub mod scanner;

// Re-export commonly used types
pub use activation::{ensure_activated, ActivationError};
pub use dispatcher::EventDispatcher;
pub use heartbeat::HeartbeatMonitor;
pub use scanner::TagScanner;
