//! Domain models - core RFID event types
//!
//! This module contains the canonical data types used throughout the agent:
//! - `TagEventType` - classification of a presence transition
//! - `RfidEvent` - a reportable tag event with timestamp and signal strength
//! - `QueuedEvent` - a failed report retained for retry
//! - `TagPresence` - single-slot tag tracking with edge-triggered transitions

pub mod types;

// Re-export commonly used types
pub use types::{unix_now, QueuedEvent, RfidEvent, TagEventType, TagPresence};
