//! Shared types for the RFID agent

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reported signal strength for every event. The UID-only reader protocol
/// carries no RSSI, so the backend receives a fixed nominal value.
pub const DEFAULT_SIGNAL_STRENGTH: i32 = -50;

/// Current time as unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Presence transition kind, serialized as the backend wire name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagEventType {
    Detected,
    Removed,
}

impl TagEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagEventType::Detected => "detected",
            TagEventType::Removed => "removed",
        }
    }
}

impl std::fmt::Display for TagEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tag presence transition, immutable once created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidEvent {
    pub tag_id: String,
    pub event: TagEventType,
    pub signal_strength: i32,
    pub timestamp: u64,
}

impl RfidEvent {
    pub fn new(tag_id: &str, event: TagEventType) -> Self {
        Self {
            tag_id: tag_id.to_string(),
            event,
            signal_strength: DEFAULT_SIGNAL_STRENGTH,
            timestamp: unix_now(),
        }
    }
}

/// A failed report held for retry. `enqueued_at` is the original enqueue
/// time and is never re-armed across retry cycles.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    pub tag_id: String,
    pub event: TagEventType,
    pub enqueued_at: u64,
}

/// Single-slot tag tracking state. At most one tag is tracked at a time;
/// `None` means no card present.
#[derive(Debug, Default)]
pub struct TagPresence {
    last_tag: Option<String>,
}

impl TagPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently tracked tag, if any
    pub fn current(&self) -> Option<&str> {
        self.last_tag.as_deref()
    }

    /// Fold one reader observation into the tracking state.
    ///
    /// Edge-triggered: an event is produced only on a presence transition,
    /// never while the same tag stays in range or the slot stays empty.
    pub fn observe(&mut self, seen: Option<&str>) -> Option<(String, TagEventType)> {
        match seen {
            Some(uid) => {
                if self.last_tag.as_deref() == Some(uid) {
                    return None;
                }
                self.last_tag = Some(uid.to_string());
                Some((uid.to_string(), TagEventType::Detected))
            }
            None => self.last_tag.take().map(|tag| (tag, TagEventType::Removed)),
        }
    }

    /// Conservatively reset to "no card", returning the tag that was
    /// tracked. Used when a reader fault makes the true state unknown.
    pub fn clear(&mut self) -> Option<String> {
        self.last_tag.take()
    }
}
