//! Event delivery with bounded-age retry
//!
//! Delivery is at-least-once within a 300 second window: a failed POST
//! enqueues the event, and retries happen only after a successful
//! heartbeat so retry traffic never storms the backend during an outage.
//! The queue is bounded; when full, the oldest entry is evicted.

use crate::domain::{unix_now, QueuedEvent, RfidEvent, TagEventType};
use crate::infra::DeviceState;
use crate::io::backend::BackendApi;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entries older than this (from original enqueue time) are dropped
pub const RETRY_TTL_SECS: u64 = 300;
/// Queue bound; caps memory during prolonged outages
const QUEUE_CAPACITY: usize = 256;

pub struct EventDispatcher {
    backend: Arc<dyn BackendApi>,
    state: Arc<DeviceState>,
    queue: Mutex<VecDeque<QueuedEvent>>,
}

impl EventDispatcher {
    pub fn new(backend: Arc<dyn BackendApi>, state: Arc<DeviceState>) -> Self {
        Self { backend, state, queue: Mutex::new(VecDeque::new()) }
    }

    /// Fire-and-forget delivery. Events produced before activation are
    /// discarded, not queued; the reporting window has already passed.
    pub async fn deliver(&self, tag_id: &str, event: TagEventType) {
        self.send_or_requeue(tag_id, event, None).await;
    }

    /// Drain the queue, dropping aged-out entries and re-delivering the
    /// rest. Entries that fail again re-enter the queue with their
    /// original enqueue time.
    pub async fn retry_all(&self) {
        let pending: Vec<QueuedEvent> = {
            let mut queue = self.queue.lock();
            queue.drain(..).collect()
        };
        if pending.is_empty() {
            return;
        }

        let now = unix_now();
        for entry in pending {
            if now.saturating_sub(entry.enqueued_at) >= RETRY_TTL_SECS {
                debug!(
                    tag_id = %entry.tag_id,
                    event = entry.event.as_str(),
                    "queued_event_expired"
                );
                continue;
            }
            info!(
                tag_id = %entry.tag_id,
                event = entry.event.as_str(),
                "retrying_rfid_event"
            );
            self.send_or_requeue(&entry.tag_id, entry.event, Some(entry.enqueued_at)).await;
        }
    }

    pub fn queued_len(&self) -> usize {
        self.queue.lock().len()
    }

    async fn send_or_requeue(&self, tag_id: &str, event: TagEventType, enqueued_at: Option<u64>) {
        if !self.state.is_activated() {
            warn!(
                tag_id = %tag_id,
                event = event.as_str(),
                "event_discarded_device_not_activated"
            );
            return;
        }

        let report = RfidEvent::new(tag_id, event);
        match self.backend.post_events(std::slice::from_ref(&report)).await {
            Ok(()) => {
                info!(tag_id = %tag_id, event = event.as_str(), "rfid_event_sent");
            }
            Err(e) => {
                warn!(tag_id = %tag_id, event = event.as_str(), error = %e, "rfid_event_failed");
                self.enqueue(QueuedEvent {
                    tag_id: tag_id.to_string(),
                    event,
                    enqueued_at: enqueued_at.unwrap_or_else(unix_now),
                });
            }
        }
    }

    fn enqueue(&self, entry: QueuedEvent) {
        let mut queue = self.queue.lock();
        if queue.len() >= QUEUE_CAPACITY {
            if let Some(evicted) = queue.pop_front() {
                warn!(tag_id = %evicted.tag_id, "retry_queue_full_evicting_oldest");
            }
        }
        queue.push_back(entry);
    }
}
