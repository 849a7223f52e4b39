//! Tag presence polling loop
//!
//! Polls the reader at a fixed cadence and turns raw scan results into
//! edge-triggered Detected/Removed events. Reader problems never terminate
//! the loop: acquisition failures back off slowly, transmit faults reset
//! the tag state, drop the connection and trigger a soft config reload.

use crate::domain::{TagEventType, TagPresence};
use crate::infra::Identity;
use crate::io::reader::{ReaderPort, ScanOutcome};
use crate::services::dispatcher::EventDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub const SCAN_INTERVAL: Duration = Duration::from_millis(400);
const READER_RETRY_DELAY: Duration = Duration::from_secs(10);
const FAULT_BACKOFF: Duration = Duration::from_secs(2);

pub struct TagScanner {
    reader: Box<dyn ReaderPort>,
    identity: Arc<Identity>,
    dispatcher: Arc<EventDispatcher>,
    presence: TagPresence,
}

impl TagScanner {
    pub fn new(
        reader: Box<dyn ReaderPort>,
        identity: Arc<Identity>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self { reader, identity, dispatcher, presence: TagPresence::new() }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scan_loop_started");

        loop {
            if *shutdown.borrow() {
                info!("scan_loop_shutdown");
                return;
            }

            if !self.reader.is_acquired() {
                if let Err(e) = self.reader.acquire().await {
                    error!(error = %e, "reader_acquire_failed");
                    if pause(READER_RETRY_DELAY, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            }

            match self.reader.read_uid().await {
                Ok(outcome) => {
                    let seen = match &outcome {
                        ScanOutcome::Tag(uid) => Some(uid.as_str()),
                        ScanOutcome::NoCard => None,
                    };
                    if let Some((tag_id, event)) = self.presence.observe(seen) {
                        info!(tag_id = %tag_id, event = event.as_str(), "tag_transition");
                        self.dispatcher.deliver(&tag_id, event).await;
                    }
                    if pause(SCAN_INTERVAL, &mut shutdown).await {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "reader_fault");
                    // True card state is unknown; report removal for the
                    // tracked tag and start over with a fresh connection
                    if let Some(tag_id) = self.presence.clear() {
                        self.dispatcher.deliver(&tag_id, TagEventType::Removed).await;
                    }
                    self.reader.release();
                    if pause(FAULT_BACKOFF, &mut shutdown).await {
                        return;
                    }
                    self.identity.reload();
                }
            }
        }
    }
}

/// Sleep that doubles as a cancellation point. Returns true when shutdown
/// was requested during the pause. A closed channel counts as a shutdown
/// request; anything else would leave the loop spinning hot.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
