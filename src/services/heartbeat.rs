//! Heartbeat loop and failure escalation
//!
//! Every tick, while activated: attest liveness to the backend. Success
//! resets the failure counter and drains the event retry queue (proven
//! connectivity is the retry trigger). Reaching the failure threshold
//! forces the device back to unactivated, modeling a backend that has
//! forgotten or revoked it.

use crate::infra::DeviceState;
use crate::io::backend::BackendApi;
use crate::services::dispatcher::EventDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const MAX_HEARTBEAT_FAILURES: u32 = 5;

pub struct HeartbeatMonitor {
    backend: Arc<dyn BackendApi>,
    state: Arc<DeviceState>,
    dispatcher: Arc<EventDispatcher>,
}

impl HeartbeatMonitor {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        state: Arc<DeviceState>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self { backend, state, dispatcher }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("heartbeat_loop_started");
        let mut timer = interval(HEARTBEAT_INTERVAL);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A closed channel is a shutdown request too
                    if changed.is_err() || *shutdown.borrow() {
                        info!("heartbeat_shutdown");
                        return;
                    }
                }
                _ = timer.tick() => {}
            }

            self.tick().await;
        }
    }

    /// One heartbeat cycle. No-op while unactivated.
    pub async fn tick(&self) {
        if !self.state.is_activated() {
            return;
        }

        match self.backend.heartbeat().await {
            Ok(()) => {
                debug!("heartbeat_ok");
                self.state.reset_heartbeat_failures();
                self.dispatcher.retry_all().await;
            }
            Err(e) => {
                let failures = self.state.record_heartbeat_failure();
                warn!(error = %e, failures, "heartbeat_failed");

                if failures >= MAX_HEARTBEAT_FAILURES {
                    error!(failures, "heartbeat_failures_exhausted_forcing_reactivation");
                    if let Err(e) = self.state.force_unactivated() {
                        error!(error = %e, "activation_marker_remove_failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RfidEvent, TagEventType};
    use crate::io::backend::{ActivationRequest, BackendError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    struct ScriptedBackend {
        heartbeat_ok: Mutex<bool>,
        heartbeat_calls: Mutex<u32>,
        fail_next_post: Mutex<bool>,
        posted: Mutex<Vec<RfidEvent>>,
    }

    impl ScriptedBackend {
        fn new(heartbeat_ok: bool) -> Self {
            Self {
                heartbeat_ok: Mutex::new(heartbeat_ok),
                heartbeat_calls: Mutex::new(0),
                fail_next_post: Mutex::new(false),
                posted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BackendApi for ScriptedBackend {
        async fn activate(&self, _request: &ActivationRequest) -> Result<(), BackendError> {
            Ok(())
        }

        async fn heartbeat(&self) -> Result<(), BackendError> {
            *self.heartbeat_calls.lock() += 1;
            if *self.heartbeat_ok.lock() {
                Ok(())
            } else {
                Err(BackendError::Rejected(500))
            }
        }

        async fn post_events(&self, events: &[RfidEvent]) -> Result<(), BackendError> {
            let mut fail = self.fail_next_post.lock();
            if *fail {
                *fail = false;
                return Err(BackendError::Rejected(503));
            }
            self.posted.lock().extend_from_slice(events);
            Ok(())
        }
    }

    fn monitor_with(
        dir: &tempfile::TempDir,
        backend: Arc<ScriptedBackend>,
        activated: bool,
    ) -> (HeartbeatMonitor, Arc<DeviceState>, Arc<EventDispatcher>) {
        let state = Arc::new(DeviceState::new(dir.path().join(".activated")));
        if activated {
            state.mark_activated().unwrap();
        }
        let dispatcher = Arc::new(EventDispatcher::new(backend.clone(), state.clone()));
        let monitor = HeartbeatMonitor::new(backend, state.clone(), dispatcher.clone());
        (monitor, state, dispatcher)
    }

    #[tokio::test]
    async fn test_tick_skipped_when_unactivated() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(true));
        let (monitor, _state, _dispatcher) = monitor_with(&dir, backend.clone(), false);

        monitor.tick().await;
        assert_eq!(*backend.heartbeat_calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_success_resets_counter_and_retries_queue() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(true));
        let (monitor, state, dispatcher) = monitor_with(&dir, backend.clone(), true);

        state.record_heartbeat_failure();
        state.record_heartbeat_failure();

        // Park an event in the retry queue; the heartbeat should flush it
        *backend.fail_next_post.lock() = true;
        dispatcher.deliver("AABBCC", TagEventType::Detected).await;
        assert_eq!(dispatcher.queued_len(), 1);

        monitor.tick().await;
        assert_eq!(state.heartbeat_failures(), 0);
        assert_eq!(*backend.heartbeat_calls.lock(), 1);
        assert_eq!(dispatcher.queued_len(), 0);
        assert_eq!(backend.posted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_five_failures_force_unactivated() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(false));
        let (monitor, state, _dispatcher) = monitor_with(&dir, backend.clone(), true);
        let marker = state.marker_path().to_path_buf();
        assert!(marker.exists());

        for _ in 0..MAX_HEARTBEAT_FAILURES {
            monitor.tick().await;
        }

        assert!(!state.is_activated());
        assert!(!marker.exists());
        assert_eq!(state.heartbeat_failures(), 0);

        // Once unactivated, no further heartbeat is attempted
        let calls_before = *backend.heartbeat_calls.lock();
        monitor.tick().await;
        assert_eq!(*backend.heartbeat_calls.lock(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_when_shutdown_channel_closes() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(true));
        let (monitor, _state, _dispatcher) = monitor_with(&dir, backend, false);

        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), monitor.run(rx))
            .await
            .expect("heartbeat loop must exit once the shutdown channel is gone");
    }

    #[tokio::test]
    async fn test_intermittent_failures_do_not_escalate() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(false));
        let (monitor, state, _dispatcher) = monitor_with(&dir, backend.clone(), true);

        for _ in 0..MAX_HEARTBEAT_FAILURES - 1 {
            monitor.tick().await;
        }
        // A success before the threshold resets the streak
        *backend.heartbeat_ok.lock() = true;
        monitor.tick().await;
        assert_eq!(state.heartbeat_failures(), 0);

        *backend.heartbeat_ok.lock() = false;
        monitor.tick().await;
        assert!(state.is_activated());
        assert_eq!(state.heartbeat_failures(), 1);
    }
}
