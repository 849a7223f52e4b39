//! One-time device registration
//!
//! Runs once at startup. A pre-existing durable marker short-circuits the
//! network exchange entirely; otherwise the activation POST is attempted a
//! fixed number of times with a fixed delay, and exhausting the budget is
//! fatal to startup.

use crate::infra::DeviceState;
use crate::io::backend::{ActivationRequest, BackendApi};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

pub const ACTIVATION_ATTEMPTS: u32 = 5;
pub const ACTIVATION_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("activation cancelled by shutdown")]
    Cancelled,
    #[error("activation failed after {0} attempts")]
    Exhausted(u32),
    #[error("failed to write activation marker: {0}")]
    Marker(#[from] std::io::Error),
}

/// Drive the device into the activated state, registering with the
/// backend if no durable marker exists yet.
pub async fn ensure_activated(
    backend: &dyn BackendApi,
    state: &DeviceState,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ActivationError> {
    if state.is_activated() {
        info!("device_already_activated");
        return Ok(());
    }

    let request = ActivationRequest::gather();
    info!(
        ip = request.system.ip_address.as_deref().unwrap_or("unknown"),
        mac = request.system.mac_address.as_deref().unwrap_or("unknown"),
        "activating_device"
    );

    for attempt in 1..=ACTIVATION_ATTEMPTS {
        match backend.activate(&request).await {
            Ok(()) => {
                state.mark_activated()?;
                info!(attempt, "device_activated");
                return Ok(());
            }
            Err(e) => warn!(attempt, error = %e, "activation_attempt_failed"),
        }

        if attempt < ACTIVATION_ATTEMPTS {
            tokio::select! {
                _ = tokio::time::sleep(ACTIVATION_RETRY_DELAY) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Err(ActivationError::Cancelled);
                    }
                }
            }
        }
    }

    Err(ActivationError::Exhausted(ACTIVATION_ATTEMPTS))
}
