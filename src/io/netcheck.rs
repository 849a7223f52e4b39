//! Outbound connectivity probe
//!
//! A short TCP connect to any of several public DNS resolvers is taken as
//! proof of network reachability. Three distinct providers are probed in
//! round-robin so a single unreachable provider cannot block startup.

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

pub const NETWORK_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

// Google, Cloudflare, OpenDNS
const PROBE_TARGETS: [&str; 3] = ["8.8.8.8:53", "1.1.1.1:53", "208.67.222.222:53"];
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const PROBE_PAUSE: Duration = Duration::from_secs(2);

/// Poll until any resolver accepts a TCP connect, the timeout elapses, or
/// shutdown is requested. Returns true on the first successful connect.
pub async fn wait_for_network(timeout: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    info!("waiting_for_network");
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if *shutdown.borrow() {
            info!("network_wait_cancelled");
            return false;
        }

        for addr in PROBE_TARGETS {
            match tokio::time::timeout(PROBE_CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
                Ok(Ok(_stream)) => {
                    info!(addr = %addr, "network_reachable");
                    return true;
                }
                Ok(Err(e)) => debug!(addr = %addr, error = %e, "network_probe_failed"),
                Err(_) => debug!(addr = %addr, "network_probe_timeout"),
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(PROBE_PAUSE) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("network_wait_cancelled");
                    return false;
                }
            }
        }
    }

    error!("network_wait_timeout");
    false
}
