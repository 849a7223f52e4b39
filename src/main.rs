//! RFID edge agent - bridges a physical RFID reader to the backend
//!
//! Startup sequence: network probe, config load, device activation. Then
//! two loops run until shutdown: the tag scan loop (main task) and the
//! heartbeat loop. Startup failures exit with code 1; steady-state errors
//! are absorbed by the loops.
//!
//! Module structure:
//! - `domain/` - Core event types and tag presence tracking
//! - `io/` - External interfaces (backend HTTP, serial reader, net probe)
//! - `services/` - Runtime logic (activation, scanner, dispatcher, heartbeat)
//! - `infra/` - Infrastructure (config, durable state, PID file)

use anyhow::Context;
use clap::Parser;
use rfid_agent::infra::{config, pid, state, DeviceState, Identity, PidFile};
use rfid_agent::io::backend::{BackendApi, HttpBackend};
use rfid_agent::io::netcheck::{self, NETWORK_WAIT_TIMEOUT};
use rfid_agent::io::reader::{self, SerialReader};
use rfid_agent::services::{ensure_activated, EventDispatcher, HeartbeatMonitor, TagScanner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// RFID edge agent - tag presence reporting and device liveness
#[derive(Parser, Debug)]
#[command(name = "rfid-agent", version, about)]
struct Args {
    /// Path to the JSON device config written by the provisioning service
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Path of the durable activation marker file
    #[arg(long, default_value = state::DEFAULT_MARKER_PATH)]
    marker: PathBuf,

    /// Path of the PID file
    #[arg(long, default_value = pid::DEFAULT_PID_PATH)]
    pid_file: PathBuf,

    /// Serial device of the RFID reader
    #[arg(long, default_value = reader::DEFAULT_READER_DEVICE)]
    reader_device: String,

    /// Baud rate for the reader serial port
    #[arg(long, default_value_t = reader::DEFAULT_READER_BAUD)]
    baud: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, level configurable via RUST_LOG (default: info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "rfid-agent starting");

    let _pid_file = PidFile::create(&args.pid_file);

    // Shutdown signal: SIGINT or SIGTERM flips the flag once
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "sigterm_handler_install_failed");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("sigint_received"),
            _ = sigterm.recv() => info!("sigterm_received"),
        }
        let _ = shutdown_tx.send(true);
    });

    // Startup sequence: any failure here exits with code 1
    let mut startup_shutdown = shutdown_rx.clone();
    if !netcheck::wait_for_network(NETWORK_WAIT_TIMEOUT, &mut startup_shutdown).await {
        anyhow::bail!("no network connectivity");
    }

    let identity = Arc::new(Identity::load(&args.config).context("invalid device config")?);
    let state = Arc::new(DeviceState::new(&args.marker));
    let backend: Arc<dyn BackendApi> =
        Arc::new(HttpBackend::new(identity.clone()).context("failed to build http client")?);

    ensure_activated(backend.as_ref(), &state, &mut startup_shutdown)
        .await
        .context("device activation failed")?;

    let dispatcher = Arc::new(EventDispatcher::new(backend.clone(), state.clone()));

    // Heartbeat loop
    let monitor = HeartbeatMonitor::new(backend, state, dispatcher.clone());
    let heartbeat_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        monitor.run(heartbeat_shutdown).await;
    });

    // Scan loop runs on the main task until shutdown
    let reader = SerialReader::new(&args.reader_device, args.baud);
    let scanner = TagScanner::new(Box::new(reader), identity, dispatcher);
    scanner.run(shutdown_rx).await;

    info!("rfid-agent shutdown complete");
    Ok(())
}
