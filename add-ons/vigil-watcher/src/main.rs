//! Vigil watcher daemon.
//!
//! Polls the local browser bridge for tab lifecycle changes, detects
//! in-progress meetings, and runs the per-tab capture/upload loop while a
//! meeting is on screen. All scoring happens in the external backend; this
//! process is capture and dispatch only.

mod bridge;

use bridge::BridgeHost;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil_core::{CaptureScheduler, DeviceVault, FrameUploader, PageHost, VigilConfig};

/// Capacity of the tab-event channel between the poller and the scheduler.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[vigil-watcher] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VigilConfig::load();

    let vault = match DeviceVault::open_path(&config.storage_path) {
        Ok(vault) => Arc::new(vault),
        Err(e) => {
            tracing::error!(error = %e, path = %config.storage_path, "cannot open device vault");
            return;
        }
    };
    let uploader = match FrameUploader::new(&config.upload_endpoint) {
        Ok(uploader) => Arc::new(uploader),
        Err(e) => {
            tracing::error!(error = %e, "cannot build upload client");
            return;
        }
    };
    let bridge = match BridgeHost::new(&config.bridge_url) {
        Ok(bridge) => Arc::new(bridge),
        Err(e) => {
            tracing::error!(error = %e, "cannot build bridge client");
            return;
        }
    };

    // Boot-time reachability probe; uploads may still start later if the
    // backend comes up after us.
    match uploader.health_check(&config.health_endpoint).await {
        Ok(()) => tracing::info!(endpoint = %config.health_endpoint, "scoring backend reachable"),
        Err(e) => {
            tracing::warn!(error = %e, "scoring backend health check failed; uploads may not land")
        }
    }

    let host: Arc<dyn PageHost> = bridge.clone();
    let scheduler = CaptureScheduler::new(
        host,
        uploader,
        vault,
        config.startup_delay,
        config.capture_period,
    );

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let poller = tokio::spawn(bridge::poll_tab_events(
        Arc::clone(&bridge),
        events_tx,
        config.tab_poll_period,
    ));

    tracing::info!(
        bridge = %config.bridge_url,
        upload = %config.upload_endpoint,
        period_secs = config.capture_period.as_secs(),
        "vigil watcher started"
    );

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(event) => scheduler.handle_event(event).await,
                    None => {
                        tracing::warn!("bridge poller stopped; shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down watcher");
                break;
            }
        }
    }

    poller.abort();
}
