//! Per-tab capture scheduling.
//!
//! One scheduler owns the session map; at most one live timer exists per
//! tab, and starting capture always clears any prior timer first. Lifecycle
//! events arrive over a channel from the host poller; each timer tick runs
//! the detect → capture → resolve → upload pipeline and isolates its own
//! failures.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::detector::meeting_in_progress;
use crate::error::VigilResult;
use crate::frame::capture_frame;
use crate::identity::{DeviceVault, Identity};
use crate::page::{PageHost, TabId};
use crate::uploader::FrameUploader;

/// Host-environment lifecycle notifications driving detection.
#[derive(Debug, Clone)]
pub enum TabEvent {
    Updated { tab: TabId, url: String },
    Activated { tab: TabId },
    Removed { tab: TabId },
}

/// Result of one capture tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Uploaded,
    NoFrame,
    MeetingEnded,
}

struct CaptureSession {
    generation: u64,
    timer: JoinHandle<()>,
}

/// Owns the per-tab session map and the capture timers.
pub struct CaptureScheduler {
    host: Arc<dyn PageHost>,
    uploader: Arc<FrameUploader>,
    vault: Arc<DeviceVault>,
    sessions: Arc<DashMap<TabId, CaptureSession>>,
    generations: AtomicU64,
    startup_delay: Duration,
    period: Duration,
}

impl CaptureScheduler {
    pub fn new(
        host: Arc<dyn PageHost>,
        uploader: Arc<FrameUploader>,
        vault: Arc<DeviceVault>,
        startup_delay: Duration,
        period: Duration,
    ) -> Self {
        Self {
            host,
            uploader,
            vault,
            sessions: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
            startup_delay,
            period,
        }
    }

    /// Handle one host event: updates and activations re-probe the tab,
    /// removal tears the session down.
    pub async fn handle_event(&self, event: TabEvent) {
        match event {
            TabEvent::Updated { tab, .. } | TabEvent::Activated { tab } => self.probe(tab).await,
            TabEvent::Removed { tab } => self.stop(tab),
        }
    }

    /// Probe the tab's document and flip the session state accordingly.
    async fn probe(&self, tab: TabId) {
        let snapshot = match self.host.snapshot(tab).await {
            Ok(s) => s,
            Err(e) => {
                debug!(tab, error = %e, "snapshot unavailable");
                return;
            }
        };
        if meeting_in_progress(&snapshot) {
            self.start(tab);
        } else {
            self.stop(tab);
        }
    }

    /// Enter Active. Always clears any prior timer before starting a new
    /// one; re-detection restarts rather than stacks.
    pub fn start(&self, tab: TabId) {
        if let Some((_, prev)) = self.sessions.remove(&tab) {
            prev.timer.abort();
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let timer = self.spawn_timer(tab, generation);
        self.sessions.insert(tab, CaptureSession { generation, timer });
        info!(tab, "capture session started");
    }

    /// Leave Active. Aborting only prevents future ticks; an in-flight
    /// upload is never cancelled.
    pub fn stop(&self, tab: TabId) {
        if let Some((_, session)) = self.sessions.remove(&tab) {
            session.timer.abort();
            info!(tab, "capture session stopped");
        }
    }

    pub fn is_active(&self, tab: TabId) -> bool {
        self.sessions.contains_key(&tab)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn spawn_timer(&self, tab: TabId, generation: u64) -> JoinHandle<()> {
        let host = Arc::clone(&self.host);
        let uploader = Arc::clone(&self.uploader);
        let vault = Arc::clone(&self.vault);
        let sessions = Arc::clone(&self.sessions);
        let startup_delay = self.startup_delay;
        let period = self.period;
        tokio::spawn(async move {
            tokio::time::sleep(startup_delay).await;
            let mut interval = tokio::time::interval(period);
            // An interval's first tick resolves immediately; the first
            // capture belongs one full period after the startup delay.
            interval.tick().await;
            loop {
                interval.tick().await;
                match capture_tick(host.as_ref(), uploader.as_ref(), vault.as_ref(), tab).await {
                    Ok(TickOutcome::Uploaded) | Ok(TickOutcome::NoFrame) => {}
                    Ok(TickOutcome::MeetingEnded) => {
                        debug!(tab, "meeting markers gone; ending session");
                        sessions.remove_if(&tab, |_, s| s.generation == generation);
                        break;
                    }
                    Err(e) => warn!(tab, error = %e, "capture tick failed"),
                }
            }
        })
    }
}

/// One capture tick: snapshot → detect → capture → resolve → upload.
async fn capture_tick(
    host: &dyn PageHost,
    uploader: &FrameUploader,
    vault: &DeviceVault,
    tab: TabId,
) -> VigilResult<TickOutcome> {
    let snapshot = host.snapshot(tab).await?;
    if !meeting_in_progress(&snapshot) {
        return Ok(TickOutcome::MeetingEnded);
    }
    let frame = match capture_frame(host, &snapshot).await? {
        Some(frame) => frame,
        None => return Ok(TickOutcome::NoFrame),
    };
    let identity = Identity::resolve(&snapshot, vault)?;
    let receipt = uploader.upload(&frame, &identity).await?;
    debug!(
        tab,
        status = receipt.status.as_deref().unwrap_or("ok"),
        bytes = frame.jpeg.len(),
        "frame uploaded"
    );
    Ok(TickOutcome::Uploaded)
}
