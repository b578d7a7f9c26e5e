//! HTTP glue to the local browser bridge: tab listing, page snapshots, and
//! raw frame pixels.
//!
//! The bridge is a small companion that exposes the browser's state over
//! loopback HTTP; the watcher never touches the DOM directly.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use vigil_core::{
    PageHost, PageSnapshot, RawFrame, TabEvent, TabId, VideoSurface, VigilError, VigilResult,
};

const BRIDGE_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Vigil-Watcher/1.0";

/// One open tab as reported by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    #[serde(default)]
    pub active: bool,
}

pub struct BridgeHost {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeHost {
    pub fn new(base_url: &str) -> VigilResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(BRIDGE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list_tabs(&self) -> VigilResult<Vec<TabInfo>> {
        let url = format!("{}/tabs", self.base_url);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(VigilError::Bridge(format!("tab list returned {}", status)));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl PageHost for BridgeHost {
    async fn snapshot(&self, tab: TabId) -> VigilResult<PageSnapshot> {
        let url = format!("{}/tabs/{}/snapshot", self.base_url, tab);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(VigilError::Bridge(format!(
                "snapshot for tab {} returned {}",
                tab, status
            )));
        }
        Ok(res.json().await?)
    }

    async fn grab_frame(&self, tab: TabId, surface: &VideoSurface) -> VigilResult<RawFrame> {
        let url = format!("{}/tabs/{}/frame/{}", self.base_url, tab, surface.surface_id);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(VigilError::Bridge(format!(
                "frame for tab {} returned {}",
                tab, status
            )));
        }
        Ok(res.json().await?)
    }
}

/// Poll the bridge tab list and translate changes into `TabEvent`s.
///
/// `Updated` fires for new tabs and URL changes, `Activated` when the
/// focused tab changes, `Removed` when a tab disappears from the listing.
/// An unreachable bridge is a transient condition, retried next period.
pub async fn poll_tab_events(
    bridge: Arc<BridgeHost>,
    events: mpsc::Sender<TabEvent>,
    period: Duration,
) {
    let mut known: HashMap<TabId, String> = HashMap::new();
    let mut active_tab: Option<TabId> = None;
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let tabs = match bridge.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                debug!(error = %e, "bridge unreachable; retrying next poll");
                continue;
            }
        };

        let mut pending = Vec::new();
        let mut seen: HashMap<TabId, String> = HashMap::new();
        for tab in &tabs {
            match known.get(&tab.id) {
                Some(prev) if prev == &tab.url => {}
                _ => pending.push(TabEvent::Updated {
                    tab: tab.id,
                    url: tab.url.clone(),
                }),
            }
            if tab.active && active_tab != Some(tab.id) {
                active_tab = Some(tab.id);
                pending.push(TabEvent::Activated { tab: tab.id });
            }
            seen.insert(tab.id, tab.url.clone());
        }
        for id in known.keys() {
            if !seen.contains_key(id) {
                pending.push(TabEvent::Removed { tab: *id });
            }
        }
        known = seen;

        for event in pending {
            if events.send(event).await.is_err() {
                warn!("event channel closed; stopping bridge poller");
                return;
            }
        }
    }
}
