//! Page snapshot model: explicit page state handed into detection and
//! extraction instead of implicit DOM access.
//!
//! The browser bridge serializes the live document into a `PageSnapshot`
//! (raw HTML plus per-video-element metadata). The parsed DOM is never
//! stored; functions that need it re-parse the HTML on demand.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VigilResult;

/// Browser tab identifier as reported by the host environment.
pub type TabId = u32;

/// Media ready state at which the current frame can be rasterized
/// (HTMLMediaElement HAVE_CURRENT_DATA).
pub const READY_STATE_HAVE_CURRENT_DATA: u8 = 2;

/// One `<video>` element as reported by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSurface {
    /// Bridge-assigned handle used to request the element's pixels.
    pub surface_id: String,
    /// Rendered (layout) size in the page.
    pub width: u32,
    pub height: u32,
    /// Native media resolution; 0 when the element has not reported one yet.
    #[serde(default)]
    pub native_width: u32,
    #[serde(default)]
    pub native_height: u32,
    /// HTMLMediaElement readyState (0–4) at snapshot time.
    #[serde(default)]
    pub ready_state: u8,
    /// Whether the element has an attached media source.
    #[serde(default)]
    pub has_source: bool,
}

impl VideoSurface {
    /// True when the element is playing from a source and has frame data.
    pub fn is_ready(&self) -> bool {
        self.has_source && self.ready_state >= READY_STATE_HAVE_CURRENT_DATA
    }
}

/// Point-in-time view of one tab's document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub tab: TabId,
    pub url: String,
    pub html: String,
    #[serde(default)]
    pub videos: Vec<VideoSurface>,
}

impl PageSnapshot {
    /// Path portion of the page URL ("/" when the URL has none).
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(i) => &self.url[i + 3..],
            None => self.url.as_str(),
        };
        match rest.find('/') {
            Some(i) => &rest[i..],
            None => "/",
        }
    }
}

/// Raw RGBA pixels for one video surface, as handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major; base64 on the wire.
    #[serde(with = "rgba_base64")]
    pub rgba: Vec<u8>,
}

mod rgba_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Capability to observe a tab: snapshot its document and grab video pixels.
/// Production uses the HTTP browser bridge; tests substitute fixtures.
#[async_trait]
pub trait PageHost: Send + Sync {
    async fn snapshot(&self, tab: TabId) -> VigilResult<PageSnapshot>;

    async fn grab_frame(&self, tab: TabId, surface: &VideoSurface) -> VigilResult<RawFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_url(url: &str) -> PageSnapshot {
        PageSnapshot {
            tab: 1,
            url: url.to_string(),
            html: String::new(),
            videos: Vec::new(),
        }
    }

    #[test]
    fn path_extraction() {
        assert_eq!(
            snapshot_with_url("https://meet.example.com/abc-defg-hij").path(),
            "/abc-defg-hij"
        );
        assert_eq!(snapshot_with_url("https://meet.example.com").path(), "/");
        assert_eq!(snapshot_with_url("meet.example.com/x/y").path(), "/x/y");
    }

    #[test]
    fn raw_frame_roundtrips_through_json() {
        let frame = RawFrame {
            width: 2,
            height: 1,
            rgba: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        let json = serde_json::to_string(&frame).unwrap();
        let back: RawFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rgba, frame.rgba);
        assert_eq!(back.width, 2);
    }
}
