//! Frame capture: qualifying-surface selection, bounded retry, JPEG encode.
//!
//! A tick either produces one encoded frame or gives up silently; encode
//! failures are logged and never escape to the scheduler.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{VigilError, VigilResult};
use crate::page::{PageHost, PageSnapshot, RawFrame, VideoSurface};

/// Surfaces at or below this rendered edge length are thumbnails, not the
/// live feed.
pub const MIN_SURFACE_EDGE: u32 = 100;
/// Raster size when the surface reports no usable native resolution.
pub const FALLBACK_WIDTH: u32 = 640;
pub const FALLBACK_HEIGHT: u32 = 480;
/// JPEG quality of the uploaded frame.
pub const JPEG_QUALITY: u8 = 70;
/// Bounded retry while the page is still materializing.
pub const CAPTURE_RETRIES: u32 = 3;
pub const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// One encoded video frame. Dropped after the upload attempt, never retained.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub jpeg: Vec<u8>,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
}

/// First surface exceeding the thumbnail threshold on both axes, with an
/// attached source and current frame data available.
pub fn select_surface(snapshot: &PageSnapshot) -> Option<&VideoSurface> {
    snapshot
        .videos
        .iter()
        .find(|v| v.width > MIN_SURFACE_EDGE && v.height > MIN_SURFACE_EDGE && v.is_ready())
}

/// Capture one frame from the tab's live video. When no surface qualifies
/// yet, re-probes after a fixed delay up to the retry bound, then gives up
/// with `Ok(None)`.
pub async fn capture_frame(
    host: &dyn PageHost,
    snapshot: &PageSnapshot,
) -> VigilResult<Option<CapturedFrame>> {
    let tab = snapshot.tab;
    let mut attempt: u32 = 0;
    let mut reprobed: Option<PageSnapshot> = None;
    loop {
        let view = reprobed.as_ref().unwrap_or(snapshot);
        if let Some(surface) = select_surface(view) {
            return match grab_and_encode(host, view, surface).await {
                Ok(frame) => Ok(Some(frame)),
                Err(e) => {
                    warn!(tab, error = %e, "frame capture failed; dropping frame");
                    Ok(None)
                }
            };
        }
        if attempt >= CAPTURE_RETRIES {
            debug!(tab, attempts = attempt + 1, "no qualifying video surface");
            return Ok(None);
        }
        attempt += 1;
        tokio::time::sleep(CAPTURE_RETRY_DELAY).await;
        reprobed = Some(host.snapshot(tab).await?);
    }
}

/// Fetch raw pixels and rasterize at the surface's native resolution
/// (fallback raster size when the element reports none).
async fn grab_and_encode(
    host: &dyn PageHost,
    snapshot: &PageSnapshot,
    surface: &VideoSurface,
) -> VigilResult<CapturedFrame> {
    let raw = host.grab_frame(snapshot.tab, surface).await?;
    let (width, height) = if surface.native_width == 0 || surface.native_height == 0 {
        (FALLBACK_WIDTH, FALLBACK_HEIGHT)
    } else {
        (surface.native_width, surface.native_height)
    };
    let jpeg = encode_jpeg(&raw, width, height)?;
    Ok(CapturedFrame {
        jpeg,
        captured_at: Utc::now(),
        width,
        height,
    })
}

fn encode_jpeg(raw: &RawFrame, target_w: u32, target_h: u32) -> VigilResult<Vec<u8>> {
    let rgba = image::RgbaImage::from_raw(raw.width, raw.height, raw.rgba.clone()).ok_or_else(
        || VigilError::Encode("pixel buffer does not match reported dimensions".to_string()),
    )?;
    let rgba = if (raw.width, raw.height) == (target_w, target_h) {
        rgba
    } else {
        image::imageops::resize(&rgba, target_w, target_h, image::imageops::FilterType::Triangle)
    };
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
    let mut out = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| VigilError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TabId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn surface(width: u32, height: u32, ready_state: u8, has_source: bool) -> VideoSurface {
        VideoSurface {
            surface_id: "v0".to_string(),
            width,
            height,
            native_width: width,
            native_height: height,
            ready_state,
            has_source,
        }
    }

    fn snapshot_with(videos: Vec<VideoSurface>) -> PageSnapshot {
        PageSnapshot {
            tab: 1,
            url: "https://meet.example.com/abc".to_string(),
            html: String::new(),
            videos,
        }
    }

    #[test]
    fn thumbnail_surfaces_are_never_selected() {
        // Both axes at or below the threshold: rejected regardless of readiness.
        let snap = snapshot_with(vec![surface(100, 100, 4, true)]);
        assert!(select_surface(&snap).is_none());
        let snap = snapshot_with(vec![surface(100, 720, 4, true)]);
        assert!(select_surface(&snap).is_none());
    }

    #[test]
    fn unready_surfaces_are_skipped() {
        let snap = snapshot_with(vec![surface(640, 360, 1, true)]);
        assert!(select_surface(&snap).is_none());
        let snap = snapshot_with(vec![surface(640, 360, 4, false)]);
        assert!(select_surface(&snap).is_none());
    }

    #[test]
    fn first_qualifying_surface_wins() {
        let snap = snapshot_with(vec![
            surface(96, 54, 4, true),
            surface(1280, 720, 2, true),
        ]);
        assert_eq!(select_surface(&snap).unwrap().width, 1280);
    }

    #[test]
    fn encode_produces_jpeg_at_native_resolution() {
        let raw = RawFrame {
            width: 8,
            height: 8,
            rgba: vec![128; 8 * 8 * 4],
        };
        let jpeg = encode_jpeg(&raw, 8, 8).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "missing JPEG SOI marker");
    }

    #[test]
    fn encode_rejects_short_buffer() {
        let raw = RawFrame {
            width: 8,
            height: 8,
            rgba: vec![0; 7],
        };
        assert!(matches!(encode_jpeg(&raw, 8, 8), Err(VigilError::Encode(_))));
    }

    struct EmptyHost {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl PageHost for EmptyHost {
        async fn snapshot(&self, tab: TabId) -> VigilResult<PageSnapshot> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(PageSnapshot {
                tab,
                url: "https://meet.example.com/abc".to_string(),
                html: String::new(),
                videos: Vec::new(),
            })
        }

        async fn grab_frame(&self, _tab: TabId, _surface: &VideoSurface) -> VigilResult<RawFrame> {
            unreachable!("no surface should ever qualify")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_silently_after_bounded_retries() {
        let host = EmptyHost {
            probes: AtomicUsize::new(0),
        };
        let snap = snapshot_with(Vec::new());
        let got = capture_frame(&host, &snap).await.unwrap();
        assert!(got.is_none());
        assert_eq!(host.probes.load(Ordering::SeqCst), CAPTURE_RETRIES as usize);
    }
}
