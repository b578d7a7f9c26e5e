//! Meeting detection: a fixed set of DOM markers, logical OR.
//!
//! False negatives during page transitions are expected; the scheduler's
//! poller re-probes on the next tab update. False positives are not
//! specially handled.

use scraper::{Html, Selector};

use crate::page::PageSnapshot;

/// DOM markers treated as evidence of an in-progress call. Any single hit
/// counts; no marker outranks another.
const MEETING_MARKERS: &[&str] = &[
    "[data-is-muted]",
    "[data-allocation-index]",
    "[data-participant-id]",
    "#call-tooltip",
];

/// True if the snapshot shows any known meeting marker or a live video
/// element with an attached source.
pub fn meeting_in_progress(snapshot: &PageSnapshot) -> bool {
    if snapshot.videos.iter().any(|v| v.has_source) {
        return true;
    }
    let document = Html::parse_document(&snapshot.html);
    for marker in MEETING_MARKERS {
        if let Ok(sel) = Selector::parse(marker) {
            if document.select(&sel).next().is_some() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::VideoSurface;

    fn snapshot(html: &str) -> PageSnapshot {
        PageSnapshot {
            tab: 1,
            url: "https://meet.example.com/abc-defg-hij".to_string(),
            html: html.to_string(),
            videos: Vec::new(),
        }
    }

    #[test]
    fn no_marker_is_negative() {
        assert!(!meeting_in_progress(&snapshot(
            "<html><body><h1>Landing page</h1></body></html>"
        )));
    }

    #[test]
    fn each_marker_alone_is_positive() {
        let cases = [
            r#"<div data-is-muted="false"></div>"#,
            r#"<div data-allocation-index="0"></div>"#,
            r#"<div data-participant-id="p7"></div>"#,
            r#"<span id="call-tooltip"></span>"#,
        ];
        for html in cases {
            assert!(
                meeting_in_progress(&snapshot(&format!("<html><body>{}</body></html>", html))),
                "marker not detected: {}",
                html
            );
        }
    }

    #[test]
    fn sourced_video_surface_is_positive() {
        let mut snap = snapshot("<html><body></body></html>");
        snap.videos.push(VideoSurface {
            surface_id: "v0".to_string(),
            width: 640,
            height: 360,
            native_width: 640,
            native_height: 360,
            ready_state: 4,
            has_source: true,
        });
        assert!(meeting_in_progress(&snap));
    }

    #[test]
    fn sourceless_video_does_not_count() {
        let mut snap = snapshot("<html><body></body></html>");
        snap.videos.push(VideoSurface {
            surface_id: "v0".to_string(),
            width: 640,
            height: 360,
            native_width: 0,
            native_height: 0,
            ready_state: 0,
            has_source: false,
        });
        assert!(!meeting_in_progress(&snap));
    }
}
