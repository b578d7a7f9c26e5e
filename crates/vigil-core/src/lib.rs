//! vigil-core: meeting-attention capture client library.
//!
//! Detects in-progress video calls from page snapshots, captures and encodes
//! video frames, resolves best-effort identity, schedules per-tab capture
//! timers, and uploads frames to an external attention-scoring backend. The
//! backend itself (scoring, persistence, aggregation) is an opaque
//! collaborator.

mod config;
mod dashboard;
mod detector;
mod error;
mod frame;
mod identity;
mod page;
mod scheduler;
mod uploader;

pub use config::{FileConfig, VigilConfig};
pub use dashboard::{
    render_history, render_scores, AttentionRow, DashboardClient, HistoryPoint, NO_DATA_MESSAGE,
};
pub use detector::meeting_in_progress;
pub use error::{VigilError, VigilResult};
pub use frame::{
    capture_frame, select_surface, CapturedFrame, CAPTURE_RETRIES, CAPTURE_RETRY_DELAY,
    FALLBACK_HEIGHT, FALLBACK_WIDTH, JPEG_QUALITY, MIN_SURFACE_EDGE,
};
pub use identity::{DeviceVault, Identity};
pub use page::{
    PageHost, PageSnapshot, RawFrame, TabId, VideoSurface, READY_STATE_HAVE_CURRENT_DATA,
};
pub use scheduler::{CaptureScheduler, TabEvent};
pub use uploader::{FramePayload, FrameUploader, UploadReceipt};
