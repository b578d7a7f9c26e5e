//! Frame upload: one POST per capture tick, no retry.
//!
//! A failed upload is reported back to the tick and logged there; the next
//! tick is an independent attempt.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::error::{VigilError, VigilResult};
use crate::frame::CapturedFrame;
use crate::identity::Identity;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Vigil-Capture/1.0";

/// Wire body of the capture upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    /// `data:image/jpeg;base64,…` data URL.
    pub image_data: String,
    pub meeting_id: Option<String>,
    /// Client capture timestamp, RFC 3339 UTC.
    pub timestamp: String,
    pub user_id: Option<String>,
    pub participant_id: Option<String>,
    pub user_name: Option<String>,
    pub device_id: String,
}

/// Backend acknowledgment for one frame.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Per-frame attention score as judged by the backend.
    #[serde(default)]
    pub attention: Option<f64>,
}

/// HTTP client for the scoring backend's image endpoint.
pub struct FrameUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl FrameUploader {
    pub fn new(endpoint: impl Into<String>) -> VigilResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Serialize the frame with its identity fields and submit one request.
    /// Any non-success status is a failure result.
    pub async fn upload(
        &self,
        frame: &CapturedFrame,
        identity: &Identity,
    ) -> VigilResult<UploadReceipt> {
        let payload = FramePayload {
            image_data: format!("data:image/jpeg;base64,{}", BASE64.encode(&frame.jpeg)),
            meeting_id: identity.meeting_id.clone(),
            timestamp: frame.captured_at.to_rfc3339(),
            user_id: identity.user_id.clone(),
            participant_id: identity.participant_id.clone(),
            user_name: identity.user_name.clone(),
            device_id: identity.device_id.clone(),
        };
        let res = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(VigilError::Backend {
                status: status.as_u16(),
            });
        }
        let receipt: UploadReceipt = res.json().await?;
        if let Some(score) = receipt.attention {
            info!(score, "frame scored");
        }
        Ok(receipt)
    }

    /// One-shot backend reachability probe (watcher boot). Never fatal.
    pub async fn health_check(&self, health_endpoint: &str) -> VigilResult<()> {
        let res = self.client.get(health_endpoint).send().await?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(VigilError::Backend {
                status: res.status().as_u16(),
            })
        }
    }
}
