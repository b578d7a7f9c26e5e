//! Dashboard query client: a single GET per lookup and plain-text rendering
//! of the result (table, no-data state, or error state upstream).
//!
//! No retry, no pagination, no caching.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{VigilError, VigilResult};

const QUERY_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Vigil-Dashboard/1.0";

/// Rendered when a lookup succeeds but the backend has nothing for the
/// meeting.
pub const NO_DATA_MESSAGE: &str = "No attention data found for this meeting.";

/// One participant row of the score lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionRow {
    pub email: String,
    pub attention_score: f64,
    /// Seconds of scored presence.
    #[serde(default)]
    pub duration: f64,
}

/// One point of a participant's attention history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: String,
    pub attention: f64,
}

/// HTTP client for the scoring backend's query endpoints.
pub struct DashboardClient {
    client: reqwest::Client,
    scores_endpoint: String,
    history_endpoint: String,
}

impl DashboardClient {
    pub fn new(
        scores_endpoint: impl Into<String>,
        history_endpoint: impl Into<String>,
    ) -> VigilResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            scores_endpoint: scores_endpoint.into(),
            history_endpoint: history_endpoint.into(),
        })
    }

    /// Score table for one meeting. An empty array is a valid no-data result.
    pub async fn fetch_scores(&self, meeting_id: &str) -> VigilResult<Vec<AttentionRow>> {
        let res = self
            .client
            .get(&self.scores_endpoint)
            .query(&[("meeting_id", meeting_id)])
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(VigilError::Backend {
                status: status.as_u16(),
            });
        }
        Ok(res.json().await?)
    }

    /// Timestamped attention history for one participant of a meeting.
    pub async fn fetch_history(
        &self,
        meeting_id: &str,
        email: &str,
    ) -> VigilResult<Vec<HistoryPoint>> {
        let res = self
            .client
            .get(&self.history_endpoint)
            .query(&[("meeting_id", meeting_id), ("user_email", email)])
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(VigilError::Backend {
                status: status.as_u16(),
            });
        }
        Ok(res.json().await?)
    }
}

/// Aligned text table of the score rows; empty input renders the no-data
/// state instead of an empty table.
pub fn render_scores(rows: &[AttentionRow]) -> String {
    if rows.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }
    let width = rows
        .iter()
        .map(|r| r.email.len())
        .chain(std::iter::once("Participant".len()))
        .max()
        .unwrap_or(0);
    let mut out = format!("{:<width$}  {:>9}  {:>10}\n", "Participant", "Attention", "Duration");
    for row in rows {
        out.push_str(&format!(
            "{:<width$}  {:>8.1}%  {:>9.0}s\n",
            row.email, row.attention_score, row.duration
        ));
    }
    out
}

pub fn render_history(points: &[HistoryPoint]) -> String {
    if points.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }
    points
        .iter()
        .map(|p| format!("[{}] {:.2}", p.timestamp, p.attention))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_renders_no_data_state() {
        assert_eq!(render_scores(&[]), NO_DATA_MESSAGE);
        assert_eq!(render_history(&[]), NO_DATA_MESSAGE);
    }

    #[test]
    fn rows_render_as_a_table() {
        let rows = vec![
            AttentionRow {
                email: "ada@example.com".to_string(),
                attention_score: 87.5,
                duration: 1800.0,
            },
            AttentionRow {
                email: "grace@example.com".to_string(),
                attention_score: 42.0,
                duration: 900.0,
            },
        ];
        let out = render_scores(&rows);
        assert!(out.starts_with("Participant"));
        assert!(out.contains("ada@example.com"));
        assert!(out.contains("87.5%"));
        assert!(!out.contains(NO_DATA_MESSAGE));
    }

    #[tokio::test]
    async fn empty_array_from_backend_is_ok_and_empty() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/attention"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([])),
            )
            .mount(&server)
            .await;

        let client = DashboardClient::new(
            format!("{}/api/attention", server.uri()),
            format!("{}/api/attention-history", server.uri()),
        )
        .unwrap();
        let rows = client.fetch_scores("abc-defg-hij").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn backend_error_surfaces_as_failure() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = DashboardClient::new(
            format!("{}/api/attention", server.uri()),
            format!("{}/api/attention-history", server.uri()),
        )
        .unwrap();
        let err = client.fetch_scores("abc-defg-hij").await.unwrap_err();
        assert!(matches!(err, VigilError::Backend { status: 500 }));
    }

    #[tokio::test]
    async fn score_rows_decode_from_camel_case() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/attention"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!([{"email": "ada@example.com", "attentionScore": 87.5, "duration": 1800.0}]),
            ))
            .mount(&server)
            .await;

        let client = DashboardClient::new(
            format!("{}/api/attention", server.uri()),
            format!("{}/api/attention-history", server.uri()),
        )
        .unwrap();
        let rows = client.fetch_scores("abc-defg-hij").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attention_score, 87.5);
    }
}
