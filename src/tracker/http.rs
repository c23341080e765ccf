//! HTTP client for the tracking service.
//!
//! ```text
//! POST /tracking/start          TrackingContext      → { "id": "..." }
//! POST /tracking/{id}/hash      { "txHash": "0x.." }
//! POST /tracking/{id}/status    { "status": "...", "reason"?: "..." }
//! GET  /tracking/{id}                                → TrackedTransaction
//! ```

use alloy::primitives::TxHash;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::tracker::types::{
    TrackedTransaction, TrackerError, TrackerResult, TrackingContext, TrackingStatus,
};
use crate::tracker::{Tracker, TrackingHandle};

#[derive(Debug, Deserialize)]
struct StartResponse {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashUpdate {
    tx_hash: TxHash,
}

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    status: TrackingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// reqwest-backed [`Tracker`].
#[derive(Debug, Clone)]
pub struct HttpTracker {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTracker {
    pub fn new(config: &TrackerConfig) -> TrackerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Handle for an existing record, e.g. to query it after a restart.
    pub fn handle(&self, id: impl Into<String>) -> HttpTrackingHandle {
        HttpTrackingHandle {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            id: id.into(),
        }
    }
}

#[async_trait]
impl Tracker for HttpTracker {
    async fn start_tracking(
        &self,
        context: &TrackingContext,
    ) -> TrackerResult<Box<dyn TrackingHandle>> {
        let url = format!("{}/tracking/start", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(context)
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        let started: StartResponse = decode(resp).await?;
        Ok(Box::new(self.handle(started.id)))
    }
}

/// Handle for one record on the tracking service.
#[derive(Debug, Clone)]
pub struct HttpTrackingHandle {
    client: reqwest::Client,
    base_url: String,
    id: String,
}

impl HttpTrackingHandle {
    fn url(&self, suffix: &str) -> String {
        format!("{}/tracking/{}{}", self.base_url, self.id, suffix)
    }

    async fn post_status(&self, status: TrackingStatus, reason: Option<&str>) -> TrackerResult<()> {
        let resp = self
            .client
            .post(self.url("/status"))
            .json(&StatusUpdate { status, reason })
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        check(resp, &self.id).await.map(|_| ())
    }
}

#[async_trait]
impl TrackingHandle for HttpTrackingHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn add_tx_hash(&self, tx_hash: TxHash) -> TrackerResult<()> {
        let resp = self
            .client
            .post(self.url("/hash"))
            .json(&HashUpdate { tx_hash })
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        check(resp, &self.id).await.map(|_| ())
    }

    async fn mark_submitted(&self) -> TrackerResult<()> {
        self.post_status(TrackingStatus::Submitted, None).await
    }

    async fn mark_pending(&self) -> TrackerResult<()> {
        self.post_status(TrackingStatus::Pending, None).await
    }

    async fn mark_confirmed(&self) -> TrackerResult<()> {
        self.post_status(TrackingStatus::Confirmed, None).await
    }

    async fn mark_failed(&self, reason: &str) -> TrackerResult<()> {
        self.post_status(TrackingStatus::Failed, Some(reason)).await
    }

    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction> {
        let resp = self
            .client
            .get(self.url(""))
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        let resp = check(resp, &self.id).await?;
        resp.json()
            .await
            .map_err(|e| TrackerError::Decode(e.to_string()))
    }
}

async fn check(resp: reqwest::Response, id: &str) -> TrackerResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(TrackerError::NotFound(id.to_string()));
    }
    let message = resp.text().await.unwrap_or_default();
    Err(TrackerError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> TrackerResult<T> {
    let resp = check(resp, "").await?;
    resp.json()
        .await
        .map_err(|e| TrackerError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let tracker = HttpTracker::with_client(reqwest::Client::new(), "http://tracker:9000/");
        let handle = tracker.handle("abc");
        assert_eq!(handle.url(""), "http://tracker:9000/tracking/abc");
        assert_eq!(handle.url("/status"), "http://tracker:9000/tracking/abc/status");
        assert_eq!(handle.id(), "abc");
    }

    #[test]
    fn test_status_body() {
        let body = serde_json::to_value(StatusUpdate {
            status: TrackingStatus::Failed,
            reason: Some("user_rejected"),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "failed", "reason": "user_rejected"})
        );

        let body = serde_json::to_value(StatusUpdate {
            status: TrackingStatus::Submitted,
            reason: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "submitted"}));
    }
}
