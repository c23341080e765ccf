//! HTTP client for the per-domain prepare endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{FlowError, FlowResult};
use crate::prepare::types::{Action, Domain, PrepareRequestBody, PrepareResponse};

/// The backend that turns a business action into unsigned transactions.
#[async_trait]
pub trait PrepareApi: Send + Sync {
    async fn prepare(
        &self,
        domain: Domain,
        action: Action,
        body: &PrepareRequestBody,
    ) -> FlowResult<PrepareResponse>;
}

/// reqwest-backed [`PrepareApi`].
#[derive(Debug, Clone)]
pub struct HttpPrepareApi {
    client: reqwest::Client,
    base_url: String,
    default_retry_after_secs: u64,
}

impl HttpPrepareApi {
    pub fn new(config: &BackendConfig) -> FlowResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FlowError::ServiceUnavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_retry_after_secs: config.default_retry_after_secs,
        })
    }

    fn endpoint(&self, domain: Domain, action: Action) -> String {
        format!(
            "{}/{}/prepare/{}",
            self.base_url,
            domain.as_str(),
            action.as_str()
        )
    }
}

#[async_trait]
impl PrepareApi for HttpPrepareApi {
    async fn prepare(
        &self,
        domain: Domain,
        action: Action,
        body: &PrepareRequestBody,
    ) -> FlowResult<PrepareResponse> {
        let url = self.endpoint(domain, action);
        tracing::debug!(url = %url, chain_id = body.chain_id, token = %body.token, "Calling prepare endpoint");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| FlowError::ServiceUnavailable(format!("prepare request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = retry_after_secs(resp.headers(), self.default_retry_after_secs);
            tracing::warn!(url = %url, retry_after_secs, "Prepare endpoint rate limited");
            return Err(FlowError::RateLimited { retry_after_secs });
        }
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let text = resp.text().await.unwrap_or_default();
            return Err(FlowError::Validation(error_message(&text, status)));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = %status, body = %text, "Prepare endpoint failed");
            return Err(FlowError::ServiceUnavailable(format!(
                "prepare returned status {}",
                status
            )));
        }

        resp.json::<PrepareResponse>()
            .await
            .map_err(FlowError::malformed_response)
    }
}

/// Delta-seconds `retry-after`, at least one second; `default_secs` when absent.
pub fn retry_after_secs(headers: &HeaderMap, default_secs: u64) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_secs)
        .max(1)
}

/// Pull a human readable message out of an error body.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("prepare rejected the request ({})", status)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers, 5), 5);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(retry_after_secs(&headers, 5), 30);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
        assert_eq!(retry_after_secs(&headers, 5), 1);

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_secs(&headers, 7), 7);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"unsupported token"}"#, StatusCode::BAD_REQUEST),
            "unsupported token"
        );
        assert_eq!(
            error_message(r#"{"error":"amount too low"}"#, StatusCode::BAD_REQUEST),
            "amount too low"
        );
        assert_eq!(error_message("plain", StatusCode::BAD_REQUEST), "plain");
        assert!(error_message("", StatusCode::UNPROCESSABLE_ENTITY).contains("422"));
    }

    #[test]
    fn test_endpoint_format() {
        let api = HttpPrepareApi::new(&BackendConfig {
            base_url: "http://api.local/".into(),
            ..BackendConfig::default()
        })
        .unwrap();
        assert_eq!(
            api.endpoint(Domain::Staking, Action::Unstake),
            "http://api.local/staking/prepare/unstake"
        );
    }
}
