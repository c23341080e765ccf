//! Retry logic for the preparation call.
//!
//! # Design Decisions
//! - `RateLimited` waits exactly the server's `retry-after`, unless it exceeds
//!   the policy's ceiling, in which case the error goes back to the caller
//! - `ServiceUnavailable` uses jittered exponential backoff, except for a
//!   malformed prepare response, which is returned immediately
//! - Everything else (validation, wallet errors) is returned immediately
//! - Wallet submissions are never retried here; only the user retries those

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::{FlowError, FlowResult};
use crate::prepare::{Action, ActionParams, RequestBuilder};
use crate::resilience::backoff::policy_backoff;
use crate::sequence::step::Step;

/// Delay before the next attempt, or `None` if `error` must be surfaced now.
pub fn retry_delay(policy: &RetryConfig, error: &FlowError, attempt: u32) -> Option<Duration> {
    match error {
        FlowError::RateLimited { retry_after_secs }
            if *retry_after_secs <= policy.max_retry_after_secs =>
        {
            Some(Duration::from_secs(*retry_after_secs))
        }
        FlowError::ServiceUnavailable(_) if !error.is_malformed_response() => {
            Some(policy_backoff(policy, attempt))
        }
        _ => None,
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
pub async fn with_retry<T, F, Fut>(policy: &RetryConfig, op_name: &str, mut op: F) -> FlowResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FlowResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt >= policy.max_attempts {
            return Err(error);
        }
        let Some(delay) = retry_delay(policy, &error, attempt) else {
            return Err(error);
        };

        tracing::warn!(
            op = op_name,
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying after transient failure"
        );
        sleep(delay).await;
    }
}

/// [`RequestBuilder::prepare`] under the retry policy.
pub async fn prepare_with_retry(
    builder: &RequestBuilder,
    policy: &RetryConfig,
    action: Action,
    params: &ActionParams,
) -> FlowResult<Vec<Step>> {
    with_retry(policy, "prepare", move || builder.prepare(action, params)).await
}
