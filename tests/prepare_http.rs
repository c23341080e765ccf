//! Prepare endpoint behavior over real HTTP.

use std::sync::Arc;
use std::time::Instant;

use txflow::config::{BackendConfig, RetryConfig};
use txflow::prepare::{Action, HttpPrepareApi, RequestBuilder};
use txflow::resilience::retries::prepare_with_retry;
use txflow::sequence::StepRole;
use txflow::FlowError;

mod common;
use common::{domain, prepare_body, request, start_recording_backend, MockResponse};

fn builder(base_url: String) -> RequestBuilder {
    let api = HttpPrepareApi::new(&BackendConfig {
        base_url,
        request_timeout_secs: 5,
        default_retry_after_secs: 3,
    })
    .unwrap();
    RequestBuilder::new(
        Arc::new(api),
        domain(&[43114], &["USDC"]),
        domain(&[43114], &["AVAX"]),
    )
}

#[tokio::test]
async fn test_two_step_response_is_ordered() {
    let (addr, seen) = start_recording_backend(|_, _| {
        MockResponse::json(200, prepare_body(&["unstake", "approval"], 43114))
    })
    .await;

    let req = request(Action::Unstake, 43114, "avax");
    let steps = builder(format!("http://{}", addr))
        .prepare(req.action, &req.params)
        .await
        .unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].role, StepRole::Approval);
    assert!(steps[0].requires_follow_up);
    assert_eq!(steps[1].label, "unstake");
    assert_eq!(steps[1].gas_limit, 200_000);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path, "/staking/prepare/unstake");
    let body = seen[0].json();
    assert_eq!(body["chainId"], 43114);
    assert_eq!(body["token"], "avax");
    assert_eq!(body["amount"], "10");
    assert!(body["userAddress"].is_string());
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let (addr, _) = start_recording_backend(|_, _| {
        MockResponse::new(429, "slow down").with_header("Retry-After", "7")
    })
    .await;

    let req = request(Action::Supply, 43114, "USDC");
    let err = builder(format!("http://{}", addr))
        .prepare(req.action, &req.params)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::RateLimited {
            retry_after_secs: 7
        }
    ));
}

#[tokio::test]
async fn test_missing_retry_after_uses_default() {
    let (addr, _) = start_recording_backend(|_, _| MockResponse::new(429, "")).await;

    let req = request(Action::Supply, 43114, "USDC");
    let err = builder(format!("http://{}", addr))
        .prepare(req.action, &req.params)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::RateLimited {
            retry_after_secs: 3
        }
    ));
}

#[tokio::test]
async fn test_unprocessable_is_validation() {
    let (addr, _) = start_recording_backend(|_, _| {
        MockResponse::json(422, serde_json::json!({"message": "amount exceeds balance"}))
    })
    .await;

    let req = request(Action::Supply, 43114, "USDC");
    let err = builder(format!("http://{}", addr))
        .prepare(req.action, &req.params)
        .await
        .unwrap_err();
    match err {
        FlowError::Validation(msg) => assert_eq!(msg, "amount exceeds balance"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_service_unavailable() {
    let (addr, _) =
        start_recording_backend(|_, _| MockResponse::json(200, serde_json::json!({"steps": []})))
            .await;

    let req = request(Action::Supply, 43114, "USDC");
    let err = builder(format!("http://{}", addr))
        .prepare(req.action, &req.params)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_retry_policy_recovers_from_outage_and_rate_limit() {
    let (addr, seen) = start_recording_backend(|_, index| match index {
        0 => MockResponse::new(503, "maintenance"),
        1 => MockResponse::new(429, "").with_header("Retry-After", "1"),
        _ => MockResponse::json(200, prepare_body(&["supply"], 43114)),
    })
    .await;

    let policy = RetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
        max_delay_ms: 50,
        max_retry_after_secs: 5,
    };
    let req = request(Action::Supply, 43114, "USDC");
    let started = Instant::now();
    let steps = prepare_with_retry(
        &builder(format!("http://{}", addr)),
        &policy,
        req.action,
        &req.params,
    )
    .await
    .unwrap();

    assert_eq!(steps.len(), 1);
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert!(started.elapsed().as_millis() >= 1000);
}

#[tokio::test]
async fn test_retry_policy_never_retries_malformed_response() {
    let policy = RetryConfig {
        max_attempts: 4,
        base_delay_ms: 1,
        max_delay_ms: 5,
        max_retry_after_secs: 5,
    };
    // Undecodable body, then a decodable body for the wrong chain
    for body in [
        serde_json::json!({"steps": []}),
        prepare_body(&["supply"], 1),
    ] {
        let (addr, seen) =
            start_recording_backend(move |_, _| MockResponse::json(200, body.clone())).await;

        let req = request(Action::Supply, 43114, "USDC");
        let err = prepare_with_retry(
            &builder(format!("http://{}", addr)),
            &policy,
            req.action,
            &req.params,
        )
        .await
        .unwrap_err();

        assert!(err.is_malformed_response(), "unexpected error: {:?}", err);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_retry_policy_never_retries_validation() {
    let (addr, seen) =
        start_recording_backend(|_, _| MockResponse::new(400, "unsupported market")).await;

    let req = request(Action::Borrow, 43114, "USDC");
    let err = prepare_with_retry(
        &builder(format!("http://{}", addr)),
        &RetryConfig::default(),
        req.action,
        &req.params,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FlowError::Validation(_)));
    assert_eq!(seen.lock().unwrap().len(), 1);
}
