//! Tracking service client over real HTTP.

use alloy::primitives::{Address, TxHash};
use serde_json::json;
use uuid::Uuid;

use txflow::config::TrackerConfig;
use txflow::prepare::{Action, Domain};
use txflow::sequence::Stage;
use txflow::tracker::{
    HttpTracker, Tracker, TrackerError, TrackingContext, TrackingHandle, TrackingStatus,
};

mod common;
use common::{start_recording_backend, MockResponse};

fn context() -> TrackingContext {
    TrackingContext {
        sequence_id: Uuid::new_v4(),
        domain: Domain::Lending,
        action: Action::Withdraw,
        chain_id: 43114,
        user_address: Address::repeat_byte(0x42),
        token: "USDC".into(),
        amount: "25".into(),
        step_count: 2,
    }
}

fn tracker(addr: std::net::SocketAddr) -> HttpTracker {
    HttpTracker::new(&TrackerConfig {
        enabled: true,
        base_url: format!("http://{}", addr),
        request_timeout_secs: 5,
        hook_timeout_ms: 1500,
    })
    .unwrap()
}

#[tokio::test]
async fn test_hooks_hit_expected_endpoints() {
    let (addr, seen) = start_recording_backend(|req, _| match req.path.as_str() {
        "/tracking/start" => MockResponse::json(201, json!({"id": "trk-1"})),
        "/tracking/trk-1" => MockResponse::json(
            200,
            json!({
                "id": "trk-1",
                "status": "pending",
                "txHashes": [TxHash::repeat_byte(0xaa)],
            }),
        ),
        _ => MockResponse::json(200, json!({})),
    })
    .await;

    let handle = tracker(addr).start_tracking(&context()).await.unwrap();
    assert_eq!(handle.id(), "trk-1");

    handle.add_tx_hash(TxHash::repeat_byte(0xaa)).await.unwrap();
    handle.mark_submitted().await.unwrap();
    handle.mark_failed("user_rejected").await.unwrap();

    let record = handle.get_transaction().await.unwrap();
    assert_eq!(record.status, TrackingStatus::Pending);
    assert_eq!(record.display_stage(), Stage::Timeout);
    assert_eq!(record.latest_hash(), Some(TxHash::repeat_byte(0xaa)));

    let seen = seen.lock().unwrap();
    let paths: Vec<(&str, &str)> = seen
        .iter()
        .map(|r| (r.method.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("POST", "/tracking/start"),
            ("POST", "/tracking/trk-1/hash"),
            ("POST", "/tracking/trk-1/status"),
            ("POST", "/tracking/trk-1/status"),
            ("GET", "/tracking/trk-1"),
        ]
    );

    assert_eq!(seen[0].json()["action"], "withdraw");
    assert_eq!(seen[0].json()["stepCount"], 2);
    assert_eq!(
        seen[1].json()["txHash"],
        json!(TxHash::repeat_byte(0xaa))
    );
    assert_eq!(seen[2].json(), json!({"status": "submitted"}));
    assert_eq!(
        seen[3].json(),
        json!({"status": "failed", "reason": "user_rejected"})
    );
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let (addr, _) = start_recording_backend(|_, _| MockResponse::new(404, "")).await;

    let err = tracker(addr).handle("missing").get_transaction().await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(id) if id == "missing"));
}

#[tokio::test]
async fn test_start_failure_is_reported() {
    let (addr, _) = start_recording_backend(|_, _| MockResponse::new(503, "down")).await;

    let err = match tracker(addr).start_tracking(&context()).await {
        Ok(_) => panic!("start should fail"),
        Err(e) => e,
    };
    assert!(matches!(err, TrackerError::Status { status: 503, .. }));
}
