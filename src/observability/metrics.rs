//! Metrics collection and exposition.
//!
//! # Metrics
//! - `txflow_stage_transitions_total` (counter): step stage changes by stage
//! - `txflow_prepare_requests_total` (counter): prepare calls by domain, outcome
//! - `txflow_receipt_polls_total` (counter): receipt lookups by result
//! - `txflow_receipt_wait_seconds` (histogram): time to a terminal receipt outcome
//! - `txflow_tracker_failures_total` (counter): swallowed tracker errors by hook
//!
//! Recording is a no-op until [`init_metrics`] installs an exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_stage_transition(stage: &'static str) {
    counter!("txflow_stage_transitions_total", "stage" => stage).increment(1);
}

pub fn record_prepare_request(domain: &'static str, outcome: &'static str) {
    counter!("txflow_prepare_requests_total", "domain" => domain, "outcome" => outcome)
        .increment(1);
}

pub fn record_receipt_poll(result: &'static str) {
    counter!("txflow_receipt_polls_total", "result" => result).increment(1);
}

pub fn record_receipt_wait(outcome: &'static str, elapsed: Duration) {
    histogram!("txflow_receipt_wait_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub fn record_tracker_failure(hook: &'static str) {
    counter!("txflow_tracker_failures_total", "hook" => hook).increment(1);
}
