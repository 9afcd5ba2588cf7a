//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): requests by outcome (authorized/rejected)
//! - `gate_rejections_total` (counter): rejections by reason
//! - `gate_key_refresh_total` (counter): key refresh attempts by outcome
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic counters via the metrics facade)
//! - Exposed on a separate Prometheus scrape address when enabled

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a request by gate outcome.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("gate_requests_total", "outcome" => outcome).increment(1);
}

/// Count a rejection by reason.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("gate_rejections_total", "reason" => reason).increment(1);
}

/// Count a key refresh attempt by outcome.
pub fn record_key_refresh(outcome: &'static str) {
    metrics::counter!("gate_key_refresh_total", "outcome" => outcome).increment(1);
}
