//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (requests by outcome, staged files, upstream latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by outcome
//! - `relay_files_staged_total` (counter): files written to scratch storage
//! - `relay_upstream_duration_seconds` (histogram): outbound call latency
//! - `relay_rate_limited_total` (counter): requests rejected by the limiter
//! - `relay_cleanup_failures_total` (counter): staged files that could not be removed
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Outcome labels are a fixed set of static strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str) {
    counter!("relay_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_files_staged(count: usize) {
    counter!("relay_files_staged_total").increment(count as u64);
}

pub fn record_upstream_latency(start: Instant) {
    histogram!("relay_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("relay_rate_limited_total").increment(1);
}

pub fn record_cleanup_failure() {
    counter!("relay_cleanup_failures_total").increment(1);
}
