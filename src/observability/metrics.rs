//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): gate outcomes by `outcome`
//! - `gateway_auth_failures_total` (counter): rejected credentials by `reason`
//! - `gateway_rate_limited_total` (counter): limiter rejections
//! - `gateway_audit_records_total` (counter): emitted records by `success`
//! - `gateway_audit_sink_errors_total` (counter): swallowed sink failures by `sink`
//! - `gateway_generation_requests_total` (counter): provider calls by `outcome`
//! - `gateway_generation_duration_seconds` (histogram): provider latency

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_gate_outcome(outcome: &'static str) {
    counter!("gateway_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("gateway_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_audit(success: bool) {
    let label = if success { "true" } else { "false" };
    counter!("gateway_audit_records_total", "success" => label).increment(1);
}

pub fn record_audit_sink_error(sink: &'static str) {
    counter!("gateway_audit_sink_errors_total", "sink" => sink).increment(1);
}

pub fn record_generation(outcome: &'static str, started: Instant) {
    counter!("gateway_generation_requests_total", "outcome" => outcome).increment(1);
    histogram!("gateway_generation_duration_seconds").record(started.elapsed().as_secs_f64());
}
