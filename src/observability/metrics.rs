//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, backend
//! - `gateway_request_duration_seconds` (histogram): latency by backend
//! - `gateway_backend_healthy` (gauge): 1=healthy, 0=unhealthy, per backend
//! - `gateway_policy_denied_total` (counter): requests rejected by policy
//! - `gateway_upstream_retries_total` (counter): bounded retries taken

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(
                "gateway_requests_total",
                "Total requests handled, by method, status, and backend"
            );
            describe_histogram!(
                "gateway_request_duration_seconds",
                "Request latency in seconds, by backend"
            );
            describe_gauge!(
                "gateway_backend_healthy",
                "Backend health (1 healthy, 0 unhealthy)"
            );
            describe_counter!(
                "gateway_policy_denied_total",
                "Requests rejected by the policy engine"
            );
            describe_counter!(
                "gateway_upstream_retries_total",
                "Forwarding retries against an alternate backend"
            );
            tracing::info!(address = %addr, "metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to install metrics exporter");
        }
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a backend's current health.
pub fn record_backend_health(backend: &str, healthy: bool) {
    gauge!(
        "gateway_backend_healthy",
        "backend" => backend.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a policy denial.
pub fn record_policy_denied() {
    counter!("gateway_policy_denied_total").increment(1);
}

/// Record a bounded retry against an alternate backend.
pub fn record_upstream_retry() {
    counter!("gateway_upstream_retries_total").increment(1);
}
