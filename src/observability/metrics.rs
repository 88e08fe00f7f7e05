//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method and status
//! - `relay_request_duration_seconds` (histogram): time until upstream headers
//! - `relay_upstream_errors_total` (counter): aborted requests by error kind
//! - `relay_streamed_bytes_total` (counter): body bytes handed to clients

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

/// Record a request whose upstream answered.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relay_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request aborted with a 500 before streaming began.
pub fn record_upstream_error(method: &str, kind: &'static str) {
    counter!("relay_requests_total", "method" => method.to_string(), "status" => "500").increment(1);
    counter!("relay_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record the body bytes relayed for one response.
pub fn record_streamed_bytes(bytes: u64) {
    counter!("relay_streamed_bytes_total").increment(bytes);
}
