//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_upstream_failures_total` (counter): transport failures by service
//! - `gateway_circuit_transitions_total` (counter): breaker moves by service, target state
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::State;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(service: &str) {
    metrics::counter!("gateway_upstream_failures_total", "service" => service.to_string()).increment(1);
}

pub fn record_circuit_transition(service: &str, to: State) {
    metrics::counter!(
        "gateway_circuit_transitions_total",
        "service" => service.to_string(),
        "to" => to.as_str()
    )
    .increment(1);

    let value = match to {
        State::Closed => 0.0,
        State::HalfOpen => 1.0,
        State::Open => 2.0,
    };
    metrics::gauge!("gateway_circuit_state", "service" => service.to_string()).set(value);
}
