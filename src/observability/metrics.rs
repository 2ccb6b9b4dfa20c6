//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (outcomes, latency, route count)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by final state
//! - `dispatch_duration_seconds` (histogram): latency by final state
//! - `route_table_size` (gauge): resources in the reverse-mapping table
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels limited to the request state to keep cardinality fixed

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::RequestState;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the final state of one request.
pub fn record_dispatch(state: RequestState, start_time: Instant) {
    let outcome = state.as_str();
    metrics::counter!("dispatch_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("dispatch_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_route_table_size(size: usize) {
    metrics::gauge!("route_table_size").set(size as f64);
}
