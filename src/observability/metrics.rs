//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lookup_requests_total` (counter): requests by protocol, outcome
//! - `lookup_backend_duration_seconds` (histogram): backend call latency
//! - `lookup_active_sessions` (gauge): open stream sessions by protocol
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::protocol::StreamProtocol;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(protocol: &'static str, outcome: &'static str) {
    metrics::counter!("lookup_requests_total", "protocol" => protocol, "outcome" => outcome).increment(1);
}

pub fn record_backend_call(protocol: &'static str, elapsed: Duration) {
    metrics::histogram!("lookup_backend_duration_seconds", "protocol" => protocol).record(elapsed.as_secs_f64());
}

pub fn session_opened(protocol: StreamProtocol) {
    metrics::gauge!("lookup_active_sessions", "protocol" => protocol.name()).increment(1.0);
}

pub fn session_closed(protocol: StreamProtocol) {
    metrics::gauge!("lookup_active_sessions", "protocol" => protocol.name()).decrement(1.0);
}
