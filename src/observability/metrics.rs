//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_inbound_requests_total` (counter): inbound calls by relay, status
//! - `relay_forward_attempts_total` (counter): destination attempts by relay, outcome
//! - `relay_forward_duration_seconds` (histogram): attempt latency
//! - `relay_forward_in_flight` (gauge): attempts currently holding an admission slot
//!
//! # Design Decisions
//! - Recording is always on; without an installed exporter the calls are no-ops
//! - The Prometheus endpoint is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::forward::outcome::ForwardOutcome;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

pub fn record_inbound(relay: &str, status: u16) {
    metrics::counter!(
        "relay_inbound_requests_total",
        "relay" => relay.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_forward(relay: &str, outcome: &ForwardOutcome) {
    let label = outcome.label();
    metrics::counter!(
        "relay_forward_attempts_total",
        "relay" => relay.to_string(),
        "outcome" => label
    )
    .increment(1);

    if let Some(latency) = outcome.latency() {
        metrics::histogram!(
            "relay_forward_duration_seconds",
            "relay" => relay.to_string(),
            "outcome" => label
        )
        .record(latency.as_secs_f64());
    }
}

pub fn inc_in_flight() {
    metrics::gauge!("relay_forward_in_flight").increment(1.0);
}

pub fn dec_in_flight() {
    metrics::gauge!("relay_forward_in_flight").decrement(1.0);
}
