//! Metrics collection.
//!
//! # Metrics
//! - `wallet_session_transitions_total` (counter): session state changes by kind
//! - `wallet_transfers_total` (counter): transfer outcomes by token and result
//! - `wallet_topups_total` (counter): treasury top-ups by result
//! - `wallet_provider_faults_total` (counter): normalized provider faults by kind
//!
//! The library only records. A binary opts into exposition with
//! [`init_metrics`].

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics listener started");
    Ok(())
}

pub fn record_session_transition(kind: &'static str) {
    counter!("wallet_session_transitions_total", "kind" => kind).increment(1);
}

pub fn record_transfer(token: &str, result: &'static str) {
    counter!(
        "wallet_transfers_total",
        "token" => token.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_topup(result: &'static str) {
    counter!("wallet_topups_total", "result" => result).increment(1);
}

pub fn record_provider_fault(kind: &'static str) {
    counter!("wallet_provider_faults_total", "kind" => kind).increment(1);
}
