//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Accepted swaps and redeems
//! - Rejections by operation and error kind
//! - Alerting rejections (forged attestations, replays, custody faults)
//! - Destination chain status

use crate::error::BridgeError;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref SWAPS_ACCEPTED: CounterVec = register_counter_vec!(
        "bridge_swaps_accepted_total",
        "Total swaps accepted by destination chain",
        &["dest_chain"]
    ).unwrap();

    pub static ref REDEEMS_ACCEPTED: CounterVec = register_counter_vec!(
        "bridge_redeems_accepted_total",
        "Total redeems accepted",
        &["chain_id"]
    ).unwrap();

    pub static ref REJECTIONS: CounterVec = register_counter_vec!(
        "bridge_rejections_total",
        "Total rejected operations by error kind",
        &["operation", "kind"]
    ).unwrap();

    pub static ref ALERTS: CounterVec = register_counter_vec!(
        "bridge_alerts_total",
        "Rejections that warrant operator attention",
        &["operation", "kind"]
    ).unwrap();

    pub static ref CHAIN_ENABLED: GaugeVec = register_gauge_vec!(
        "bridge_chain_enabled",
        "Destination chain status (1=enabled, 0=disabled)",
        &["chain_id"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// Helper functions to record metrics

pub fn record_swap(dest_chain: u64) {
    SWAPS_ACCEPTED
        .with_label_values(&[&dest_chain.to_string()])
        .inc();
}

pub fn record_redeem(chain_id: u64) {
    REDEEMS_ACCEPTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_rejection(operation: &str, error: &BridgeError) {
    REJECTIONS
        .with_label_values(&[operation, error.kind()])
        .inc();
    if error.should_alert() {
        ALERTS.with_label_values(&[operation, error.kind()]).inc();
    }
}

pub fn record_chain_status(chain_id: u64, enabled: bool) {
    CHAIN_ENABLED
        .with_label_values(&[&chain_id.to_string()])
        .set(if enabled { 1.0 } else { 0.0 });
}
