//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::gateway::BatchOutcome;

use super::{
    BATCHES_SENT_TOTAL, BATCH_LATENCY, GATEWAY_RESPONSES_TOTAL, GATEWAY_RETRIES_TOTAL,
    OUTCOMES_TOTAL, RECIPIENTS_SENT_TOTAL, SENDS_FAILED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a batch accepted by the gateway
    pub fn record_batch(size: usize, latency: Duration) {
        BATCHES_SENT_TOTAL.inc();
        RECIPIENTS_SENT_TOTAL.inc_by(size as u64);
        BATCH_LATENCY.observe(latency.as_secs_f64());
    }

    /// Record a gateway response status
    pub fn record_response(status: u16) {
        GATEWAY_RESPONSES_TOTAL
            .with_label_values(&[status_class(status)])
            .inc();
    }

    /// Record a throttled re-attempt
    pub fn record_retry() {
        GATEWAY_RETRIES_TOTAL.inc();
    }

    /// Record one batch's categorized recipients
    pub fn record_outcome(outcome: &BatchOutcome) {
        OUTCOMES_TOTAL
            .with_label_values(&["removed"])
            .inc_by(outcome.removed.len() as u64);
        OUTCOMES_TOTAL
            .with_label_values(&["updated"])
            .inc_by(outcome.updated.len() as u64);
        OUTCOMES_TOTAL
            .with_label_values(&["invalid"])
            .inc_by(outcome.invalid.len() as u64);
    }

    /// Record an aborted send
    pub fn record_send_failed(kind: &str) {
        SENDS_FAILED_TOTAL.with_label_values(&[kind]).inc();
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        200 => "ok",
        400 => "bad_request",
        401 => "unauthorized",
        500..=599 => "server_error",
        _ => "other",
    }
}
