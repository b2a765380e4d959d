//! Prometheus metrics for the dispatch engine.
//!
//! - Batch metrics (batches sent, recipients per batch, batch latency)
//! - Gateway response metrics (by status class, throttled retries)
//! - Outcome metrics (recipients removed, updated, invalid)
//! - Send failures by error kind

mod helpers;

pub use helpers::{encode_metrics, DispatchMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "gcm";

lazy_static! {
    // ============================================================================
    // Batch Metrics
    // ============================================================================

    /// Batches accepted by the gateway
    pub static ref BATCHES_SENT_TOTAL: IntCounter = register_int_counter!(
        format!("{}_batches_sent_total", METRIC_PREFIX),
        "Total batches accepted by the gateway"
    ).unwrap();

    /// Recipients carried by accepted batches
    pub static ref RECIPIENTS_SENT_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_sent_total", METRIC_PREFIX),
        "Total recipients in accepted batches"
    ).unwrap();

    /// Time from first attempt to acceptance, retries included
    pub static ref BATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_batch_latency_seconds", METRIC_PREFIX),
        "Batch dispatch latency in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // ============================================================================
    // Gateway Metrics
    // ============================================================================

    /// Gateway responses by status class
    pub static ref GATEWAY_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_gateway_responses_total", METRIC_PREFIX),
        "Gateway responses by status class",
        &["class"]
    ).unwrap();

    /// Throttled re-attempts
    pub static ref GATEWAY_RETRIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_gateway_retries_total", METRIC_PREFIX),
        "Total throttled batch re-attempts"
    ).unwrap();

    // ============================================================================
    // Outcome Metrics
    // ============================================================================

    /// Recipients per outcome category
    pub static ref OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_outcomes_total", METRIC_PREFIX),
        "Recipients by outcome category",
        &["category"]
    ).unwrap();

    /// Aborted sends by error kind
    pub static ref SENDS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sends_failed_total", METRIC_PREFIX),
        "Aborted sends by error kind",
        &["kind"]
    ).unwrap();
}
