//! Batch partitioner and driver.
//!
//! [`PushDispatcher::send`] splits a recipient list into gateway-sized
//! batches and pushes them through the [`GatewayClient`] strictly one at a
//! time, merging each batch's categorized outcome into the send's report.
//!
//! # Failure reporting
//!
//! The first batch error aborts the send and is returned on its own. The
//! outcome of batches that already succeeded is not part of the error;
//! observers will have seen those batches' incremental lists.

mod config;
mod observer;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::gateway::{BatchOutcome, GatewayClient, SendOptions};
use crate::metrics::DispatchMetrics;

pub use config::DispatcherConfig;
pub use observer::{ChannelObserver, OutcomeEvent, OutcomeObserver};

/// Aggregate result of one completed send.
#[derive(Debug, Clone, Serialize)]
pub struct SendReport {
    pub send_id: Uuid,
    /// Number of recipients handed to `send`
    pub total: usize,
    /// Number of batches accepted by the gateway
    pub batches: usize,
    /// Wall-clock time from the first batch to the last reply
    pub elapsed: Duration,
    /// Completion summary, same text as [`PushDispatcher::status`]
    pub status: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Statistics for the dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub sends_completed: AtomicU64,
    pub sends_failed: AtomicU64,
    pub batches_sent: AtomicU64,
    pub removed: AtomicU64,
    pub updated: AtomicU64,
    pub invalid: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            sends_completed: self.sends_completed.load(Ordering::Relaxed),
            sends_failed: self.sends_failed.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
        }
    }

    fn record_batch(&self, outcome: &BatchOutcome) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.removed
            .fetch_add(outcome.removed.len() as u64, Ordering::Relaxed);
        self.updated
            .fetch_add(outcome.updated.len() as u64, Ordering::Relaxed);
        self.invalid
            .fetch_add(outcome.invalid.len() as u64, Ordering::Relaxed);
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub sends_completed: u64,
    pub sends_failed: u64,
    pub batches_sent: u64,
    pub removed: u64,
    pub updated: u64,
    pub invalid: u64,
}

/// Push notification dispatch engine.
pub struct PushDispatcher {
    client: GatewayClient,
    config: RwLock<Arc<DispatcherConfig>>,
    status: RwLock<String>,
    observers: RwLock<Vec<Arc<dyn OutcomeObserver>>>,
    stats: DispatcherStats,
}

impl PushDispatcher {
    pub fn new(config: DispatcherConfig, client: GatewayClient) -> Self {
        Self {
            client,
            config: RwLock::new(Arc::new(config)),
            status: RwLock::new(String::new()),
            observers: RwLock::new(Vec::new()),
            stats: DispatcherStats::default(),
        }
    }

    /// Replace the configuration; sends already running keep their snapshot.
    pub fn set_config(&self, config: DispatcherConfig) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(config);
    }

    pub fn config(&self) -> Arc<DispatcherConfig> {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Latest status line written by any send on this instance.
    pub fn status(&self) -> String {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn add_observer(&self, observer: Arc<dyn OutcomeObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Push to every recipient, in batches, and report the categorized
    /// outcome.
    ///
    /// `recipients` is consumed. Preconditions (credential configured,
    /// non-empty list) are checked before any request is made.
    pub async fn send(&self, recipients: Vec<String>, options: &SendOptions) -> Result<SendReport> {
        let config = self.config();
        let send_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatcher.send",
            send_id = %send_id,
            total = recipients.len()
        );

        let result = self
            .run(send_id, config, recipients, options)
            .instrument(span)
            .await;

        match &result {
            Ok(_) => {
                self.stats.sends_completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.sends_failed.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_send_failed(e.kind());
                tracing::warn!(send_id = %send_id, error = %e, "Send aborted");
            }
        }

        result
    }

    async fn run(
        &self,
        send_id: Uuid,
        config: Arc<DispatcherConfig>,
        recipients: Vec<String>,
        options: &SendOptions,
    ) -> Result<SendReport> {
        if config.auth().is_none() {
            return Err(DispatchError::MissingAuth);
        }
        if recipients.is_empty() {
            return Err(DispatchError::EmptyRecipientList);
        }

        let total = recipients.len();
        let started = Instant::now();
        let mut remaining: VecDeque<String> = recipients.into();
        let mut outcome = BatchOutcome::default();
        let mut batches = 0;

        self.set_status(format!("push messages to {} devices", total), config.verbose());

        loop {
            let size = config.group_size().min(remaining.len());
            let batch: Vec<String> = remaining.drain(..size).collect();
            if batch.is_empty() {
                break;
            }

            let batch_outcome = self.client.dispatch_batch(&batch, options, &config).await?;
            batches += 1;
            self.stats.record_batch(&batch_outcome);
            DispatchMetrics::record_outcome(&batch_outcome);
            self.notify(&batch_outcome);
            outcome.merge(batch_outcome);
        }

        let elapsed = started.elapsed();
        let status = completion_status(total, &outcome, elapsed.as_secs_f64());
        self.set_status(status.clone(), config.verbose());

        Ok(SendReport {
            send_id,
            total,
            batches,
            elapsed,
            status,
            outcome,
        })
    }

    fn notify(&self, outcome: &BatchOutcome) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for observer in &observers {
            if !outcome.removed.is_empty() {
                observer.on_removed(&outcome.removed);
            }
            if !outcome.updated.is_empty() {
                observer.on_updated(&outcome.updated);
            }
            if !outcome.invalid.is_empty() {
                observer.on_invalid(&outcome.invalid);
            }
        }
    }

    fn set_status(&self, status: String, verbose: bool) {
        if verbose {
            tracing::info!(status = %status, "Send status");
        } else {
            tracing::debug!(status = %status, "Send status");
        }
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }
}

fn completion_status(total: usize, outcome: &BatchOutcome, elapsed_secs: f64) -> String {
    let mut status = format!("pushed to {} devices", total);
    if !outcome.removed.is_empty() {
        status.push_str(&format!(", {} removed", outcome.removed.len()));
    }
    if !outcome.updated.is_empty() {
        status.push_str(&format!(", {} updated", outcome.updated.len()));
    }
    if !outcome.invalid.is_empty() {
        status.push_str(&format!(", {} invalid", outcome.invalid.len()));
    }
    status.push_str(&format!(", elapsed time: {:.3}S", elapsed_secs));
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayRequest, GatewayResponse, GatewayTransport, UpdatedId};
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl GatewayTransport for Unreachable {
        async fn post(&self, _request: &GatewayRequest) -> Result<GatewayResponse> {
            panic!("no request expected");
        }
    }

    fn dispatcher(config: DispatcherConfig) -> PushDispatcher {
        PushDispatcher::new(config, GatewayClient::new(Arc::new(Unreachable)))
    }

    #[test]
    fn test_completion_status() {
        let outcome = BatchOutcome {
            removed: vec!["a".to_string(), "b".to_string()],
            updated: vec![UpdatedId {
                old_id: "c".to_string(),
                new_id: "d".to_string(),
            }],
            invalid: vec![],
        };

        assert_eq!(
            completion_status(10, &outcome, 1.5),
            "pushed to 10 devices, 2 removed, 1 updated, elapsed time: 1.500S"
        );
        assert_eq!(
            completion_status(3, &BatchOutcome::default(), 0.25),
            "pushed to 3 devices, elapsed time: 0.250S"
        );
    }

    #[tokio::test]
    async fn test_missing_auth() {
        let dispatcher = dispatcher(DispatcherConfig::default());
        let err = dispatcher
            .send(vec!["a".to_string()], &SendOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MissingAuth));
        assert_eq!(dispatcher.stats().sends_failed, 1);
        assert!(dispatcher.status().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recipients() {
        let dispatcher = dispatcher(DispatcherConfig::new(Some("k".to_string())));
        let err = dispatcher
            .send(Vec::new(), &SendOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::EmptyRecipientList));
    }

    #[test]
    fn test_set_config_replaces_snapshot() {
        let dispatcher = dispatcher(DispatcherConfig::default());
        let before = dispatcher.config();

        dispatcher.set_config(DispatcherConfig::new(Some("k".to_string())).with_group_size(10));

        assert_eq!(before.auth(), None);
        assert_eq!(dispatcher.config().auth(), Some("k"));
        assert_eq!(dispatcher.config().group_size(), 10);
    }
}
