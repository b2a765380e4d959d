use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::dispatcher::DispatcherConfig;
use crate::error::{DispatchError, Result};
use crate::metrics::DispatchMetrics;

use super::reconcile::reconcile;
use super::retry::{parse_retry_after, RetryPolicy};
use super::transport::{GatewayRequest, GatewayResponse, GatewayTransport};
use super::types::{BatchOutcome, MulticastResponse, SendOptions, WirePayload};

/// Hard per-request recipient limit imposed by the gateway.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Drives one batch through the gateway, including throttled re-attempts.
#[derive(Clone)]
pub struct GatewayClient {
    transport: Arc<dyn GatewayTransport>,
    retry: RetryPolicy,
}

/// What to do with a gateway reply.
enum Classified {
    Accepted(MulticastResponse),
    Throttled(std::time::Duration),
}

impl GatewayClient {
    pub fn new(transport: Arc<dyn GatewayTransport>) -> Self {
        Self::with_retry_policy(transport, RetryPolicy::default())
    }

    pub fn with_retry_policy(transport: Arc<dyn GatewayTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Build the POST for one batch.
    pub fn build_request(
        clients: &[String],
        options: &SendOptions,
        config: &DispatcherConfig,
    ) -> Result<GatewayRequest> {
        let body = serde_json::to_string(&WirePayload::new(clients, options))?;

        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("key={}", config.auth().unwrap_or_default()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if config.dry_run() || options.dry_run {
            headers.push(("dry_run".to_string(), "true".to_string()));
        }

        Ok(GatewayRequest { headers, body })
    }

    /// Send one batch and categorize its per-recipient results.
    ///
    /// A 5xx carrying a usable `retry-after` is re-sent unchanged after the
    /// requested delay; only the attempt that is finally accepted counts.
    #[tracing::instrument(
        name = "gateway.dispatch_batch",
        skip(self, clients, options, config),
        fields(batch_size = clients.len())
    )]
    pub async fn dispatch_batch(
        &self,
        clients: &[String],
        options: &SendOptions,
        config: &DispatcherConfig,
    ) -> Result<BatchOutcome> {
        if clients.is_empty() || clients.len() > MAX_BATCH_SIZE {
            return Err(DispatchError::BatchSize {
                size: clients.len(),
            });
        }

        let request = Self::build_request(clients, options, config)?;
        let started = Instant::now();
        let mut retries = 0u32;

        loop {
            let response = self.transport.post(&request).await?;

            match self.classify(&response, retries, config.verbose())? {
                Classified::Accepted(result) => {
                    log_summary(&result, config.verbose());
                    DispatchMetrics::record_batch(clients.len(), started.elapsed());
                    return Ok(reconcile(clients, &result));
                }
                Classified::Throttled(delay) => {
                    retries += 1;
                    DispatchMetrics::record_retry();
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn classify(
        &self,
        response: &GatewayResponse,
        retries: u32,
        verbose: bool,
    ) -> Result<Classified> {
        let status = response.status;
        DispatchMetrics::record_response(status);

        match status {
            500..=599 => {
                let Some(header) = response.retry_after.as_deref() else {
                    return Err(DispatchError::ServerErrorNoRetry { status });
                };
                let Some(requested) = parse_retry_after(header, Utc::now()) else {
                    tracing::warn!(status, retry_after = %header, "Unusable retry-after header");
                    return Err(DispatchError::ServerErrorNoRetry { status });
                };
                if !self.retry.allows(retries) {
                    return Err(DispatchError::RetryLimitExceeded {
                        status,
                        attempts: retries + 1,
                    });
                }

                let delay = self.retry.delay_for(requested);
                if verbose {
                    tracing::info!(status, delay_secs = delay.as_secs_f64(), "we retry after");
                } else {
                    tracing::debug!(status, delay_secs = delay.as_secs_f64(), "we retry after");
                }
                Ok(Classified::Throttled(delay))
            }
            400 => Err(DispatchError::InvalidRequest),
            401 => Err(DispatchError::Authentication),
            // 200 and anything not listed above is read as an accepted reply
            _ => serde_json::from_str(&response.body)
                .map(Classified::Accepted)
                .map_err(|source| DispatchError::MalformedResponse { status, source }),
        }
    }
}

fn log_summary(result: &MulticastResponse, verbose: bool) {
    if verbose {
        tracing::info!(
            multicast_id = ?result.multicast_id,
            success = result.success,
            failure = result.failure,
            canonical_ids = result.canonical_ids,
            "Batch accepted"
        );
    } else {
        tracing::debug!(
            multicast_id = ?result.multicast_id,
            success = result.success,
            failure = result.failure,
            canonical_ids = result.canonical_ids,
            "Batch accepted"
        );
    }
}
