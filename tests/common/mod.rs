//! Shared test doubles for the dispatch integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use gcm_batch_dispatcher::error::{DispatchError, Result};
use gcm_batch_dispatcher::gateway::{GatewayRequest, GatewayResponse, GatewayTransport};

/// In-memory gateway.
///
/// Queued overrides are answered first; otherwise every recipient gets a
/// result derived from its id prefix:
/// - `dead-*` -> `NotRegistered`
/// - `bad-*` -> `InvalidRegistration`
/// - `old-*` -> canonical id `new-*`
/// - anything else -> delivered
///
/// `failing_on(n)` makes the n-th request (1-based) fail at the transport
/// level instead of answering.
pub struct FakeGateway {
    overrides: Mutex<VecDeque<GatewayResponse>>,
    fail_on: Option<usize>,
    requests: Mutex<Vec<GatewayRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Self::with_overrides(Vec::new())
    }

    pub fn with_overrides(overrides: Vec<GatewayResponse>) -> Arc<Self> {
        Self::build(overrides, None)
    }

    pub fn failing_on(request: usize) -> Arc<Self> {
        Self::build(Vec::new(), Some(request))
    }

    fn build(overrides: Vec<GatewayResponse>, fail_on: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            overrides: Mutex::new(overrides.into()),
            fail_on,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::from_millis(10),
        })
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recipient ids of every request, in issue order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.requests()
            .iter()
            .map(|request| registration_ids(request))
            .collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn registration_ids(request: &GatewayRequest) -> Vec<String> {
    let body: Value = serde_json::from_str(&request.body).unwrap();
    body["registration_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|id| id.as_str().unwrap().to_string())
        .collect()
}

/// Accepted reply for `ids`, following the prefix rules above.
pub fn accepted_for(ids: &[String]) -> GatewayResponse {
    let mut failure = 0;
    let mut canonical = 0;
    let results: Vec<Value> = ids
        .iter()
        .map(|id| {
            if id.starts_with("dead-") {
                failure += 1;
                json!({ "error": "NotRegistered" })
            } else if id.starts_with("bad-") {
                failure += 1;
                json!({ "error": "InvalidRegistration" })
            } else if let Some(rest) = id.strip_prefix("old-") {
                canonical += 1;
                json!({ "message_id": "0:1", "registration_id": format!("new-{}", rest) })
            } else {
                json!({ "message_id": "0:1" })
            }
        })
        .collect();

    let body = json!({
        "multicast_id": 5_000_001,
        "success": ids.len() - failure,
        "failure": failure,
        "canonical_ids": canonical,
        "results": results,
    });
    GatewayResponse::new(200, body.to_string())
}

#[async_trait]
impl GatewayTransport for FakeGateway {
    async fn post(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let issued = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on == Some(issued) {
            return Err(DispatchError::Transport(Box::new(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by gateway",
            ))));
        }

        let scripted = self.overrides.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| accepted_for(&registration_ids(request))))
    }
}

pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}
