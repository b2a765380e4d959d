//! Gateway client: one batch, one logical exchange with the push gateway.
//!
//! - `types`: send options, wire payload and reply shapes
//! - `transport`: the transport trait and its reqwest implementation
//! - `retry`: `retry-after` parsing and the retry policy
//! - `reconcile`: per-recipient result categorization

mod client;
mod reconcile;
mod retry;
mod transport;
mod types;

pub use client::{GatewayClient, MAX_BATCH_SIZE};
pub use reconcile::{reconcile, NOT_REGISTERED};
pub use retry::{parse_retry_after, RetryPolicy};
pub use transport::{
    GatewayRequest, GatewayResponse, GatewayTransport, HttpTransport, DEFAULT_ENDPOINT,
};
pub use types::{
    BatchOutcome, MulticastResponse, RecipientResult, SendOptions, UpdatedId, WirePayload,
};
