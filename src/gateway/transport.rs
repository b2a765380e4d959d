//! Transport abstraction for reaching the push gateway.
//!
//! The gateway client only deals in [`GatewayRequest`] and
//! [`GatewayResponse`]; [`HttpTransport`] is the reqwest-backed
//! implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};

use crate::error::{DispatchError, Result};

/// Fixed gateway endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://android.googleapis.com/gcm/send";

/// One outgoing POST, already encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    /// Header name/value pairs, in insertion order
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: String,
}

impl GatewayRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The parts of a gateway reply the client acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    /// Raw `retry-after` header, if present
    pub retry_after: Option<String>,
    pub body: String,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }
}

/// A single request/response exchange with the gateway.
///
/// Implementations must not retry on their own; connection and protocol
/// failures are returned as [`DispatchError::Transport`].
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn post(&self, request: &GatewayRequest) -> Result<GatewayResponse>;
}

/// HTTPS transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Transport for the default gateway endpoint.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Transport(Box::new(e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DispatchError::Transport(Box::new(e)))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| DispatchError::Transport(Box::new(e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn post(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(header_map(&request.headers)?)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| DispatchError::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::Transport(Box::new(e)))?;

        Ok(GatewayResponse {
            status,
            retry_after,
            body,
        })
    }
}
