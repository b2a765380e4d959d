use thiserror::Error;

/// Errors surfaced by a send or by a single batch dispatch.
///
/// Throttling (5xx with a usable `retry-after`) is absorbed by the gateway
/// client and never shows up here.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no auth token given")]
    MissingAuth,

    #[error("recipient list is empty")]
    EmptyRecipientList,

    #[error("batch size {size} outside of (0, 1000]")]
    BatchSize { size: usize },

    #[error("gateway returned {status} without a usable retry-after header")]
    ServerErrorNoRetry { status: u16 },

    #[error("invalid request fields or reserved words in the data payload")]
    InvalidRequest,

    #[error("gateway rejected the auth credential")]
    Authentication,

    #[error("gateway still throttling (status {status}) after {attempts} attempts")]
    RetryLimitExceeded { status: u16, attempts: u32 },

    #[error("malformed gateway response (status {status}): {source}")]
    MalformedResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Local precondition violations, raised before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::MissingAuth | Self::EmptyRecipientList | Self::BatchSize { .. }
        )
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAuth => "missing_auth",
            Self::EmptyRecipientList => "empty_recipients",
            Self::BatchSize { .. } => "batch_size",
            Self::ServerErrorNoRetry { .. } => "server_error",
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::RetryLimitExceeded { .. } => "retry_limit",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Serialization(_) => "serialization",
            Self::Transport(_) => "transport",
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
