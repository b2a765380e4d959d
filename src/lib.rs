// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Dispatch engine
pub mod dispatcher;
pub mod gateway;

pub use dispatcher::{
    ChannelObserver, DispatcherConfig, OutcomeEvent, OutcomeObserver, PushDispatcher, SendReport,
};
pub use error::DispatchError;
pub use gateway::{
    BatchOutcome, GatewayClient, GatewayTransport, HttpTransport, RetryPolicy, SendOptions,
    UpdatedId,
};
