mod settings;

pub use settings::{GatewaySettings, LogFormat, LogSettings, RetrySettings, Settings};
