use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::dispatcher::DispatcherConfig;
use crate::gateway::{RetryPolicy, DEFAULT_ENDPOINT};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// API key sent as `Authorization: key=<auth>`
    pub auth: Option<String>,
    #[serde(default)]
    pub verbose: bool,
    /// Ask the gateway to validate without delivering
    #[serde(default)]
    pub dry_run: bool,
    /// Requested batch size, clamped to the provider limit
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrySettings {
    /// Maximum throttled re-attempts per batch (unset = unbounded)
    pub max_retries: Option<u32>,
    /// Upper bound on a provider-requested delay
    pub max_delay_seconds: Option<u64>,
    /// Random spread added to each delay (0.0 to 1.0)
    #[serde(default)]
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_group_size() -> usize {
    1000
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("gateway.verbose", false)?
            .set_default("gateway.dry_run", false)?
            .set_default("gateway.group_size", 1000)?
            .set_default("gateway.endpoint", DEFAULT_ENDPOINT)?
            .set_default("gateway.request_timeout_seconds", 30)?
            .set_default("retry.jitter_factor", 0.0)?
            .set_default("log.format", "pretty")?
            .set_default("log.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PUSH_GATEWAY__AUTH, PUSH_GATEWAY__GROUP_SIZE, PUSH_RETRY__MAX_RETRIES, ...
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Engine configuration derived from the gateway section.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::new(self.gateway.auth.clone())
            .with_verbose(self.gateway.verbose)
            .with_dry_run(self.gateway.dry_run)
            .with_group_size(self.gateway.group_size)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            max_delay: self.retry.max_delay_seconds.map(Duration::from_secs),
            jitter_factor: self.retry.jitter_factor.clamp(0.0, 1.0),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.request_timeout_seconds)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            auth: None,
            verbose: false,
            dry_run: false,
            group_size: default_group_size(),
            endpoint: default_endpoint(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}
