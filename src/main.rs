use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use gcm_batch_dispatcher::config::Settings;
use gcm_batch_dispatcher::gateway::{GatewayClient, HttpTransport, SendOptions};
use gcm_batch_dispatcher::{OutcomeObserver, PushDispatcher, UpdatedId};

/// Push one notification to a list of registration ids.
#[derive(Debug, Parser)]
#[command(name = "gcm-dispatch", version, about)]
struct Cli {
    /// File with one registration id per line (stdin when omitted)
    #[arg(short, long)]
    recipients: Option<PathBuf>,

    #[arg(long, default_value = "")]
    collapse_key: String,

    /// Time-to-live in seconds
    #[arg(long)]
    ttl: Option<u32>,

    #[arg(long)]
    delay_while_idle: bool,

    /// Validate on the gateway without delivering
    #[arg(long)]
    dry_run: bool,

    /// JSON object forwarded as the notification data
    #[arg(long)]
    data: Option<String>,
}

/// Logs each batch's categorized ids as they arrive.
struct LogObserver;

impl OutcomeObserver for LogObserver {
    fn on_removed(&self, removed: &[String]) {
        tracing::info!(count = removed.len(), ids = ?removed, "removed");
    }

    fn on_updated(&self, updated: &[UpdatedId]) {
        tracing::info!(count = updated.len(), ids = ?updated, "updated");
    }

    fn on_invalid(&self, invalid: &[String]) {
        tracing::info!(count = invalid.len(), ids = ?invalid, "invalid");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new()?;
    gcm_batch_dispatcher::telemetry::init_tracing(&settings.log)?;
    tracing::info!("Configuration loaded");

    let recipients = read_recipients(cli.recipients.as_ref())?;
    let options = send_options(&cli)?;

    let transport = HttpTransport::with_endpoint(
        settings.gateway.endpoint.clone(),
        settings.request_timeout(),
    )?;
    let client = GatewayClient::with_retry_policy(Arc::new(transport), settings.retry_policy());
    let dispatcher = PushDispatcher::new(settings.dispatcher_config(), client);
    dispatcher.add_observer(Arc::new(LogObserver));

    let report = dispatcher.send(recipients, &options).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn send_options(cli: &Cli) -> Result<SendOptions> {
    let mut options = SendOptions::new()
        .collapse_key(cli.collapse_key.clone())
        .dry_run(cli.dry_run);
    if cli.delay_while_idle {
        options = options.delay_while_idle(true);
    }
    if let Some(ttl) = cli.ttl {
        options = options.time_to_live(ttl);
    }
    if let Some(data) = &cli.data {
        let value = serde_json::from_str(data).context("--data is not valid JSON")?;
        options = options.data(value);
    }
    Ok(options)
}

fn read_recipients(path: Option<&PathBuf>) -> Result<Vec<String>> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut recipients = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            recipients.push(id.to_string());
        }
    }
    Ok(recipients)
}
