//! snsim server binary.
//!
//! Loads settings, starts logging, builds the shared service and runs until
//! Ctrl-C. Useful on its own for watching the activity stream while other
//! processes embed the library.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use snsim::{init_logging, LogFormat, Settings, SnsService, StartupError};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "snsim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Local emulator of a pub/sub notification service", long_about = None)]
struct Cli {
    /// Settings file (TOML, YAML or JSON, picked by extension)
    #[arg(short, long, env = "SNSIM_CONFIG")]
    config: Option<PathBuf>,
    /// Topic to create at startup; repeatable
    #[arg(short, long = "topic")]
    topics: Vec<String>,
    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
    /// Override the configured console format
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(cli.config.as_deref()).map_err(StartupError::from)?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }

    let logging = init_logging(&settings.logging)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize logging")?;

    let service = Arc::new(SnsService::new(&settings).context("failed to build service")?);
    info!(
        account_id = %settings.account.account_id,
        region = %settings.account.region,
        http_enabled = settings.http.enabled,
        queue_enabled = settings.queue.enabled,
        queue_endpoint = %settings.queue.endpoint,
        auto_confirm = settings.developer.auto_confirm_subscriptions,
        "snsim started"
    );

    for name in &cli.topics {
        match service.create_topic(name, HashMap::new()) {
            Ok(topic) => info!(topic_arn = %topic.topic_arn, "topic created"),
            Err(e) => warn!(name = %name, error = %e, "failed to create topic"),
        }
    }

    let mut listener = service.activity().subscribe();
    let stream = tokio::spawn(async move {
        while let Some(entry) = listener.recv().await {
            debug!(
                id = %entry.id,
                event = %entry.event_type,
                status = %entry.status,
                error = entry.error.as_deref().unwrap_or(""),
                "activity stream"
            );
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("Ctrl-C received");
    service.shutdown();
    stream.abort();
    logging.shutdown();
    Ok(())
}
