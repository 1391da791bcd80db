//! The `serve` subcommand: run the forwarding service
//!
//! Wires the Kafka transport to the engine: a command consumer feeds the
//! stream config manager, the status reporter runs on its own task, and
//! ctrl-c drains everything through the cancellation token.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use pvf_bus::kafka::{KafkaCommandSource, KafkaProducer};
use pvf_bus::sim::SimMonitor;
use pvf_bus::{ChannelMonitor, Producer, ProviderRegistry};
use pvf_config::Config;
use pvf_core::{StatusReporter, StreamConfigManager};
use pvf_protocol::parse_command;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/forwarder.toml")]
    pub config: PathBuf,

    /// Log level; overrides the config file
    #[arg(short, long)]
    pub log_level: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let level = args
        .log_level
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    crate::init_logging(&level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bootstrap = %config.broker.bootstrap,
        command_topic = %config.command.topic,
        status_topic = %config.status.topic,
        "starting pvforwardd"
    );

    let producer: Arc<dyn Producer> = Arc::new(
        KafkaProducer::new(&config.broker.bootstrap, config.broker.delivery_timeout())
            .context("creating Kafka producer")?,
    );
    let commands = KafkaCommandSource::new(
        &config.broker.bootstrap,
        &config.command.group,
        &config.command.topic,
    )
    .context("subscribing to command topic")?;

    let monitor = build_monitor();
    let manager = Arc::new(StreamConfigManager::new(Arc::clone(&producer), monitor));

    let cancel = CancellationToken::new();
    let reporter = StatusReporter::new(
        Arc::clone(&manager),
        Arc::clone(&producer),
        config.status.topic.clone(),
        config.status.interval(),
    );
    let reporter_task = tokio::spawn(reporter.run(cancel.clone()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            payload = commands.next() => match payload {
                Ok(payload) => apply_command(&manager, &payload).await,
                Err(e) => {
                    tracing::warn!(error = %e, "command consume failed, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            },
        }
    }

    cancel.cancel();
    if let Err(e) = reporter_task.await {
        tracing::warn!(error = %e, "status reporter task panicked");
    }
    manager.shutdown().await;
    tracing::info!("pvforwardd stopped");
    Ok(())
}

/// Missing config file means defaults; a present but broken one is fatal.
fn load_config(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).with_context(|| format!("loading config {}", path.display()))
    } else {
        eprintln!(
            "config file {} not found, using defaults",
            path.display()
        );
        Ok(Config::default())
    }
}

/// Assemble the provider registry for channel subscriptions
///
/// The simulated backend serves every provider type for now; real client
/// backends register here under their provider names as they land.
fn build_monitor() -> Arc<dyn ChannelMonitor> {
    let sim = Arc::new(SimMonitor::default());
    let mut registry = ProviderRegistry::new();
    registry.register("sim", sim.clone());
    registry.register("pva", sim.clone());
    registry.register("ca", sim);
    Arc::new(registry)
}

async fn apply_command(manager: &StreamConfigManager, payload: &[u8]) {
    match parse_command(payload) {
        Ok(command) => {
            let report = manager.apply(command).await;
            for (channel, error) in &report.failed {
                tracing::warn!(channel, %error, "stream rejected");
            }
        }
        // Bad messages are dropped; the running configuration stays in force.
        Err(e) => tracing::warn!(error = %e, "command message ignored"),
    }
}
