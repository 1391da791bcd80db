//! pvforwardd - control-system channel forwarder
//!
//! Streams channel updates from a control system onto Kafka topics as
//! schema-encoded log frames. The stream set is reconfigured at runtime
//! through JSON commands on a command topic.
//!
//! # Usage
//!
//! ```bash
//! # Run the service (default)
//! pvforwardd
//! pvforwardd --config configs/forwarder.toml
//!
//! # Explicit subcommand form
//! pvforwardd serve --config configs/forwarder.toml --log-level debug
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// pvforwardd - control-system channel forwarder
#[derive(Parser, Debug)]
#[command(name = "pvforwardd")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    // Global args that apply to serve when no subcommand given
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/forwarder.toml", global = true)]
    config: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the forwarding service
    Serve(cmd::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => cmd::serve::run(args).await,
        // No subcommand = run the service (default behavior)
        None => {
            let args = cmd::serve::ServeArgs {
                config: cli.config,
                log_level: cli.log_level,
            };
            cmd::serve::run(args).await
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
