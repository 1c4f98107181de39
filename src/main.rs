//! ClipKeep - Desktop clipboard history manager
//!
//! This is the main entry point for the clipkeep binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipkeep::cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut handler = CliHandler::new(cli.config.clone())?;

    // Initialize logging; --verbose overrides the configured level
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        handler.config().log_level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clipkeep={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    handler.handle_command(cli.command).await?;

    Ok(())
}
