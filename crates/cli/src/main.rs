mod cli;
mod commands;
mod scan;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    docload_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = args.resolve_config().context("invalid configuration")?;
    config.log_summary();

    // First Ctrl-C stops after the document in progress.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current document");
                cancel.cancel();
            }
        }
    });

    commands::run(args, &config, cancel).await
}
