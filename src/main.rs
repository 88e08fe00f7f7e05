use clap::Parser;

use api_relay::cli::Cli;
use api_relay::config::loader::DEBUG_MODE_ENV;
use api_relay::lifecycle::{self, signals, Shutdown};
use api_relay::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    tracing::info!("api-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match cli.into_config(std::env::var(DEBUG_MODE_ENV).ok()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Refusing to start");
            std::process::exit(1);
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    lifecycle::start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
