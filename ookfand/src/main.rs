//! ookfand - Home Assistant bridge for OOK ceiling fans
//!
//! Loads the YAML configuration, connects to the MQTT broker and runs the
//! bridge until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ook_bridge::{run_bridge, BridgeConfig, LoggingTransmitter, SendOok};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log frames instead of running the transmitter program
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ookfand=info,ook_protocol=info,ook_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = BridgeConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!(
        "Loaded {} fans from {}",
        config.rooms.len(),
        args.config.display()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if args.dry_run {
        info!("Dry run: frames will be logged, not transmitted");
        run_bridge(config, LoggingTransmitter, shutdown).await?;
    } else {
        let transmitter = SendOok::new(config.transmitter.clone());
        run_bridge(config, transmitter, shutdown).await?;
    }

    Ok(())
}
