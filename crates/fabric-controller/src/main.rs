//! Fabric Controller - Main Entry Point

use fabric_controller::{Controller, ControllerCommand, ControllerConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Fabric Controller v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "/etc/fabric/controller.json".into());

    let config = ControllerConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Config {} unusable ({}), using defaults", config_path, e);
        ControllerConfig::default()
    });

    // Wire the protocol boundary
    let (event_tx, event_rx) = mpsc::channel(config.event_queue_depth);
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<ControllerCommand>();

    let controller = Arc::new(Controller::new(config, Arc::new(command_tx)));

    let poller = controller
        .config()
        .stats_enabled
        .then(|| controller.stats_poller().spawn());

    let commands = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            tracing::debug!("Outbound {:?}", command);
        }
    });

    let events = tokio::spawn(controller.clone().run(event_rx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        _ = events => {
            tracing::warn!("Event loop exited");
        }
    }

    drop(event_tx);
    if let Some(poller) = poller {
        poller.abort();
    }
    commands.abort();

    Ok(())
}
