// src/main.rs
use env_logger::Env;
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;

use fleetprobe::storage::memory::MemoryFleetStore;
use fleetprobe::{Config, ProberService};

/// One record of the JSON fleet seed file.
#[derive(Deserialize)]
struct FleetEntry {
    name: String,
    family: String,
    address: String,
    port: u16,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::from_env();

    let store = Arc::new(MemoryFleetStore::new());
    let raw = std::fs::read_to_string(&config.fleet_file).map_err(|e| {
        error!("Failed to read fleet file {}: {}", config.fleet_file, e);
        e
    })?;
    let entries: Vec<FleetEntry> = serde_json::from_str(&raw).map_err(|e| {
        error!("Failed to parse fleet file {}: {}", config.fleet_file, e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })?;
    for entry in &entries {
        store.add(&entry.name, &entry.family, &entry.address, entry.port);
    }
    info!("Loaded {} servers from {}", store.len(), config.fleet_file);

    let interval = config.probe_interval();
    let service = ProberService::with_config(store, &config);
    service.start().await;

    // Log aggregate stats once per interval until interrupted.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(interval) => {
                match serde_json::to_string(&service.stats()) {
                    Ok(stats) => info!("Prober stats: {}", stats),
                    Err(e) => error!("Failed to serialize stats: {}", e),
                }
            }
        }
    }

    info!("Shutting down");
    service.stop().await;
    Ok(())
}
