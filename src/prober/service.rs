// src/prober/service.rs
//! The façade the serving layer talks to: lifecycle, cached status reads,
//! joined descriptor+status views and on-demand probes.

use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::models::server::{
    CacheStats, FleetWithStatus, ProberStats, ServerStatus, ServerWithStatus,
};
use crate::prober::background::BackgroundProber;
use crate::storage::{FleetStore, StoreError};

pub struct ProberService {
    background: BackgroundProber,
    store: Arc<dyn FleetStore>,
}

impl ProberService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self::with_config(store, &Config::default())
    }

    pub fn with_config(store: Arc<dyn FleetStore>, config: &Config) -> Self {
        Self {
            background: BackgroundProber::new(Arc::clone(&store), config),
            store,
        }
    }

    pub async fn start(&self) {
        info!("Starting prober service...");
        self.background.start().await;
    }

    pub async fn stop(&self) {
        info!("Stopping prober service...");
        self.background.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.background.is_running()
    }

    /// Raw cache lookup; absent or expired entries report None.
    pub fn get_status(&self, server_id: &str) -> Option<ServerStatus> {
        self.background.cache().get(server_id)
    }

    /// Cached status or the canonical offline sentinel. Never fails.
    pub fn get_status_with_fallback(&self, server_id: &str) -> ServerStatus {
        self.background.cache().get_with_fallback(server_id)
    }

    pub fn get_all_statuses(&self) -> HashMap<String, ServerStatus> {
        self.background.cache().get_all()
    }

    /// Joins the persistence descriptor with its cached (or fallback)
    /// status. Errors only when the descriptor itself is missing.
    pub fn get_server_with_status(&self, server_id: &str) -> Result<ServerWithStatus, StoreError> {
        let server = self.store.get_by_id(server_id)?;
        let status = self.get_status_with_fallback(server_id);

        Ok(ServerWithStatus { server, status })
    }

    /// Bulk join over the whole fleet, fallback status per entry.
    pub fn get_all_with_status(&self) -> Result<FleetWithStatus, StoreError> {
        let fleet = self.store.list_fleet()?;

        let servers: Vec<ServerWithStatus> = fleet
            .into_iter()
            .map(|server| {
                let status = self.get_status_with_fallback(&server.id);
                ServerWithStatus { server, status }
            })
            .collect();

        let total = servers.len();
        Ok(FleetWithStatus { servers, total })
    }

    pub async fn force_probe(&self, server_id: &str) -> Result<ServerStatus, StoreError> {
        self.background.force_probe(server_id).await
    }

    pub fn set_interval(&self, interval: Duration) {
        self.background.set_interval(interval);
    }

    pub fn get_interval(&self) -> Duration {
        self.background.interval()
    }

    pub fn stats(&self) -> ProberStats {
        self.background.stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.background.cache().stats()
    }

    pub fn clear_cache(&self) {
        self.background.cache().clear_all();
    }
}
