// src/cache/manager.rs
use log::{debug, info};
use std::collections::HashMap;
use std::time::Duration;

use crate::cache::StatusCache;
use crate::models::server::{CacheStats, ServerStatus};

/// High-level cache operations for server statuses.
pub struct StatusCacheManager {
    cache: StatusCache,
}

impl StatusCacheManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: StatusCache::new(ttl),
        }
    }

    pub fn update(&self, server_id: &str, status: ServerStatus) {
        debug!(
            "Updated cache for server {}: online={}, players={}/{}",
            server_id, status.online, status.players, status.max_players
        );
        self.cache.set(server_id, status);
    }

    pub fn get(&self, server_id: &str) -> Option<ServerStatus> {
        self.cache.get(server_id)
    }

    pub fn get_all(&self) -> HashMap<String, ServerStatus> {
        self.cache.get_all()
    }

    /// Cached status, or the canonical offline sentinel when nothing is
    /// cached. Never fails and never touches the network.
    pub fn get_with_fallback(&self, server_id: &str) -> ServerStatus {
        match self.cache.get(server_id) {
            Some(status) => status,
            None => ServerStatus::offline(),
        }
    }

    pub fn sweep_expired(&self) {
        self.cache.sweep_expired();
    }

    pub fn clear_all(&self) {
        self.cache.clear();
        info!("Cleared all cached server statuses");
    }

    pub fn size(&self) -> usize {
        self.cache.size()
    }

    pub fn stats(&self) -> CacheStats {
        let all = self.cache.get_all();
        let online = all.values().filter(|s| s.online).count();

        CacheStats {
            total_cached: all.len(),
            online_servers: online,
            offline_servers: all.len() - online,
            cache_size: self.cache.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_for_missing_entry() {
        let manager = StatusCacheManager::new(Duration::from_secs(60));

        let status = manager.get_with_fallback("nonexistent");
        assert!(!status.online);
        assert_eq!(status.version, "Unknown");
        assert_eq!(status.players, 0);
    }

    #[test]
    fn fallback_serves_cached_entry() {
        let manager = StatusCacheManager::new(Duration::from_secs(60));
        let mut status = ServerStatus::offline();
        status.online = true;
        status.players = 7;
        manager.update("s1", status);

        let got = manager.get_with_fallback("s1");
        assert!(got.online);
        assert_eq!(got.players, 7);
    }

    #[test]
    fn stats_count_online_and_offline() {
        let manager = StatusCacheManager::new(Duration::from_secs(60));

        let mut online = ServerStatus::offline();
        online.online = true;
        manager.update("up", online);
        manager.update("down", ServerStatus::offline());

        let stats = manager.stats();
        assert_eq!(stats.total_cached, 2);
        assert_eq!(stats.online_servers, 1);
        assert_eq!(stats.offline_servers, 1);
        assert_eq!(stats.cache_size, 2);
    }
}
