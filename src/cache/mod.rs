// src/cache/mod.rs
pub mod manager;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::server::ServerStatus;

struct CacheEntry {
    status: ServerStatus,
    expires_at: Instant,
}

/// Thread-safe TTL cache mapping server ids to their last probed status.
///
/// Writers take the exclusive lock; readers share the lock except during
/// lazy eviction, where an expired entry observed under the read lock is
/// re-checked under the write lock before removal (a concurrent set may
/// have refreshed it in between).
pub struct StatusCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Stores a status, replacing any prior entry and restarting its TTL.
    pub fn set(&self, server_id: &str, status: ServerStatus) {
        let mut entries = self.entries.write();
        entries.insert(
            server_id.to_string(),
            CacheEntry {
                status,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Returns the cached status if present and not expired. An expired
    /// entry is removed as a side effect and reported as absent.
    pub fn get(&self, server_id: &str) -> Option<ServerStatus> {
        {
            let entries = self.entries.read();
            match entries.get(server_id) {
                None => return None,
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Some(entry.status.clone());
                }
                Some(_) => {} // expired, fall through to evict
            }
        }

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(server_id) {
            if Instant::now() < entry.expires_at {
                // Refreshed between lock releases; serve it instead.
                return Some(entry.status.clone());
            }
            entries.remove(server_id);
        }
        None
    }

    /// Snapshot of every non-expired entry. Does not mutate the store.
    pub fn get_all(&self) -> HashMap<String, ServerStatus> {
        let entries = self.entries.read();
        let now = Instant::now();

        entries
            .iter()
            .filter(|(_, entry)| now < entry.expires_at)
            .map(|(id, entry)| (id.clone(), entry.status.clone()))
            .collect()
    }

    /// Removes every expired entry, bounding memory for entries nobody
    /// reads again.
    pub fn sweep_expired(&self) {
        let mut entries = self.entries.write();
        let now = Instant::now();
        entries.retain(|_, entry| now < entry.expires_at);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Raw entry count, including expired entries not yet swept.
    pub fn size(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn online_status(players: u32, max_players: u32) -> ServerStatus {
        ServerStatus {
            online: true,
            players,
            max_players,
            version: "1.20.1".to_string(),
            ping_ms: 50,
            last_updated: std::time::SystemTime::now(),
        }
    }

    #[test]
    fn set_and_get() {
        let cache = StatusCache::new(Duration::from_secs(60));
        cache.set("s1", online_status(10, 20));

        let status = cache.get("s1").unwrap();
        assert!(status.online);
        assert_eq!(status.players, 10);
    }

    #[test]
    fn get_after_ttl_elapses_is_absent() {
        let cache = StatusCache::new(Duration::from_millis(100));
        cache.set("s1", online_status(5, 10));

        assert!(cache.get("s1").is_some());

        thread::sleep(Duration::from_millis(150));
        assert!(cache.get("s1").is_none());
        // Lazy eviction removed the entry, not just hid it.
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn set_resets_ttl() {
        let cache = StatusCache::new(Duration::from_millis(150));
        cache.set("s1", online_status(1, 10));

        thread::sleep(Duration::from_millis(100));
        cache.set("s1", online_status(2, 10));

        thread::sleep(Duration::from_millis(100));
        // 200ms after the first write, but only 100ms after the second.
        let status = cache.get("s1").unwrap();
        assert_eq!(status.players, 2);
    }

    #[test]
    fn get_all_excludes_expired() {
        let cache = StatusCache::new(Duration::from_millis(100));
        cache.set("stale", online_status(1, 10));

        thread::sleep(Duration::from_millis(150));
        cache.set("fresh", online_status(2, 10));

        let all = cache.get_all();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("fresh"));
        // get_all is read-only: the stale entry is still stored.
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let cache = StatusCache::new(Duration::from_millis(100));
        cache.set("s1", online_status(5, 10));
        cache.set("s2", online_status(6, 10));

        thread::sleep(Duration::from_millis(150));
        cache.sweep_expired();

        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn clear_empties_store() {
        let cache = StatusCache::new(Duration::from_secs(60));
        cache.set("s1", online_status(5, 10));
        cache.set("s2", online_status(6, 10));

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(cache.get("s1").is_none());
    }
}
