// src/models/server.rs
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A configured game server, owned by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub id: String,
    pub name: String,
    /// Raw family tag as stored, e.g. "minecraft" or "cs2".
    pub family: String,
    /// IP or domain.
    pub address: String,
    pub port: u16,
}

/// The closed set of game-server families this crate can probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameFamily {
    Minecraft,
    Cs2,
}

impl GameFamily {
    /// Maps a persistence family tag onto a supported family. Unknown tags
    /// return None; the prober treats those as offline without touching the
    /// network.
    pub fn from_tag(tag: &str) -> Option<GameFamily> {
        match tag {
            "minecraft" => Some(GameFamily::Minecraft),
            "cs2" => Some(GameFamily::Cs2),
            _ => None,
        }
    }
}

/// The live status of a game server as seen by one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub online: bool,
    pub players: u32,
    pub max_players: u32,
    pub version: String,
    /// Round-trip time in milliseconds.
    pub ping_ms: u64,
    pub last_updated: SystemTime,
}

impl ServerStatus {
    /// The canonical offline sentinel, stamped with the current time.
    pub fn offline() -> ServerStatus {
        ServerStatus {
            online: false,
            players: 0,
            max_players: 0,
            version: "Unknown".to_string(),
            ping_ms: 0,
            last_updated: SystemTime::now(),
        }
    }
}

/// A descriptor joined with its (possibly fallback) cached status.
#[derive(Debug, Clone, Serialize)]
pub struct ServerWithStatus {
    #[serde(flatten)]
    pub server: ServerDescriptor,
    pub status: ServerStatus,
}

/// Bulk join over the whole fleet.
#[derive(Debug, Clone, Serialize)]
pub struct FleetWithStatus {
    pub servers: Vec<ServerWithStatus>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_cached: usize,
    pub online_servers: usize,
    pub offline_servers: usize,
    pub cache_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProberStats {
    pub running: bool,
    /// Current probe interval, humanized (e.g. "30s").
    pub probe_interval: String,
    #[serde(flatten)]
    pub cache: CacheStats,
}
