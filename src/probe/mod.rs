// src/probe/mod.rs
pub mod a2s;
pub mod minecraft;

use log::{error, warn};
use std::fmt;
use std::time::Duration;

use crate::models::server::{GameFamily, ServerDescriptor, ServerStatus};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug)]
pub enum ProbeError {
    Timeout,
    Io(std::io::Error),
    Protocol(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "probe timed out"),
            Self::Io(e) => write!(f, "network error: {}", e),
            Self::Protocol(reason) => write!(f, "protocol error: {}", reason),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        ProbeError::Io(e)
    }
}

/// Probes servers by family, retrying failed attempts with linear backoff
/// and degrading every exhausted failure to the canonical offline status.
pub struct Prober {
    timeout: Duration,
}

impl Prober {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// One probe attempt for a known family.
    async fn probe_once(
        &self,
        family: GameFamily,
        server: &ServerDescriptor,
    ) -> Result<ServerStatus, ProbeError> {
        match family {
            GameFamily::Minecraft => {
                minecraft::probe(&server.address, server.port, self.timeout).await
            }
            GameFamily::Cs2 => a2s::probe(&server.address, server.port, self.timeout).await,
        }
    }

    /// Probes with the default retry count.
    pub async fn probe(&self, server: &ServerDescriptor) -> ServerStatus {
        self.probe_with_retry(server, DEFAULT_MAX_RETRIES).await
    }

    /// Probes up to `max_retries` times, sleeping `attempt × 1s` between
    /// failed attempts. Unsupported family tags return offline immediately
    /// without any network call. Never returns an error: exhausted retries
    /// degrade to the offline sentinel stamped at the moment of final
    /// failure.
    pub async fn probe_with_retry(
        &self,
        server: &ServerDescriptor,
        max_retries: u32,
    ) -> ServerStatus {
        let family = match GameFamily::from_tag(&server.family) {
            Some(family) => family,
            None => {
                warn!(
                    "Unknown server family '{}' for server {}",
                    server.family, server.name
                );
                return ServerStatus::offline();
            }
        };

        let mut last_err = None;

        for attempt in 0..max_retries {
            match self.probe_once(family, server).await {
                Ok(status) => return status,
                Err(e) => {
                    warn!(
                        "Probe attempt {} failed for server {} ({}:{}): {}",
                        attempt + 1,
                        server.name,
                        server.address,
                        server.port,
                        e
                    );
                    last_err = Some(e);
                }
            }

            if attempt + 1 < max_retries {
                let backoff = Duration::from_secs(u64::from(attempt) + 1);
                tokio::time::sleep(backoff).await;
            }
        }

        if let Some(e) = last_err {
            error!(
                "All probe attempts failed for server {} ({}:{}): {}",
                server.name, server.address, server.port, e
            );
        }

        ServerStatus::offline()
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn descriptor(family: &str, address: &str, port: u16) -> ServerDescriptor {
        ServerDescriptor {
            id: "test".to_string(),
            name: "test-server".to_string(),
            family: family.to_string(),
            address: address.to_string(),
            port,
        }
    }

    #[tokio::test]
    async fn unknown_family_is_offline_without_network() {
        let prober = Prober::new();
        let server = descriptor("quake3", "192.0.2.1", 27960);

        let started = Instant::now();
        let status = prober.probe_with_retry(&server, 3).await;

        assert!(!status.online);
        assert_eq!(status.version, "Unknown");
        assert_eq!(status.players, 0);
        assert_eq!(status.max_players, 0);
        assert_eq!(status.ping_ms, 0);
        // No socket, no retries, no backoff.
        assert!(started.elapsed() < Duration::from_millis(200));

        // Same outcome through the default-retry entry point.
        let status = prober.probe(&server).await;
        assert!(!status.online);
    }

    #[tokio::test]
    async fn unreachable_address_degrades_to_offline() {
        let prober = Prober::with_timeout(Duration::from_millis(300));
        let server = descriptor("minecraft", "192.0.2.1", 25565);

        let started = Instant::now();
        let status = prober.probe_with_retry(&server, 1).await;

        assert!(!status.online);
        assert_eq!(status.version, "Unknown");
        // Single attempt: bounded by one timeout, no backoff sleep.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn refused_connection_degrades_to_offline() {
        // Bind a listener to reserve a port, then drop it so the connect
        // is refused rather than swallowed by a firewall.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = Prober::with_timeout(Duration::from_millis(500));
        let server = descriptor("minecraft", "127.0.0.1", port);

        let status = prober.probe_with_retry(&server, 1).await;
        assert!(!status.online);
    }
}
