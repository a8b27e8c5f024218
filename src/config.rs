// src/config.rs
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    // Probe scheduling
    pub probe_interval_secs: u64,
    pub max_concurrent_probes: usize,

    // Per-probe behavior
    pub probe_timeout_secs: u64,
    pub max_retries: u32,

    // Status cache
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,

    // Fleet seed file for the standalone runner
    pub fleet_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_interval_secs: 30,
            max_concurrent_probes: 10,
            probe_timeout_secs: 5,
            max_retries: 3,
            cache_ttl_secs: 300, // 5 minutes
            sweep_interval_secs: 60,
            fleet_file: "fleet.json".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            probe_interval_secs: env::var("PROBE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            max_concurrent_probes: env::var("MAX_CONCURRENT_PROBES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            probe_timeout_secs: env::var("PROBE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            max_retries: env::var("PROBE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),

            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),

            sweep_interval_secs: env::var("CACHE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            fleet_file: env::var("FLEET_FILE").unwrap_or_else(|_| "fleet.json".to_string()),
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
