// src/prober/background.rs
//! Background probe scheduler: periodically lists the fleet, fans out
//! bounded-concurrency probes and writes results into the status cache
//! as they complete.

use log::{debug, error, info};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::cache::manager::StatusCacheManager;
use crate::config::Config;
use crate::models::server::{ProberStats, ServerDescriptor, ServerStatus};
use crate::probe::Prober;
use crate::storage::{FleetStore, StoreError};

struct LoopHandles {
    shutdown_tx: watch::Sender<bool>,
    probe_loop: JoinHandle<()>,
    sweep_loop: JoinHandle<()>,
}

pub struct BackgroundProber {
    prober: Arc<Prober>,
    cache: Arc<StatusCacheManager>,
    store: Arc<dyn FleetStore>,
    interval: Arc<RwLock<Duration>>,
    sweep_interval: Duration,
    max_retries: u32,
    max_concurrent: usize,
    // Serializes start/stop; distinct from the cache's lock.
    state: Mutex<Option<LoopHandles>>,
    running: AtomicBool,
}

impl BackgroundProber {
    pub fn new(store: Arc<dyn FleetStore>, config: &Config) -> Self {
        Self {
            prober: Arc::new(Prober::with_timeout(config.probe_timeout())),
            cache: Arc::new(StatusCacheManager::new(config.cache_ttl())),
            store,
            interval: Arc::new(RwLock::new(config.probe_interval())),
            sweep_interval: config.sweep_interval(),
            max_retries: config.max_retries,
            max_concurrent: config.max_concurrent_probes,
            state: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Starts the probe and sweep loops. A no-op while already running.
    /// The first cycle begins immediately, then repeats at the configured
    /// interval.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ctx = CycleContext {
            prober: Arc::clone(&self.prober),
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
            max_retries: self.max_retries,
            max_concurrent: self.max_concurrent,
        };
        let interval = Arc::clone(&self.interval);
        let probe_handle = tokio::spawn(probe_loop(ctx, interval, shutdown_rx.clone()));

        let cache = Arc::clone(&self.cache);
        let sweep_handle = tokio::spawn(sweep_loop(cache, self.sweep_interval, shutdown_rx));

        *state = Some(LoopHandles {
            shutdown_tx,
            probe_loop: probe_handle,
            sweep_loop: sweep_handle,
        });
        self.running.store(true, Ordering::SeqCst);

        info!(
            "Background prober started with interval: {:?}",
            *self.interval.read()
        );
    }

    /// Signals shutdown and waits for both loops to exit. Any in-flight
    /// cycle runs its fan-out to completion first, so no cache write from
    /// this scheduler can happen after this returns. A no-op while already
    /// stopped.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let handles = match state.take() {
            Some(handles) => handles,
            None => return,
        };

        let _ = handles.shutdown_tx.send(true);
        let _ = handles.probe_loop.await;
        let _ = handles.sweep_loop.await;
        self.running.store(false, Ordering::SeqCst);

        info!("Background prober stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &StatusCacheManager {
        &self.cache
    }

    /// Takes effect at the next tick; an in-flight wait is not re-armed.
    pub fn set_interval(&self, interval: Duration) {
        *self.interval.write() = interval;
        info!("Probe interval updated to: {:?}", interval);
    }

    pub fn interval(&self) -> Duration {
        *self.interval.read()
    }

    /// Probes one server immediately, outside the regular cycle, and
    /// writes the result to the cache. Unlike the cycle, an unknown id is
    /// surfaced to the caller.
    pub async fn force_probe(&self, server_id: &str) -> Result<ServerStatus, StoreError> {
        let server = self.store.get_by_id(server_id)?;

        let status = self.prober.probe_with_retry(&server, self.max_retries).await;
        self.cache.update(&server.id, status.clone());

        info!(
            "Force probed server {}: online={}",
            server.name, status.online
        );
        Ok(status)
    }

    pub fn stats(&self) -> ProberStats {
        ProberStats {
            running: self.is_running(),
            probe_interval: format!("{:?}", self.interval()),
            cache: self.cache.stats(),
        }
    }
}

struct CycleContext {
    prober: Arc<Prober>,
    cache: Arc<StatusCacheManager>,
    store: Arc<dyn FleetStore>,
    max_retries: u32,
    max_concurrent: usize,
}

async fn probe_loop(
    ctx: CycleContext,
    interval: Arc<RwLock<Duration>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // Initial probe on startup.
    run_cycle(&ctx).await;

    loop {
        // Re-read each iteration so interval changes apply at the next tick.
        let wait = *interval.read();
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("Background prober loop stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {
                run_cycle(&ctx).await;
            }
        }
    }
}

async fn sweep_loop(
    cache: Arc<StatusCacheManager>,
    sweep_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => return,
            _ = tokio::time::sleep(sweep_interval) => {
                cache.sweep_expired();
            }
        }
    }
}

/// One full pass over the fleet. Listing failures skip the cycle; it is
/// retried at the next tick.
async fn run_cycle(ctx: &CycleContext) {
    let servers = match ctx.store.list_fleet() {
        Ok(servers) => servers,
        Err(e) => {
            error!("Failed to list fleet: {}", e);
            return;
        }
    };

    if servers.is_empty() {
        debug!("No servers configured for probing");
        return;
    }

    let total = servers.len();
    info!("Starting probe cycle for {} servers", total);

    let semaphore = Arc::new(Semaphore::new(ctx.max_concurrent));
    let mut tasks = JoinSet::new();

    for server in servers {
        let semaphore = Arc::clone(&semaphore);
        let prober = Arc::clone(&ctx.prober);
        let cache = Arc::clone(&ctx.cache);
        let max_retries = ctx.max_retries;

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed, cycle abandoned
            };
            probe_and_cache(&prober, &cache, &server, max_retries).await;
        });
    }

    // Join the whole fan-out before declaring the cycle done.
    while tasks.join_next().await.is_some() {}
    info!("Completed probe cycle for {} servers", total);
}

async fn probe_and_cache(
    prober: &Prober,
    cache: &StatusCacheManager,
    server: &ServerDescriptor,
    max_retries: u32,
) {
    let started = Instant::now();
    let status = prober.probe_with_retry(server, max_retries).await;
    cache.update(&server.id, status.clone());

    let elapsed = started.elapsed();
    if status.online {
        info!(
            "Server {} ({}:{}) - Online: {}/{} players, ping: {}ms, probe time: {:?}",
            server.name,
            server.address,
            server.port,
            status.players,
            status.max_players,
            status.ping_ms,
            elapsed
        );
    } else {
        info!(
            "Server {} ({}:{}) - Offline, probe time: {:?}",
            server.name, server.address, server.port, elapsed
        );
    }
}
