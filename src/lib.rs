// src/lib.rs
pub mod cache;
pub mod config;
pub mod models;
pub mod probe;
pub mod prober;
pub mod storage;

pub use config::Config;
pub use models::server::{
    FleetWithStatus, GameFamily, ServerDescriptor, ServerStatus, ServerWithStatus,
};
pub use probe::Prober;
pub use prober::service::ProberService;
pub use storage::{FleetStore, StoreError};
