// src/storage/mod.rs
pub mod memory;

use crate::models::server::ServerDescriptor;
use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "server {} not found", id),
            Self::Unavailable(reason) => write!(f, "fleet store unavailable: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

/// The persistence seam: where server configurations come from.
/// The prober only ever lists the fleet and looks up single records.
pub trait FleetStore: Send + Sync {
    fn list_fleet(&self) -> Result<Vec<ServerDescriptor>, StoreError>;
    fn get_by_id(&self, id: &str) -> Result<ServerDescriptor, StoreError>;
}
