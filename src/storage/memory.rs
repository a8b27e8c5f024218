// src/storage/memory.rs
use dashmap::DashMap;
use crate::models::server::ServerDescriptor;
use crate::storage::{FleetStore, StoreError};

/// In-memory fleet store backing the standalone runner and tests.
pub struct MemoryFleetStore {
    servers: DashMap<String, ServerDescriptor>,
}

impl MemoryFleetStore {
    pub fn new() -> Self {
        Self {
            servers: DashMap::new(),
        }
    }

    /// Adds a server, minting a fresh id. A descriptor with the same
    /// address and port replaces the existing record.
    pub fn add(&self, name: &str, family: &str, address: &str, port: u16) -> ServerDescriptor {
        let existing_id = self.servers
            .iter()
            .find(|r| r.value().address == address && r.value().port == port)
            .map(|r| r.key().clone());

        if let Some(id) = existing_id {
            self.servers.remove(&id);
        }

        let descriptor = ServerDescriptor {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            family: family.to_string(),
            address: address.to_string(),
            port,
        };
        self.servers.insert(descriptor.id.clone(), descriptor.clone());
        descriptor
    }

    pub fn remove(&self, id: &str) {
        self.servers.remove(id);
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Default for MemoryFleetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetStore for MemoryFleetStore {
    fn list_fleet(&self) -> Result<Vec<ServerDescriptor>, StoreError> {
        Ok(self.servers.iter().map(|r| r.value().clone()).collect())
    }

    fn get_by_id(&self, id: &str) -> Result<ServerDescriptor, StoreError> {
        self.servers
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_lookup() {
        let store = MemoryFleetStore::new();
        let added = store.add("survival", "minecraft", "mc.example.com", 25565);

        let found = store.get_by_id(&added.id).unwrap();
        assert_eq!(found.name, "survival");
        assert_eq!(found.family, "minecraft");
        assert_eq!(found.port, 25565);
    }

    #[test]
    fn same_endpoint_replaces() {
        let store = MemoryFleetStore::new();
        let first = store.add("old-name", "minecraft", "mc.example.com", 25565);
        store.add("new-name", "minecraft", "mc.example.com", 25565);

        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.get_by_id(&first.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = MemoryFleetStore::new();
        assert!(matches!(
            store.get_by_id("missing"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn remove_deletes_record() {
        let store = MemoryFleetStore::new();
        let added = store.add("a", "minecraft", "10.0.0.1", 25565);
        store.remove(&added.id);

        assert!(store.is_empty());
        assert!(matches!(
            store.get_by_id(&added.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_returns_whole_fleet() {
        let store = MemoryFleetStore::new();
        store.add("a", "minecraft", "10.0.0.1", 25565);
        store.add("b", "cs2", "10.0.0.2", 27015);

        let fleet = store.list_fleet().unwrap();
        assert_eq!(fleet.len(), 2);
    }
}
