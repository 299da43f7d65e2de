use std::collections::HashMap;
use std::sync::RwLock;

use crate::memory::MemorySlot;

/// Addresses discovered by scanning, keyed by name.
///
/// Each hit of a registration with a dynamic key overwrites the entry, so the
/// table always holds the most recent match.
#[derive(Debug, Default)]
pub struct DynamicAddresses {
    table: RwLock<HashMap<String, u64>>,
}

impl DynamicAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, address: u64) {
        let mut table = self.table.write().unwrap_or_else(|p| p.into_inner());
        table.insert(key.to_string(), address);
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        let table = self.table.read().unwrap_or_else(|p| p.into_inner());
        table.get(key).copied()
    }

    pub fn remove(&self, key: &str) -> Option<u64> {
        let mut table = self.table.write().unwrap_or_else(|p| p.into_inner());
        table.remove(key)
    }

    /// The entry as a single-address slot, readable like a configured field
    pub fn slot(&self, key: &str) -> Option<MemorySlot> {
        self.get(key).map(|address| MemorySlot::single(key, address))
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.table.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
