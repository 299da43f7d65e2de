use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::port::{ByteOrder, ProcessMemory};
use crate::error::{Error, Result};

/// A logical field backed by one or more mirrored addresses.
///
/// The first address is canonical for reads; writes go to every mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySlot {
    pub name: String,
    #[serde(with = "crate::hex::list")]
    pub addresses: Vec<u64>,
}

impl MemorySlot {
    pub fn new(name: impl Into<String>, addresses: Vec<u64>) -> Result<Self> {
        let name = name.into();
        if addresses.is_empty() {
            return Err(Error::config(format!("slot '{}' has no address", name)));
        }
        Ok(Self { name, addresses })
    }

    /// Single-address slot, used for addresses discovered by scanning
    pub fn single(name: impl Into<String>, address: u64) -> Self {
        Self {
            name: name.into(),
            addresses: vec![address],
        }
    }

    pub fn canonical(&self) -> Result<u64> {
        self.addresses
            .first()
            .copied()
            .ok_or_else(|| Error::config(format!("slot '{}' has no address", self.name)))
    }
}

/// Slot-level access on top of a [`ProcessMemory`].
///
/// Mirror writes hold the write lock for the whole mirror set and reads hold
/// the read lock, so nothing in this process sees mirrors disagree.
#[derive(Clone)]
pub struct SlotMemory {
    memory: Arc<dyn ProcessMemory>,
    lock: Arc<RwLock<()>>,
}

impl SlotMemory {
    pub fn new(memory: Arc<dyn ProcessMemory>) -> Self {
        Self {
            memory,
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn memory(&self) -> &Arc<dyn ProcessMemory> {
        &self.memory
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.memory.byte_order()
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read_u8(&self, slot: &MemorySlot) -> Result<u8> {
        let _guard = self.read_guard();
        self.memory.read_u8(slot.canonical()?)
    }

    pub fn read_u16(&self, slot: &MemorySlot) -> Result<u16> {
        let _guard = self.read_guard();
        self.memory.read_u16(slot.canonical()?)
    }

    pub fn read_u32(&self, slot: &MemorySlot) -> Result<u32> {
        let _guard = self.read_guard();
        self.memory.read_u32(slot.canonical()?)
    }

    pub fn read_bytes(&self, slot: &MemorySlot, len: usize) -> Result<Vec<u8>> {
        let _guard = self.read_guard();
        self.memory.read_bytes(slot.canonical()?, len)
    }

    pub fn read_wide_string(&self, slot: &MemorySlot, max_units: usize) -> Result<String> {
        let _guard = self.read_guard();
        self.memory.read_wide_string(slot.canonical()?, max_units)
    }

    /// Read directly at an address that is not a slot (records, structs).
    pub fn read_u32_at(&self, address: u64) -> Result<u32> {
        let _guard = self.read_guard();
        self.memory.read_u32(address)
    }

    pub fn write_u8(&self, slot: &MemorySlot, value: u8) -> Result<()> {
        self.write_mirrors(slot, |memory, address| memory.write_u8(address, value))
    }

    pub fn write_u16(&self, slot: &MemorySlot, value: u16) -> Result<()> {
        self.write_mirrors(slot, |memory, address| memory.write_u16(address, value))
    }

    pub fn write_u32(&self, slot: &MemorySlot, value: u32) -> Result<()> {
        self.write_mirrors(slot, |memory, address| memory.write_u32(address, value))
    }

    pub fn write_bytes(&self, slot: &MemorySlot, data: &[u8]) -> Result<()> {
        self.write_mirrors(slot, |memory, address| memory.write_bytes(address, data))
    }

    pub fn write_wide_string(&self, slot: &MemorySlot, text: &str) -> Result<()> {
        self.write_mirrors(slot, |memory, address| memory.write_wide_string(address, text))
    }

    /// Apply `write` to every mirror. All mirrors are attempted even if one
    /// fails; the first failure is returned.
    fn write_mirrors<F>(&self, slot: &MemorySlot, write: F) -> Result<()>
    where
        F: Fn(&dyn ProcessMemory, u64) -> Result<()>,
    {
        let _guard = self.write_guard();
        let mut first_error = None;
        for &address in &slot.addresses {
            if let Err(e) = write(self.memory.as_ref(), address) {
                warn!("write to '{}' mirror 0x{:X} failed: {}", slot.name, address, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
