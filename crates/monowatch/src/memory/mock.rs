//! In-memory stand-in for the emulator used by unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::port::{ByteOrder, ProcessMemory};
use super::wide::encode_wide;
use crate::error::{Error, Result};

/// Sparse memory made of independent regions.
///
/// Accesses must stay inside a single region, mirroring how the emulator only
/// maps a few fixed RAM windows.
pub struct MockMemory {
    regions: RwLock<BTreeMap<u64, Vec<u8>>>,
    byte_order: ByteOrder,
    detached: AtomicBool,
    reads: AtomicUsize,
}

impl MockMemory {
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub fn reattach(&self) {
        self.detached.store(false, Ordering::SeqCst);
    }

    /// Number of `read_bytes` calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn locate(regions: &BTreeMap<u64, Vec<u8>>, address: u64, len: usize) -> Result<(u64, usize)> {
        let (base, data) = regions
            .range(..=address)
            .next_back()
            .ok_or_else(|| unmapped(address))?;
        let offset = (address - base) as usize;
        if offset + len > data.len() {
            return Err(unmapped(address));
        }
        Ok((*base, offset))
    }
}

fn unmapped(address: u64) -> Error {
    Error::MemoryAccess {
        address,
        message: "address not mapped".to_string(),
    }
}

impl ProcessMemory for MockMemory {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(Error::MemoryUnavailable("mock detached".to_string()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        let regions = self.regions.read().unwrap();
        let (base, offset) = Self::locate(&regions, address, len)?;
        Ok(regions[&base][offset..offset + len].to_vec())
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(Error::MemoryUnavailable("mock detached".to_string()));
        }
        let mut regions = self.regions.write().unwrap();
        let (base, offset) = Self::locate(&regions, address, data.len())?;
        if let Some(region) = regions.get_mut(&base) {
            region[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

#[derive(Default)]
pub struct MockMemoryBuilder {
    regions: BTreeMap<u64, Vec<u8>>,
    byte_order: ByteOrder,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_bytes(mut self, base: u64, bytes: &[u8]) -> Self {
        self.regions.insert(base, bytes.to_vec());
        self
    }

    pub fn with_zeros(self, base: u64, len: usize) -> Self {
        self.with_bytes(base, &vec![0; len])
    }

    /// Overwrite part of an existing region, extending it if needed.
    pub fn patch(mut self, address: u64, bytes: &[u8]) -> Self {
        let base = self
            .regions
            .range(..=address)
            .next_back()
            .map(|(base, _)| *base)
            .unwrap_or(address);
        let region = self.regions.entry(base).or_default();
        let offset = (address - base) as usize;
        if region.len() < offset + bytes.len() {
            region.resize(offset + bytes.len(), 0);
        }
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn u32_at(self, address: u64, value: u32) -> Self {
        let bytes = self.byte_order.u32_bytes(value);
        self.patch(address, &bytes)
    }

    pub fn u8_at(self, address: u64, value: u8) -> Self {
        self.patch(address, &[value])
    }

    pub fn wide_at(self, address: u64, text: &str) -> Self {
        let bytes = encode_wide(text, self.byte_order, true);
        self.patch(address, &bytes)
    }

    pub fn build(self) -> MockMemory {
        MockMemory {
            regions: RwLock::new(self.regions),
            byte_order: self.byte_order,
            detached: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }
}
