use process_memory::{CopyAddress, Pid, ProcessHandle, PutAddress, TryIntoProcessHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::port::{ByteOrder, ProcessMemory};
use crate::error::{Error, Result};

/// Maps a window of emulated (guest) addresses onto the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMap {
    #[serde(with = "crate::hex")]
    pub guest_start: u64,
    #[serde(with = "crate::hex")]
    pub host_start: u64,
    #[serde(with = "crate::hex")]
    pub len: u64,
}

impl RegionMap {
    pub fn contains(&self, address: u64, len: usize) -> bool {
        address >= self.guest_start
            && address
                .checked_add(len as u64)
                .is_some_and(|end| end <= self.guest_start + self.len)
    }

    pub fn translate(&self, address: u64, len: usize) -> Option<u64> {
        self.contains(address, len)
            .then(|| self.host_start + (address - self.guest_start))
    }
}

/// The emulator process, attached by pid.
pub struct AttachedProcess {
    pid: u32,
    handle: ProcessHandle,
    regions: Vec<RegionMap>,
    byte_order: ByteOrder,
}

impl AttachedProcess {
    pub fn attach(pid: u32, regions: Vec<RegionMap>, byte_order: ByteOrder) -> Result<Self> {
        if regions.is_empty() {
            return Err(Error::config("no memory regions configured"));
        }

        let handle = (pid as Pid)
            .try_into_process_handle()
            .map_err(|e| Error::MemoryUnavailable(format!("cannot attach to pid {}: {}", pid, e)))?;

        info!("Attached to pid {} ({} mapped regions)", pid, regions.len());
        Ok(Self {
            pid,
            handle,
            regions,
            byte_order,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn host_address(&self, address: u64, len: usize) -> Result<usize> {
        self.regions
            .iter()
            .find_map(|region| region.translate(address, len))
            .map(|host| host as usize)
            .ok_or_else(|| Error::MemoryAccess {
                address,
                message: format!("{} bytes outside every mapped region", len),
            })
    }
}

impl ProcessMemory for AttachedProcess {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let host = self.host_address(address, len)?;
        let mut buffer = vec![0u8; len];
        self.handle.copy_address(host, &mut buffer).map_err(|e| {
            debug!("read of {} bytes at 0x{:X} failed: {}", len, address, e);
            Error::MemoryUnavailable(format!("pid {}: {}", self.pid, e))
        })?;
        Ok(buffer)
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        let host = self.host_address(address, data.len())?;
        self.handle
            .put_address(host, data)
            .map_err(|e| Error::MemoryUnavailable(format!("pid {}: {}", self.pid, e)))
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}
