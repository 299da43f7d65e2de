use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::wide::{decode_wide, encode_wide};
use crate::error::{Error, Result};

/// Byte order of multi-byte values in the emulated machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        }
    }

    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        }
    }

    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }
}

/// Raw access to the external process.
///
/// Implementors only provide byte transfer; typed helpers are derived from it.
/// Every call fails fast with [`Error::MemoryUnavailable`] when the process is
/// not attached, it never blocks waiting for a reattach.
pub trait ProcessMemory: Send + Sync {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>>;

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;

    fn byte_order(&self) -> ByteOrder {
        ByteOrder::Big
    }

    fn read_u8(&self, address: u64) -> Result<u8> {
        let [value] = read_array::<Self, 1>(self, address)?;
        Ok(value)
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        Ok(self.byte_order().u16_from(read_array(self, address)?))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        Ok(self.byte_order().u32_from(read_array(self, address)?))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        Ok(self.read_u32(address)? as i32)
    }

    fn write_u8(&self, address: u64, value: u8) -> Result<()> {
        self.write_bytes(address, &[value])
    }

    fn write_u16(&self, address: u64, value: u16) -> Result<()> {
        self.write_bytes(address, &self.byte_order().u16_bytes(value))
    }

    fn write_u32(&self, address: u64, value: u32) -> Result<()> {
        self.write_bytes(address, &self.byte_order().u32_bytes(value))
    }

    /// Read a null-terminated UTF-16 string of at most `max_units` code units.
    ///
    /// A degraded decode is logged and read as an empty string.
    fn read_wide_string(&self, address: u64, max_units: usize) -> Result<String> {
        let bytes = self.read_bytes(address, max_units * 2)?;
        let decoded = decode_wide(&bytes, self.byte_order());
        if decoded.degraded {
            let err = Error::DecodeDegraded {
                address,
                markers: decoded.markers,
                length: decoded.units,
            };
            warn!("{}", err);
            return Ok(String::new());
        }
        Ok(decoded.text)
    }

    /// Write `text` as UTF-16 followed by a terminator unit.
    fn write_wide_string(&self, address: u64, text: &str) -> Result<()> {
        self.write_bytes(address, &encode_wide(text, self.byte_order(), true))
    }
}

fn read_array<M, const N: usize>(memory: &M, address: u64) -> Result<[u8; N]>
where
    M: ProcessMemory + ?Sized,
{
    let bytes = memory.read_bytes(address, N)?;
    bytes.as_slice().try_into().map_err(|_| Error::MemoryAccess {
        address,
        message: format!("short read: expected {} bytes, got {}", N, bytes.len()),
    })
}

impl<T: ProcessMemory + ?Sized> ProcessMemory for Arc<T> {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, len)
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        (**self).write_bytes(address, data)
    }

    fn byte_order(&self) -> ByteOrder {
        (**self).byte_order()
    }
}
