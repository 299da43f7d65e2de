//! Typed access to the emulator's memory.
//!
//! Everything above this module goes through [`ProcessMemory`]; the live
//! backend is [`AttachedProcess`], tests use `MockMemory`.

pub mod layout;
mod port;
mod process;
mod slots;
mod wide;

#[cfg(test)]
pub mod mock;

pub use port::{ByteOrder, ProcessMemory};
pub use process::{AttachedProcess, RegionMap};
pub use slots::{MemorySlot, SlotMemory};
pub use wide::{DecodedString, MARKER, decode_wide, encode_wide};

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};
