//! Shared pattern scanning over the emulator's UI text memory.
//!
//! The scanned region has no change notification, so new prompts are found by
//! rescanning the whole range on a timer. One cycle reads every range once in
//! fixed chunks and matches all registrations against each chunk.

mod dynamic;
mod messages;
mod pattern;
mod scanner;

pub use dynamic::DynamicAddresses;
pub use messages::{MessageCategory, MessageChange, MessageTracker, TrackedMessage, classify};
pub use pattern::{Pattern, PatternKind, format_pattern, parse_pattern};
pub use scanner::{
    CycleHook, PatternRegistration, PatternScanner, ScanCallback, ScanHit, ScanRange, ScanReport,
};
