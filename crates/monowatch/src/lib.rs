//! # monowatch
//!
//! Watches a board game running inside an emulator and turns what it finds
//! in memory into a reconciled event feed.
//!
//! This crate provides:
//! - Typed, mirror-aware access to the emulator's memory
//! - A shared pattern scanner for on-screen prompts
//! - A poll-diff observer for player, board and auction fields
//! - An event reconciler that persists a consistent game snapshot
//! - A sealed-then-open auction protocol
//! - A per-turn decision state machine
//!
//! ## Feature Flags
//!
//! - `api`: Enables [`decide::HttpProvider`], which asks a remote service for
//!   decisions over HTTP.

pub mod auction;
pub mod config;
pub mod decide;
pub mod error;
pub mod game;
pub(crate) mod hex;
pub mod machine;
pub mod memory;
pub mod observe;
pub mod prelude;
pub mod reconcile;
pub mod scan;
pub mod storage;
pub mod worker;

pub use config::{WatchConfig, WatchConfigBuilder, load_config, save_config};
pub use error::{Error, Result};
pub use game::{GameFacade, GameLayout, MemoryGame, load_layout, save_layout};
pub use hex::parse_address;
pub use memory::{AttachedProcess, ProcessMemory};
pub use observe::{Observation, ObserverRunner};
pub use reconcile::{EventPipeline, GameSnapshot, Reconciler};
pub use scan::{MessageTracker, PatternScanner};
pub use storage::{SnapshotStore, load_snapshot};
