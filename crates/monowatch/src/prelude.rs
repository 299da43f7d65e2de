//! Prelude module for convenient imports
//!
//! ```ignore
//! use monowatch::prelude::*;
//! ```

// Configuration and errors
pub use crate::config::{WatchConfig, load_config};
pub use crate::error::{Error, Result};

// Memory and game access
pub use crate::game::{
    Board, DicePair, GameFacade, GameLayout, MemoryGame, PlayerId, PlayerView, load_layout,
};
pub use crate::memory::{AttachedProcess, ByteOrder, ProcessMemory, SlotMemory};

// Scanning and observation
pub use crate::observe::{Observation, ObserverCadence, ObserverRunner};
pub use crate::scan::{MessageTracker, Pattern, PatternRegistration, PatternScanner, ScanRange};

// Reconciliation and storage
pub use crate::reconcile::{ActionKind, EventPipeline, GameEvent, GameSnapshot, Reconciler};
pub use crate::storage::SnapshotStore;

// Decisions
pub use crate::auction::{AuctionHouse, AuctionOutcome, AuctionRules, Participant};
pub use crate::decide::{Decision, DecisionProvider, DecisionRequest, HeuristicProvider};
pub use crate::machine::{DecisionContext, DecisionEngine, StateRegistry, TurnActions};
