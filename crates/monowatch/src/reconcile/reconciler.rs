use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::event::{ActionKind, GameEvent, Record, SYSTEM_PLAYER};
use super::log::EventLog;
use super::message::{MERGE_SEPARATOR, describe};
use super::snapshot::GameSnapshot;
use crate::error::Result;
use crate::game::GameFacade;
use crate::storage::SnapshotStore;

pub type SharedReconciler = Arc<Mutex<Reconciler>>;

pub const DEFAULT_EVENT_CAPACITY: usize = 20;

pub fn default_ignored_prompts() -> Vec<String> {
    ["Roll Again", "Next Turn", "What would you like to do?"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// What `record` did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Appended,
    /// Folded into the staged entry as a compound event
    Merged(ActionKind),
    Duplicate,
    /// Suppressed as a system prompt or a redundant repeat
    Ignored,
}

impl Recorded {
    pub fn accepted(self) -> bool {
        matches!(self, Self::Appended | Self::Merged(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EventKey {
    turn: u32,
    player: String,
    kind: ActionKind,
    detail: String,
}

/// Roster entry remembered from the last successful read
#[derive(Debug, Clone)]
struct Seat {
    bankrupt: bool,
}

/// Single writer for reconciled events.
///
/// Every accepted event triggers a full snapshot rebuild through the facade.
/// When the rebuild cannot read the game, the event stays in the log and the
/// last good snapshot stays on disk.
pub struct Reconciler {
    game: Arc<dyn GameFacade>,
    store: Option<SnapshotStore>,
    log: EventLog,
    seen: HashSet<EventKey>,
    ignored_prompts: Vec<String>,
    turn: u32,
    current: usize,
    seats: Vec<Seat>,
    snapshot: Option<GameSnapshot>,
}

impl Reconciler {
    pub fn new(game: Arc<dyn GameFacade>) -> Self {
        Self {
            game,
            store: None,
            log: EventLog::new(DEFAULT_EVENT_CAPACITY),
            seen: HashSet::new(),
            ignored_prompts: default_ignored_prompts(),
            turn: 1,
            current: 0,
            seats: Vec::new(),
            snapshot: None,
        }
    }

    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.log = EventLog::new(capacity);
        self
    }

    pub fn with_ignored_prompts(mut self, prompts: Vec<String>) -> Self {
        self.ignored_prompts = prompts;
        self
    }

    pub fn shared(self) -> SharedReconciler {
        Arc::new(Mutex::new(self))
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Roster index of the player whose turn it is
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Event feed, oldest first
    pub fn events(&self) -> Vec<GameEvent> {
        self.log.to_vec()
    }

    /// Last successfully rebuilt snapshot
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn apply(&mut self, record: &Record) -> Result<Recorded> {
        self.record(&record.player, record.kind, &record.detail)
    }

    /// The only way an event enters the context.
    pub fn record(&mut self, player: &str, kind: ActionKind, detail: &str) -> Result<Recorded> {
        if self.is_ignored_prompt(player, kind, detail) {
            debug!("Ignoring prompt: {}", detail);
            return Ok(Recorded::Ignored);
        }

        let key = EventKey {
            turn: self.turn,
            player: player.to_string(),
            kind,
            detail: detail.to_string(),
        };
        if !self.seen.insert(key) {
            return Ok(Recorded::Duplicate);
        }

        if self.is_redundant(player, kind) {
            debug!("Dropping redundant {} for {}", kind, player);
            return Ok(Recorded::Ignored);
        }

        let (outcome, effective) = match self.merge(player, kind, detail) {
            Some(merged) => (Recorded::Merged(merged), merged),
            None => {
                self.log.push(GameEvent {
                    turn: self.turn,
                    player: player.to_string(),
                    kind,
                    detail: detail.to_string(),
                    message: describe(player, kind, detail),
                    timestamp: Utc::now(),
                });
                (Recorded::Appended, kind)
            }
        };

        if let Some(event) = self.log.staged() {
            info!("[turn {}] {}", event.turn, event.message);
        }

        if effective.ends_turn() {
            self.end_turn(effective);
        }

        self.rebuild_and_persist(effective)?;
        Ok(outcome)
    }

    fn is_ignored_prompt(&self, player: &str, kind: ActionKind, detail: &str) -> bool {
        player == SYSTEM_PLAYER
            && kind == ActionKind::Message
            && self.ignored_prompts.iter().any(|p| detail.contains(p.as_str()))
    }

    fn is_redundant(&self, player: &str, kind: ActionKind) -> bool {
        let Some(last) = self.log.staged() else {
            return false;
        };
        if last.player != player {
            return false;
        }
        match kind {
            ActionKind::Move => last.turn == self.turn && last.kind.is_move(),
            ActionKind::BuyProperty => last.kind == ActionKind::MoveAndBuy,
            _ => false,
        }
    }

    /// Rewrite a staged same-player move into a compound event
    fn merge(&mut self, player: &str, kind: ActionKind, detail: &str) -> Option<ActionKind> {
        let turn = self.turn;
        let staged = self.log.staged_mut()?;
        if staged.player != player || staged.turn != turn || staged.kind != ActionKind::Move {
            return None;
        }
        let merged = match kind {
            ActionKind::BuyProperty => ActionKind::MoveAndBuy,
            ActionKind::PayRent => ActionKind::MoveAndPay,
            _ => return None,
        };

        staged.kind = merged;
        staged.detail = format!("{}{}{}", staged.detail, MERGE_SEPARATOR, detail);
        staged.message = describe(player, merged, &staged.detail);
        Some(merged)
    }

    /// Pass play to the next non-bankrupt seat; wrapping past the last seat
    /// starts a new turn.
    ///
    /// The roster comes from the facade, then from the last rebuilt snapshot,
    /// then from the snapshot a previous session left on disk.
    fn end_turn(&mut self, kind: ActionKind) {
        if let Ok(players) = self.game.players() {
            self.seats = players
                .iter()
                .map(|p| Seat {
                    bankrupt: p.bankrupt,
                })
                .collect();
        }
        if self.seats.is_empty()
            && let Some(saved) = self.store.as_ref().and_then(|store| store.load().ok())
        {
            debug!("Seating from {} players on disk", saved.players.len());
            self.seats = seats_of(&saved);
        }
        let seats = self.seats.len();
        if seats == 0 {
            warn!(
                "Roster unknown after {}, turn {} stays with seat {}",
                kind, self.turn, self.current
            );
            return;
        }

        let mut next = self.current;
        for _ in 0..seats {
            next = (next + 1) % seats;
            if next == 0 {
                self.turn += 1;
                // Keys from older turns can never match again
                self.seen.retain(|key| key.turn >= self.turn);
            }
            if !self.seats[next].bankrupt {
                break;
            }
        }
        self.current = next;
        debug!("Turn {} now with seat {}", self.turn, self.current);
    }

    fn rebuild_and_persist(&mut self, kind: ActionKind) -> Result<()> {
        let snapshot =
            match GameSnapshot::capture(self.game.as_ref(), self.turn, self.current, self.events()) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Snapshot rebuild failed, keeping last good snapshot: {}", e);
                    return Ok(());
                }
            };

        self.seats = seats_of(&snapshot);

        if let Some(store) = self.store.as_mut() {
            store.save(&snapshot, kind)?;
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }
}

fn seats_of(snapshot: &GameSnapshot) -> Vec<Seat> {
    snapshot
        .players
        .iter()
        .map(|p| Seat {
            bankrupt: p.bankrupt,
        })
        .collect()
}
