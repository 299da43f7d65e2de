use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::auction::{AuctionEdge, AuctionWatch};
use super::dice::DiceWatch;
use crate::error::Result;
use crate::game::{AuctionRecord, Bid, GameFacade, PlayerId, PlayerView, SquareState};
use crate::worker::PeriodicWorker;

/// A change noticed between two polls.
///
/// Player variants carry the fresh reading so consumers can relate the change
/// to the player's current square or cash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Joined(PlayerView),
    /// Last known reading of the departed player
    Left(PlayerView),
    NameChanged { player: PlayerView, old: String },
    DiceRolled { player: PlayerView, post_reset: bool },
    PositionChanged { player: PlayerView, old: u8 },
    GotoChanged { player: PlayerView, old: u8 },
    MoneyChanged { player: PlayerView, old: u32 },
    OwnerChanged {
        square: u8,
        old: Option<PlayerId>,
        new: Option<PlayerId>,
    },
    HousesChanged { square: u8, old: u8, new: u8 },
    MortgageChanged { square: u8, mortgaged: bool },
    AuctionStarted(AuctionRecord),
    AuctionBid(Bid),
    AuctionEnded { last_bid: Option<Bid> },
}

impl Observation {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Joined(p) | Self::Left(p) => Some(p.id),
            Self::NameChanged { player, .. }
            | Self::DiceRolled { player, .. }
            | Self::PositionChanged { player, .. }
            | Self::GotoChanged { player, .. }
            | Self::MoneyChanged { player, .. } => Some(player.id),
            _ => None,
        }
    }
}

struct TrackedPlayer {
    view: PlayerView,
    dice: DiceWatch,
}

/// Poll-and-diff over a [`GameFacade`].
///
/// Every poll reads the whole concern before touching tracked state, so a
/// failed read leaves the previous readings in place.
#[derive(Default)]
pub struct Observer {
    players: BTreeMap<PlayerId, TrackedPlayer>,
    squares: Option<Vec<SquareState>>,
    auction: AuctionWatch,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roster(&self) -> Vec<PlayerView> {
        self.players.values().map(|t| t.view.clone()).collect()
    }

    /// Diff the roster and every tracked field.
    ///
    /// Per player, fields are reported as name, dice, position, goto, money,
    /// the order in which a turn changes them.
    pub fn poll_players(&mut self, game: &dyn GameFacade) -> Result<Vec<Observation>> {
        let live = game.players()?;
        let mut out = Vec::new();

        let departed: Vec<PlayerId> = self
            .players
            .keys()
            .copied()
            .filter(|id| !live.iter().any(|p| p.id == *id))
            .collect();
        for id in departed {
            if let Some(tracked) = self.players.remove(&id) {
                debug!("player {} left", tracked.view.name);
                out.push(Observation::Left(tracked.view));
            }
        }

        for view in live {
            let Some(tracked) = self.players.get_mut(&view.id) else {
                debug!("player {} joined", view.name);
                self.players.insert(
                    view.id,
                    TrackedPlayer {
                        dice: DiceWatch::seeded(view.dice),
                        view: view.clone(),
                    },
                );
                out.push(Observation::Joined(view));
                continue;
            };

            let old = std::mem::replace(&mut tracked.view, view.clone());
            if old.name != view.name {
                out.push(Observation::NameChanged {
                    player: view.clone(),
                    old: old.name,
                });
            }
            if let Some(roll) = tracked.dice.observe(view.dice) {
                out.push(Observation::DiceRolled {
                    player: view.clone(),
                    post_reset: roll.post_reset,
                });
            }
            if old.position != view.position {
                out.push(Observation::PositionChanged {
                    player: view.clone(),
                    old: old.position,
                });
            }
            if old.goto != view.goto {
                out.push(Observation::GotoChanged {
                    player: view.clone(),
                    old: old.goto,
                });
            }
            if old.cash != view.cash {
                out.push(Observation::MoneyChanged {
                    player: view,
                    old: old.cash,
                });
            }
        }

        Ok(out)
    }

    /// Diff square ownership and improvements. The first poll only records a
    /// baseline.
    pub fn poll_board(&mut self, game: &dyn GameFacade) -> Result<Vec<Observation>> {
        let squares = game.square_states()?;
        let mut out = Vec::new();

        if let Some(previous) = &self.squares {
            for (index, (old, new)) in previous.iter().zip(squares.iter()).enumerate() {
                let square = index as u8;
                if old.owner != new.owner {
                    out.push(Observation::OwnerChanged {
                        square,
                        old: old.owner,
                        new: new.owner,
                    });
                }
                if old.houses != new.houses {
                    out.push(Observation::HousesChanged {
                        square,
                        old: old.houses,
                        new: new.houses,
                    });
                }
                if old.mortgaged != new.mortgaged {
                    out.push(Observation::MortgageChanged {
                        square,
                        mortgaged: new.mortgaged,
                    });
                }
            }
        }

        self.squares = Some(squares);
        Ok(out)
    }

    pub fn poll_auction(&mut self, game: &dyn GameFacade) -> Result<Vec<Observation>> {
        let record = game.auction()?;
        let seats = self.players.len();
        Ok(self
            .auction
            .observe(&record, seats)
            .into_iter()
            .map(|edge| match edge {
                AuctionEdge::Started(record) => Observation::AuctionStarted(record),
                AuctionEdge::Bid(bid) => Observation::AuctionBid(bid),
                AuctionEdge::Ended(last_bid) => Observation::AuctionEnded { last_bid },
            })
            .collect())
    }

    /// All three polls in order
    pub fn tick(&mut self, game: &dyn GameFacade) -> Result<Vec<Observation>> {
        let mut out = self.poll_players(game)?;
        out.extend(self.poll_board(game)?);
        out.extend(self.poll_auction(game)?);
        Ok(out)
    }
}

pub type ObservationSink = Arc<dyn Fn(Observation) + Send + Sync>;

/// Poll cadence per concern
#[derive(Debug, Clone, Copy)]
pub struct ObserverCadence {
    pub players: Duration,
    pub auction: Duration,
}

impl Default for ObserverCadence {
    fn default() -> Self {
        use crate::memory::layout::timing;
        Self {
            players: timing::PLAYER_POLL_INTERVAL,
            auction: timing::AUCTION_POLL_INTERVAL,
        }
    }
}

/// Drives an [`Observer`] on a background thread.
///
/// The thread ticks at the fastest cadence; each concern is polled once its
/// own interval has elapsed. Board ownership rides with the player poll.
pub struct ObserverRunner {
    observer: Arc<Mutex<Observer>>,
    worker: PeriodicWorker,
}

impl ObserverRunner {
    pub fn start(
        game: Arc<dyn GameFacade>,
        cadence: ObserverCadence,
        sink: ObservationSink,
    ) -> Result<Self> {
        let observer = Arc::new(Mutex::new(Observer::new()));
        let shared = Arc::clone(&observer);
        let tick = cadence.players.min(cadence.auction);
        let mut last_players: Option<Instant> = None;
        let mut last_auction: Option<Instant> = None;

        let worker = PeriodicWorker::spawn("observer", tick, move || {
            let Ok(mut observer) = shared.lock() else {
                return;
            };
            let now = Instant::now();
            let mut batch = Vec::new();

            if due(last_players, cadence.players, now) {
                last_players = Some(now);
                match observer
                    .poll_players(game.as_ref())
                    .and_then(|mut out| {
                        out.extend(observer.poll_board(game.as_ref())?);
                        Ok(out)
                    }) {
                    Ok(out) => batch.extend(out),
                    Err(e) if e.is_transient() => debug!("player poll skipped: {}", e),
                    Err(e) => warn!("player poll failed: {}", e),
                }
            }

            if due(last_auction, cadence.auction, now) {
                last_auction = Some(now);
                match observer.poll_auction(game.as_ref()) {
                    Ok(out) => batch.extend(out),
                    Err(e) if e.is_transient() => debug!("auction poll skipped: {}", e),
                    Err(e) => warn!("auction poll failed: {}", e),
                }
            }

            drop(observer);
            for observation in batch {
                sink(observation);
            }
        })?;

        Ok(Self { observer, worker })
    }

    pub fn roster(&self) -> Vec<PlayerView> {
        self.observer
            .lock()
            .map(|o| o.roster())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

fn due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    last.is_none_or(|at| now.duration_since(at) >= interval)
}
