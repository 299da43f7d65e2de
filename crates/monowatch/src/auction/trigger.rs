use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::protocol::{AuctionHouse, AuctionOutcome, Participant};
use crate::decide::DecisionProvider;
use crate::error::Result;
use crate::game::{GameFacade, PlayerId};
use crate::observe::{Observation, ObservationSink};

#[derive(Debug, Default)]
struct TriggerState {
    /// Square each player last moved onto
    landings: HashMap<PlayerId, u8>,
    last_mover: Option<PlayerId>,
    queued: Option<u8>,
}

/// Starts the auction protocol when the game opens an auction.
///
/// Observer threads only queue the square; the driver loop runs the auction
/// through [`AuctionTrigger::run_pending`], one at a time.
pub struct AuctionTrigger {
    game: Arc<dyn GameFacade>,
    house: AuctionHouse,
    provider: Arc<dyn DecisionProvider>,
    state: Mutex<TriggerState>,
}

impl AuctionTrigger {
    pub fn new(
        game: Arc<dyn GameFacade>,
        house: AuctionHouse,
        provider: Arc<dyn DecisionProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            game,
            house,
            provider,
            state: Mutex::new(TriggerState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, TriggerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn notice(&self, observation: &Observation) {
        let mut state = self.state();
        match observation {
            Observation::PositionChanged { player, .. } => {
                state.landings.insert(player.id, player.position);
                state.last_mover = Some(player.id);
            }
            Observation::AuctionStarted(_) => {
                let square = state
                    .last_mover
                    .and_then(|mover| state.landings.get(&mover).copied());
                match square.filter(|index| self.is_for_sale(*index)) {
                    Some(index) => {
                        debug!("Queued auction for square {}", index);
                        state.queued = Some(index);
                    }
                    None => warn!("Auction opened but no unowned square is under the last mover"),
                }
            }
            // The game settled it first
            Observation::AuctionEnded { .. } => state.queued = None,
            Observation::Left(player) => {
                state.landings.remove(&player.id);
            }
            _ => {}
        }
    }

    fn is_for_sale(&self, index: u8) -> bool {
        self.game.board().get(index).is_some_and(|s| s.is_ownable())
            && self.game.square_state(index).is_ok_and(|s| s.owner.is_none())
    }

    pub fn pending(&self) -> Option<u8> {
        self.state().queued
    }

    /// Run the queued auction, if any, with every seated player bidding.
    pub fn run_pending(&self) -> Result<Option<AuctionOutcome>> {
        let Some(square) = self.state().queued.take() else {
            return Ok(None);
        };
        if !self.is_for_sale(square) {
            debug!("Square {} changed hands before its auction ran", square);
            return Ok(None);
        }
        let participants: Vec<Participant> = self
            .game
            .players()?
            .into_iter()
            .filter(|p| !p.bankrupt)
            .map(|p| Participant::new(p.id, Arc::clone(&self.provider)))
            .collect();
        let outcome = self.house.run(self.game.as_ref(), square, &participants)?;
        info!(
            "Auction for square {} resolved after {} rounds",
            outcome.property, outcome.rounds
        );
        Ok(Some(outcome))
    }

    /// Wrap `sink` so every observation is also seen by this trigger
    pub fn observe_into(self: &Arc<Self>, sink: ObservationSink) -> ObservationSink {
        let trigger = Arc::clone(self);
        Arc::new(move |observation: Observation| {
            trigger.notice(&observation);
            sink(observation);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decide::HeuristicProvider;
    use crate::game::{AuctionRecord, TableGame};

    fn trigger(game: &Arc<TableGame>) -> Arc<AuctionTrigger> {
        AuctionTrigger::new(
            game.clone(),
            AuctionHouse::default(),
            Arc::new(HeuristicProvider::default()),
        )
    }

    fn land(game: &TableGame, trigger: &AuctionTrigger, player: PlayerId, square: u8) {
        game.update_player(player, |p| p.position = square);
        let view = game.require_player(player).unwrap();
        trigger.notice(&Observation::PositionChanged { player: view, old: 0 });
    }

    #[test]
    fn test_started_auction_runs_on_the_driver() {
        let game = Arc::new(TableGame::new(&["BLUE", "RED", "GREEN"]));
        let trigger = trigger(&game);
        land(&game, &trigger, 0, 39);
        trigger.notice(&Observation::AuctionStarted(AuctionRecord::default()));
        assert_eq!(trigger.pending(), Some(39));

        let outcome = trigger.run_pending().unwrap().unwrap();
        // Everyone opens at 320; the first seat leads at 330 and nobody counters
        assert_eq!((outcome.winner, outcome.price), (Some(0), 330));
        assert_eq!(game.square_state(39).unwrap().owner, Some(0));
        assert_eq!(trigger.pending(), None);
        assert!(trigger.run_pending().unwrap().is_none());
    }

    #[test]
    fn test_owned_square_not_queued() {
        let game = Arc::new(TableGame::new(&["BLUE", "RED"]));
        game.set_owner(3, Some(1)).unwrap();
        let trigger = trigger(&game);
        land(&game, &trigger, 0, 3);
        trigger.notice(&Observation::AuctionStarted(AuctionRecord::default()));
        assert_eq!(trigger.pending(), None);
    }

    #[test]
    fn test_game_settled_auction_is_dropped() {
        let game = Arc::new(TableGame::new(&["BLUE", "RED"]));
        let trigger = trigger(&game);
        land(&game, &trigger, 1, 1);
        trigger.notice(&Observation::AuctionStarted(AuctionRecord::default()));
        trigger.notice(&Observation::AuctionEnded { last_bid: None });
        assert!(trigger.run_pending().unwrap().is_none());
        assert_eq!(game.square_state(1).unwrap().owner, None);
    }

    #[test]
    fn test_square_sold_meanwhile_is_skipped() {
        let game = Arc::new(TableGame::new(&["BLUE", "RED"]));
        let trigger = trigger(&game);
        land(&game, &trigger, 0, 6);
        trigger.notice(&Observation::AuctionStarted(AuctionRecord::default()));
        game.transfer_property(6, 1, 100).unwrap();

        assert!(trigger.run_pending().unwrap().is_none());
        assert_eq!(game.square_state(6).unwrap().owner, Some(1));
        assert_eq!(game.require_player(0).unwrap().cash, 1500);
    }

    #[test]
    fn test_wrapped_sink_still_forwards() {
        let game = Arc::new(TableGame::new(&["BLUE"]));
        let trigger = trigger(&game);
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let sink = trigger.observe_into(Arc::new(move |_: Observation| *counter.lock().unwrap() += 1));

        game.update_player(0, |p| p.position = 5);
        sink(Observation::PositionChanged {
            player: game.require_player(0).unwrap(),
            old: 0,
        });
        sink(Observation::AuctionStarted(AuctionRecord::default()));
        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(trigger.pending(), Some(5));
    }
}
