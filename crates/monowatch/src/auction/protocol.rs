use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use strum::{Display, IntoStaticStr};
use tracing::{debug, info};

use crate::decide::{DecisionKind, DecisionProvider, DecisionRequest, decide_amount};
use crate::error::{Error, Result};
use crate::game::{GameFacade, PlayerId, PlayerView};

pub const DEFAULT_RESERVE: u32 = 100;
pub const DEFAULT_MIN_RAISE: u32 = 10;
pub const DEFAULT_ROUND_CAP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionRules {
    /// Cash a sealed bid must leave untouched
    pub reserve: u32,
    pub min_raise: u32,
    pub round_cap: u32,
}

impl AuctionRules {
    /// A sealed bid leaves `reserve` untouched, so a raise no larger than
    /// the reserve is always affordable to a sealed bidder.
    pub fn validate(&self) -> Result<()> {
        if self.min_raise == 0 {
            return Err(Error::config("auction minimum raise must be at least 1"));
        }
        if self.min_raise > self.reserve {
            return Err(Error::config(format!(
                "auction minimum raise {} exceeds the reserve {}",
                self.min_raise, self.reserve
            )));
        }
        Ok(())
    }
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            reserve: DEFAULT_RESERVE,
            min_raise: DEFAULT_MIN_RAISE,
            round_cap: DEFAULT_ROUND_CAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AuctionPhase {
    NotStarted,
    SealedBidding,
    OpenBidding,
    Resolved,
}

#[derive(Clone)]
pub struct Participant {
    pub player: PlayerId,
    pub provider: Arc<dyn DecisionProvider>,
}

impl Participant {
    pub fn new(player: PlayerId, provider: Arc<dyn DecisionProvider>) -> Self {
        Self { player, provider }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuctionOutcome {
    pub property: u8,
    pub winner: Option<PlayerId>,
    pub price: u32,
    /// Open rounds played
    pub rounds: u32,
    pub sealed_bids: Vec<(PlayerId, u32)>,
}

pub type AuctionHook = Box<dyn Fn(&AuctionOutcome) + Send + Sync>;

/// State of one running auction
struct AuctionState {
    phase: AuctionPhase,
    bidders: Vec<(PlayerView, Arc<dyn DecisionProvider>)>,
    bids: Vec<u32>,
    active: Vec<usize>,
    leader: Option<usize>,
    high: u32,
    rounds: u32,
}

impl AuctionState {
    fn advance(&mut self, phase: AuctionPhase) {
        debug!("Auction {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn name(&self, seat: usize) -> &str {
        &self.bidders[seat].0.name
    }
}

/// Runs sealed-then-open auctions against the game facade.
pub struct AuctionHouse {
    rules: AuctionRules,
    hooks: Vec<AuctionHook>,
}

impl AuctionHouse {
    pub fn new(rules: AuctionRules) -> Self {
        Self {
            rules,
            hooks: Vec::new(),
        }
    }

    pub fn rules(&self) -> &AuctionRules {
        &self.rules
    }

    /// Called after every resolution
    pub fn add_hook(&mut self, hook: AuctionHook) {
        self.hooks.push(hook);
    }

    /// Auction `property` between `participants`.
    ///
    /// Participants missing from the roster or bankrupt are skipped. A
    /// provider that fails counts as declining for that request.
    pub fn run(
        &self,
        game: &dyn GameFacade,
        property: u8,
        participants: &[Participant],
    ) -> Result<AuctionOutcome> {
        self.rules.validate()?;
        let square = game
            .board()
            .get(property)
            .filter(|s| s.is_ownable())
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("square {} cannot be auctioned", property)))?;

        let roster = game.players()?;
        let bidders: Vec<_> = participants
            .iter()
            .filter_map(|p| {
                roster
                    .iter()
                    .find(|view| view.id == p.player && !view.bankrupt)
                    .map(|view| (view.clone(), Arc::clone(&p.provider)))
            })
            .collect();

        let mut state = AuctionState {
            phase: AuctionPhase::NotStarted,
            bids: vec![0; bidders.len()],
            bidders,
            active: Vec::new(),
            leader: None,
            high: 0,
            rounds: 0,
        };
        info!("Auction for {} with {} bidders", square.name, state.bidders.len());

        state.advance(AuctionPhase::SealedBidding);
        self.collect_sealed(&mut state, &square.name, square.price);
        let sealed_bids: Vec<(PlayerId, u32)> = state
            .bidders
            .iter()
            .zip(&state.bids)
            .map(|((view, _), bid)| (view.id, *bid))
            .collect();

        state.active = (0..state.bids.len()).filter(|i| state.bids[*i] > 0).collect();
        self.seat_leader(&mut state);

        if state.active.len() > 1 {
            state.advance(AuctionPhase::OpenBidding);
            self.open_bidding(&mut state, &square.name, square.price);
        }

        state.advance(AuctionPhase::Resolved);
        let winner = state.leader.map(|seat| state.bidders[seat].0.id);
        let outcome = AuctionOutcome {
            property,
            winner,
            price: if winner.is_some() { state.high } else { 0 },
            rounds: state.rounds,
            sealed_bids,
        };

        match (winner, state.leader) {
            (Some(id), Some(seat)) => {
                game.transfer_property(property, id, outcome.price)?;
                info!("{} wins {} for ${}", state.name(seat), square.name, outcome.price);
            }
            _ => info!("No bids for {}, it stays unowned", square.name),
        }

        for hook in &self.hooks {
            hook(&outcome);
        }
        Ok(outcome)
    }

    /// The highest sealed bid leads. Equal top bids go to the earliest seat,
    /// carried one minimum raise above the tie so the price still beats
    /// every other sealed bid.
    fn seat_leader(&self, state: &mut AuctionState) {
        let Some(top) = state.active.iter().map(|seat| state.bids[*seat]).max() else {
            return;
        };
        let mut tied = state.active.iter().copied().filter(|seat| state.bids[*seat] == top);
        let Some(leader) = tied.next() else {
            return;
        };

        let high = if tied.next().is_some() {
            let raised = top.saturating_add(self.rules.min_raise);
            debug!("Sealed tie at {}, {} leads at {}", top, state.name(leader), raised);
            raised
        } else {
            top
        };
        state.bids[leader] = high;
        state.leader = Some(leader);
        state.high = high;
    }

    /// Every bidder answers without seeing anyone else's bid
    fn collect_sealed(&self, state: &mut AuctionState, name: &str, price: u32) {
        for (seat, (view, provider)) in state.bidders.iter().enumerate() {
            let max_bid = view.cash.saturating_sub(self.rules.reserve);
            let request = DecisionRequest::new(
                DecisionKind::AuctionSealedBid,
                view.id,
                json!({
                    "property_name": name,
                    "base_price": price,
                    "current_cash": view.cash,
                    "max_bid": max_bid,
                }),
            );
            let bid = decide_amount(provider.as_ref(), &request, 0).min(max_bid);
            debug!("Sealed bid from {}: {}", view.name, bid);
            state.bids[seat] = bid;
        }
    }

    /// Ask `seat` for a counter to the current high bid.
    ///
    /// Returns the raised bid, or `None` when the bidder drops out.
    fn counter(&self, state: &AuctionState, seat: usize, name: &str, price: u32) -> Option<u32> {
        let (view, provider) = &state.bidders[seat];
        let leader = state.leader.map(|l| state.name(l)).unwrap_or_default();
        let request = DecisionRequest::new(
            DecisionKind::AuctionCounterBid,
            view.id,
            json!({
                "property_name": name,
                "property_value": price,
                "current_high": state.high,
                "current_leader": leader,
                "my_cash": view.cash,
                "my_last_bid": state.bids[seat],
                "min_raise": self.rules.min_raise,
            }),
        );
        let bid = decide_amount(provider.as_ref(), &request, 0).min(view.cash);
        (bid >= state.high.saturating_add(self.rules.min_raise)).then_some(bid)
    }

    fn open_bidding(&self, state: &mut AuctionState, name: &str, price: u32) {
        while state.active.len() > 1 && state.rounds < self.rules.round_cap {
            state.rounds += 1;
            let round_leader = state.leader;
            let mut still_in = Vec::new();

            for seat in state.active.clone() {
                if Some(seat) == round_leader {
                    continue;
                }
                match self.counter(state, seat, name, price) {
                    Some(bid) => {
                        debug!("{} raises to {}", state.name(seat), bid);
                        state.bids[seat] = bid;
                        state.high = bid;
                        state.leader = Some(seat);
                        still_in.push(seat);
                    }
                    None => debug!("{} drops out at {}", state.name(seat), state.high),
                }
            }

            // An overtaken round leader answers last, and only against
            // someone still bidding
            if let Some(previous) = round_leader {
                if state.leader == Some(previous) {
                    still_in.push(previous);
                } else if !still_in.is_empty()
                    && let Some(bid) = self.counter(state, previous, name, price)
                {
                    debug!("{} counters with {}", state.name(previous), bid);
                    state.bids[previous] = bid;
                    state.high = bid;
                    state.leader = Some(previous);
                    still_in.push(previous);
                }
            }

            still_in.sort_unstable();
            still_in.dedup();
            state.active = still_in;
        }

        if state.active.len() > 1 {
            info!("Round cap reached at ${}", state.high);
        }
    }
}

impl Default for AuctionHouse {
    fn default() -> Self {
        Self::new(AuctionRules::default())
    }
}
