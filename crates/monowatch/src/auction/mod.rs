//! Sealed-then-open property auctions.

mod protocol;
mod trigger;

pub use protocol::{
    AuctionHook, AuctionHouse, AuctionOutcome, AuctionPhase, AuctionRules, DEFAULT_MIN_RAISE,
    DEFAULT_RESERVE, DEFAULT_ROUND_CAP, Participant,
};
pub use trigger::AuctionTrigger;
