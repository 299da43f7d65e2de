//! Polling the game and turning reading differences into observations.

mod auction;
mod dice;
mod observer;

pub use auction::{AuctionEdge, AuctionWatch};
pub use dice::{DiceRoll, DiceWatch};
pub use observer::{Observation, ObservationSink, Observer, ObserverCadence, ObserverRunner};
