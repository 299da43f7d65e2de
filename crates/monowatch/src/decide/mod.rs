//! Decision providers consulted by the auction and the turn states.

mod heuristic;
#[cfg(feature = "api")]
mod http;
mod provider;

pub use heuristic::HeuristicProvider;
#[cfg(feature = "api")]
pub use http::HttpProvider;
pub use provider::{
    Decision, DecisionKind, DecisionProvider, DecisionRequest, DecisionValue, decide_amount,
    decide_bool, decide_choice, decide_or_default,
};
