//! Per-turn decision graph.

mod actions;
mod engine;
mod game_turn;
mod registry;
#[cfg(test)]
pub(crate) mod script;
mod state;
mod states;

pub use actions::TurnActions;
pub use engine::{DEFAULT_TRANSITION_CAP, DecisionEngine, StepOutcome, TurnDriver};
pub use game_turn::{DiceSource, FacadeTurn, ShownDice};
pub use registry::{RegistryBuilder, StateRegistry};
pub use state::{DecisionContext, DecisionState, FnState, StateId};
pub use states::{BAIL, DOUBLES_LIMIT, MAX_IMPROVEMENT_PASSES, MAX_JAIL_ROLLS};
