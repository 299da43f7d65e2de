use std::sync::Arc;

use tracing::{debug, info};

use super::registry::StateRegistry;
use super::state::{DecisionContext, StateId};
use crate::error::{Error, Result};

pub const DEFAULT_TRANSITION_CAP: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Waiting in this state for the next tick
    Suspended(StateId),
    /// A terminal state ended the turn
    Finished(StateId),
}

/// Interprets the registered graph for one context at a time.
pub struct DecisionEngine {
    registry: Arc<StateRegistry>,
    start: StateId,
    cap: usize,
}

impl DecisionEngine {
    pub fn new(registry: Arc<StateRegistry>) -> Self {
        Self {
            registry,
            start: StateId::AiTurn,
            cap: DEFAULT_TRANSITION_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_start(mut self, start: StateId) -> Self {
        self.start = start;
        self
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Run states until one suspends or finishes.
    ///
    /// Transitions chain within the call; more than `cap` of them, or a
    /// transition to an unregistered state, is a configuration error.
    pub fn step(&self, ctx: &mut DecisionContext) -> Result<StepOutcome> {
        let mut id = ctx.current.unwrap_or(self.start);

        for _ in 0..self.cap {
            let state = self.registry.get(id)?;
            if !ctx.entered {
                state.on_enter(ctx)?;
                ctx.entered = true;
                ctx.current = Some(id);
            }

            match state.run(ctx)? {
                Some(next) => {
                    if !self.registry.contains(next) {
                        return Err(Error::Configuration(format!(
                            "{} transitions to unregistered state {}",
                            id, next
                        )));
                    }
                    state.on_exit(ctx)?;
                    debug!("player {}: {} -> {}", ctx.player, id, next);
                    ctx.current = Some(next);
                    ctx.entered = false;
                    id = next;
                }
                None if state.is_terminal() => {
                    state.on_exit(ctx)?;
                    info!("player {} finished turn at {}", ctx.player, id);
                    ctx.reset_turn();
                    return Ok(StepOutcome::Finished(id));
                }
                None => return Ok(StepOutcome::Suspended(id)),
            }
        }

        Err(Error::Configuration(format!(
            "more than {} transitions without suspending (at {})",
            self.cap, id
        )))
    }
}

/// Steps the current player's context and rotates on finished turns.
pub struct TurnDriver {
    engine: DecisionEngine,
    contexts: Vec<DecisionContext>,
    current: usize,
}

impl TurnDriver {
    pub fn new(engine: DecisionEngine, contexts: Vec<DecisionContext>) -> Self {
        Self {
            engine,
            contexts,
            current: 0,
        }
    }

    pub fn current(&self) -> Option<&DecisionContext> {
        self.contexts.get(self.current)
    }

    pub fn tick(&mut self) -> Result<Option<StepOutcome>> {
        let Some(ctx) = self.contexts.get_mut(self.current) else {
            return Ok(None);
        };
        let outcome = self.engine.step(ctx)?;
        if let StepOutcome::Finished(_) = outcome {
            self.current = (self.current + 1) % self.contexts.len();
        }
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decide::HeuristicProvider;
    use crate::machine::FnState;
    use crate::machine::script::ScriptedTurn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> DecisionContext {
        DecisionContext::new(
            0,
            Arc::new(ScriptedTurn::new()),
            Arc::new(HeuristicProvider::default()),
        )
    }

    #[test]
    fn test_suspend_resume_fires_hooks_once() {
        let enters = Arc::new(AtomicUsize::new(0));
        let exits = Arc::new(AtomicUsize::new(0));
        let polls = Arc::new(AtomicUsize::new(0));
        let (e, x, p) = (enters.clone(), exits.clone(), polls.clone());

        let registry = StateRegistry::builder()
            .register(FnState::pass(StateId::AiTurn, StateId::PtmWait))
            .unwrap()
            .register(
                FnState::new(StateId::PtmWait, move |_| {
                    // Answer arrives on the third poll
                    let n = p.fetch_add(1, Ordering::SeqCst);
                    Ok((n >= 2).then_some(StateId::TurnEnd))
                })
                .on_enter(move |_| {
                    e.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .on_exit(move |_| {
                    x.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap()
            .register(FnState::new(StateId::TurnEnd, |_| Ok(None)).terminal())
            .unwrap()
            .build();
        let engine = DecisionEngine::new(Arc::new(registry));
        let mut ctx = context();

        assert_eq!(engine.step(&mut ctx).unwrap(), StepOutcome::Suspended(StateId::PtmWait));
        assert_eq!(engine.step(&mut ctx).unwrap(), StepOutcome::Suspended(StateId::PtmWait));
        assert_eq!(ctx.current(), Some(StateId::PtmWait));
        assert_eq!(engine.step(&mut ctx).unwrap(), StepOutcome::Finished(StateId::TurnEnd));

        assert_eq!(enters.load(Ordering::SeqCst), 1);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn test_cap_exceeded() {
        let registry = StateRegistry::builder()
            .register(FnState::pass(StateId::AiTurn, StateId::SenseState))
            .unwrap()
            .register(FnState::pass(StateId::SenseState, StateId::AiTurn))
            .unwrap()
            .build();
        let engine = DecisionEngine::new(Arc::new(registry)).with_cap(16);
        let err = engine.step(&mut context()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unregistered_target() {
        let registry = StateRegistry::builder()
            .register(FnState::pass(StateId::AiTurn, StateId::SenseState))
            .unwrap()
            .build();
        let mut ctx = context();
        let err = DecisionEngine::new(Arc::new(registry)).step(&mut ctx).unwrap_err();
        assert!(err.is_fatal());
        // Current state still names a registered state
        assert_eq!(ctx.current(), Some(StateId::AiTurn));
    }

    #[test]
    fn test_driver_rotates_players() {
        let registry = StateRegistry::builder()
            .register(FnState::pass(StateId::AiTurn, StateId::TurnEnd))
            .unwrap()
            .register(FnState::new(StateId::TurnEnd, |_| Ok(None)).terminal())
            .unwrap()
            .build();
        let engine = DecisionEngine::new(Arc::new(registry));
        let contexts = (0..2)
            .map(|id| {
                DecisionContext::new(
                    id,
                    Arc::new(ScriptedTurn::new()),
                    Arc::new(HeuristicProvider::default()),
                )
            })
            .collect();
        let mut driver = TurnDriver::new(engine, contexts);

        assert_eq!(driver.current().unwrap().player, 0);
        driver.tick().unwrap();
        assert_eq!(driver.current().unwrap().player, 1);
        driver.tick().unwrap();
        assert_eq!(driver.current().unwrap().player, 0);
    }
}
