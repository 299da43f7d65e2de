use std::collections::HashMap;

use super::state::{DecisionState, StateId};
use crate::error::{Error, Result};

/// Read-only map from state id to state, built once at startup.
pub struct StateRegistry {
    states: HashMap<StateId, Box<dyn DecisionState>>,
}

impl StateRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, id: StateId) -> Result<&dyn DecisionState> {
        self.states
            .get(&id)
            .map(|state| state.as_ref())
            .ok_or_else(|| Error::Configuration(format!("state {} is not registered", id)))
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    states: HashMap<StateId, Box<dyn DecisionState>>,
}

impl RegistryBuilder {
    /// Add a state; a second state with the same id is a configuration error
    pub fn register(mut self, state: impl DecisionState + 'static) -> Result<Self> {
        let id = state.id();
        if self.states.contains_key(&id) {
            return Err(Error::Configuration(format!("duplicate state {}", id)));
        }
        self.states.insert(id, Box::new(state));
        Ok(self)
    }

    pub fn build(self) -> StateRegistry {
        StateRegistry {
            states: self.states,
        }
    }
}
