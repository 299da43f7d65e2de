use std::collections::VecDeque;

use super::event::GameEvent;

/// Bounded FIFO of reconciled events.
///
/// The newest entry sits in a staging slot where it may still be rewritten by
/// a merge. It is promoted when the next entry arrives. The staged entry
/// counts toward the capacity.
#[derive(Debug, Clone)]
pub struct EventLog {
    committed: VecDeque<GameEvent>,
    staged: Option<GameEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            committed: VecDeque::with_capacity(capacity),
            staged: None,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.committed.len() + usize::from(self.staged.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, event: GameEvent) {
        if let Some(previous) = self.staged.replace(event) {
            self.committed.push_back(previous);
        }
        while self.len() > self.capacity {
            if self.committed.pop_front().is_none() {
                break;
            }
        }
    }

    pub fn staged(&self) -> Option<&GameEvent> {
        self.staged.as_ref()
    }

    pub fn staged_mut(&mut self) -> Option<&mut GameEvent> {
        self.staged.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.committed.iter().chain(self.staged.iter())
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<GameEvent> {
        self.iter().cloned().collect()
    }
}
