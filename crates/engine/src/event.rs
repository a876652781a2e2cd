//! Entity lifecycle events
//!
//! The repository emits one [`EntityEvent`] per successful mutation, after
//! every backend call of that mutation has completed. Listeners run inline,
//! in subscription order, on the task that performed the mutation.

use std::sync::Arc;

use keybranch_core::{Entity, EntityState};
use parking_lot::Mutex;

/// A completed mutation
#[derive(Debug)]
pub struct EntityEvent<'a, E> {
    /// Entity as written (or as last stored, for deletes)
    pub entity: &'a E,
    /// What happened to it
    pub state: EntityState,
}

/// Receives entity events from a repository
pub trait EntityListener<E>: Send + Sync {
    /// Called after a mutation completed
    fn on_event(&self, event: &EntityEvent<'_, E>);
}

impl<E, F> EntityListener<E> for F
where
    F: Fn(&EntityEvent<'_, E>) + Send + Sync,
{
    fn on_event(&self, event: &EntityEvent<'_, E>) {
        self(event)
    }
}

/// Listener that keeps `(id, state)` of every event it sees
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(String, EntityState)>>>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<(String, EntityState)> {
        self.events.lock().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl<E: Entity> EntityListener<E> for EventLog {
    fn on_event(&self, event: &EntityEvent<'_, E>) {
        self.events
            .lock()
            .push((event.entity.id().to_string(), event.state));
    }
}
