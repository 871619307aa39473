use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::broadcast;

use crate::types::PolicyId;

const EVENT_CAPACITY: usize = 64;

/// Emitted on every toggle so a persistence layer can mirror the set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveToggled {
    pub id: PolicyId,
    pub saved: bool,
}

/// Session-local set of saved policy ids
#[derive(Debug)]
pub struct SavedSet {
    ids: BTreeSet<PolicyId>,
    events: broadcast::Sender<SaveToggled>,
}

impl SavedSet {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ids: BTreeSet::new(),
            events,
        }
    }

    /// Flip membership of `id` and return whether it is now saved.
    pub fn toggle(&mut self, id: PolicyId) -> bool {
        let saved = if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        };
        tracing::debug!(%id, saved, "toggled saved policy");
        // No subscribers is fine
        let _ = self.events.send(SaveToggled { id, saved });
        saved
    }

    pub fn is_saved(&self, id: PolicyId) -> bool {
        self.ids.contains(&id)
    }

    /// Saved ids in ascending order
    pub fn saved_ids(&self) -> Vec<PolicyId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveToggled> {
        self.events.subscribe()
    }
}

impl Default for SavedSet {
    fn default() -> Self {
        Self::new()
    }
}
