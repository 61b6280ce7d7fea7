//! Registry of live agents owned by the simulation root.
//!
//! Spawns and despawns are queued and committed between ticks so that
//! iteration during a tick never observes a half-removed agent. Iteration
//! order is ascending agent id, which keeps tick processing deterministic.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::models::AgentId;

#[derive(Debug)]
pub struct AgentRegistry<T> {
    entries: BTreeMap<AgentId, T>,
    pending_spawn: Vec<(AgentId, T)>,
    pending_despawn: Vec<AgentId>,
}

impl<T> Default for AgentRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AgentRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            pending_spawn: Vec::new(),
            pending_despawn: Vec::new(),
        }
    }

    /// Queue an agent for insertion at the next commit.
    pub fn spawn(&mut self, id: AgentId, entry: T) -> Result<()> {
        let queued = self.pending_spawn.iter().any(|(pending, _)| *pending == id);
        if queued || self.entries.contains_key(&id) {
            return Err(CoreError::DuplicateAgent(id.0));
        }
        self.pending_spawn.push((id, entry));
        Ok(())
    }

    /// Queue an agent for removal at the next commit.
    pub fn despawn(&mut self, id: AgentId) -> Result<()> {
        let queued = self.pending_spawn.iter().any(|(pending, _)| *pending == id);
        if !queued && !self.entries.contains_key(&id) {
            return Err(CoreError::AgentNotFound(id.0));
        }
        self.pending_despawn.push(id);
        Ok(())
    }

    /// Apply queued spawns and despawns. Called at tick boundaries only.
    pub fn commit(&mut self) {
        for (id, entry) in self.pending_spawn.drain(..) {
            debug!(agent = id.0, "agent registered");
            self.entries.insert(id, entry);
        }
        for id in self.pending_despawn.drain(..) {
            if self.entries.remove(&id).is_some() {
                debug!(agent = id.0, "agent removed");
            }
        }
    }

    /// Snapshot of live ids in ascending order; safe to hold while the
    /// registry queues further spawns or despawns.
    pub fn ids(&self) -> Vec<AgentId> {
        self.entries.keys().copied().collect()
    }

    pub fn get(&self, id: AgentId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &T)> {
        self.entries.iter()
    }
}
