//! Agent identity and per-tick pose snapshots.

use serde::{Deserialize, Serialize};

use crate::engine::math::Vec3;

/// Unique id of an NPC agent owned by the behavior core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Id of a tracked target (usually the player) owned by the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u32);

/// Handle to a placeholder NPC standing in a checkpoint queue. The core
/// only orders and drains these; the host owns the actual entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcHandle(pub u32);

/// Agent archetype, deciding which state machine drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Archetype {
    Pursuer,
    Checkpoint,
}

/// Read-only world transform snapshot, refreshed by the host every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub position: Vec3,
    /// Unit forward direction.
    pub forward: Vec3,
}

impl AgentPose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }
}

/// Movement speed per behavior state; the core only reports the desired
/// speed to the navigation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedProfile {
    pub walk: f32,
    pub run: f32,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self { walk: 1.5, run: 4.0 }
    }
}
