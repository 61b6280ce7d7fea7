//! Trait contracts for the collaborators outside the behavior core.
//!
//! The core never owns navigation, animation, audio, or the target's
//! inventory; it talks to all of them through these traits, injected at
//! construction time. Implementations must tolerate stale ids: an
//! operation against an already-destroyed agent or target is a no-op.

use serde::{Deserialize, Serialize};

use crate::engine::math::Vec3;
use crate::models::{AgentId, ItemDescriptor, TargetId};

/// Symbolic animation state; the collaborator resolves the tag to a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimTag {
    Idle,
    Walking,
    Running,
    Struggling,
    Dead,
}

/// Fire-and-forget audio cue tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEvent {
    /// A pursuer grabbed its target and a struggle session opened.
    Grab,
    /// Checkpoint credential accepted.
    CheckpointAccept,
    /// Checkpoint credential rejected.
    CheckpointReject,
    /// Idle pursuer vocalization.
    Growl,
    /// Global tension state flipped on (some agent's range contains the player).
    TensionStarted,
    /// Global tension state flipped off.
    TensionEnded,
}

/// Path-following collaborator. The core only requests destinations and
/// reads progress; it never computes paths.
pub trait Navigation {
    fn request_destination(&mut self, agent: AgentId, point: Vec3);
    /// Remaining path distance, `None` when the agent has no active path.
    fn remaining_distance(&self, agent: AgentId) -> Option<f32>;
    fn velocity(&self, agent: AgentId) -> Option<Vec3>;
    /// Halt the agent and clear its current path.
    fn stop(&mut self, agent: AgentId);
    fn set_speed(&mut self, agent: AgentId, speed: f32);
    /// Translate the agent by a raw offset (knock-back), bypassing the path.
    fn displace(&mut self, agent: AgentId, offset: Vec3);
}

/// Animation collaborator: receives a symbolic state per agent.
pub trait Animation {
    fn set_state(&mut self, agent: AgentId, tag: AnimTag);
}

/// Audio/tension collaborator. No return value is ever consumed.
pub trait AudioSink {
    fn set_tension_level(&mut self, level: f32);
    fn trigger_event(&mut self, event: AudioEvent);
}

/// Suspends or restores a target's independent movement during a struggle.
pub trait ControlLock {
    fn set_control_active(&mut self, target: TargetId, active: bool);
}

/// Query and mutation surface of host-owned targets.
pub trait TargetWorld {
    fn is_alive(&self, target: TargetId) -> bool;
    fn position(&self, target: TargetId) -> Option<Vec3>;
    fn held_item(&self, target: TargetId) -> Option<ItemDescriptor>;
    /// Consume the held item; returns false when nothing was held.
    fn consume_held_item(&mut self, target: TargetId) -> bool;
    fn kill(&mut self, target: TargetId);
}

/// Bundle of collaborator handles passed into every tick.
pub struct Services<'a> {
    pub nav: &'a mut dyn Navigation,
    pub anim: &'a mut dyn Animation,
    pub audio: &'a mut dyn AudioSink,
    pub control: &'a mut dyn ControlLock,
    pub world: &'a mut dyn TargetWorld,
    pub ray: &'a dyn crate::engine::perception::RayCaster,
}
