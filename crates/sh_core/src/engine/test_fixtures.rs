//! Centralized test fakes for the collaborator traits.
//!
//! Recording fakes capture every request the core emits so tests can
//! assert on the exact outgoing command streams.

use std::collections::HashMap;

use crate::engine::math::{self, Vec3};
use crate::engine::perception::{RayCaster, RayHit};
use crate::engine::services::{
    AnimTag, Animation, AudioEvent, AudioSink, ControlLock, Navigation, Services, TargetWorld,
};
use crate::models::{AgentId, ItemDescriptor, TargetId};

#[derive(Default)]
pub struct RecordingNav {
    pub destinations: Vec<(AgentId, Vec3)>,
    pub speeds: Vec<(AgentId, f32)>,
    pub stops: Vec<AgentId>,
    pub displacements: Vec<(AgentId, Vec3)>,
    /// Scripted remaining path distance per agent.
    pub remaining: HashMap<AgentId, f32>,
}

impl Navigation for RecordingNav {
    fn request_destination(&mut self, agent: AgentId, point: Vec3) {
        self.destinations.push((agent, point));
    }

    fn remaining_distance(&self, agent: AgentId) -> Option<f32> {
        self.remaining.get(&agent).copied()
    }

    fn velocity(&self, _agent: AgentId) -> Option<Vec3> {
        None
    }

    fn stop(&mut self, agent: AgentId) {
        self.stops.push(agent);
    }

    fn set_speed(&mut self, agent: AgentId, speed: f32) {
        self.speeds.push((agent, speed));
    }

    fn displace(&mut self, agent: AgentId, offset: Vec3) {
        self.displacements.push((agent, offset));
    }
}

#[derive(Default)]
pub struct RecordingAnim {
    pub states: Vec<(AgentId, AnimTag)>,
}

impl Animation for RecordingAnim {
    fn set_state(&mut self, agent: AgentId, tag: AnimTag) {
        self.states.push((agent, tag));
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    pub levels: Vec<f32>,
    pub events: Vec<AudioEvent>,
}

impl AudioSink for RecordingAudio {
    fn set_tension_level(&mut self, level: f32) {
        self.levels.push(level);
    }

    fn trigger_event(&mut self, event: AudioEvent) {
        self.events.push(event);
    }
}

#[derive(Default)]
pub struct RecordingControl {
    pub calls: Vec<(TargetId, bool)>,
}

impl ControlLock for RecordingControl {
    fn set_control_active(&mut self, target: TargetId, active: bool) {
        self.calls.push((target, active));
    }
}

pub struct FakeTarget {
    pub position: Vec3,
    pub alive: bool,
    pub held: Option<ItemDescriptor>,
}

#[derive(Default)]
pub struct FakeWorld {
    pub targets: HashMap<TargetId, FakeTarget>,
    pub killed: Vec<TargetId>,
    pub consumed: Vec<TargetId>,
}

impl FakeWorld {
    pub fn insert(&mut self, id: TargetId, position: Vec3) {
        self.targets.insert(id, FakeTarget { position, alive: true, held: None });
    }

    pub fn insert_with_item(&mut self, id: TargetId, position: Vec3, item: ItemDescriptor) {
        self.targets.insert(id, FakeTarget { position, alive: true, held: Some(item) });
    }
}

impl TargetWorld for FakeWorld {
    fn is_alive(&self, target: TargetId) -> bool {
        self.targets.get(&target).map(|t| t.alive).unwrap_or(false)
    }

    fn position(&self, target: TargetId) -> Option<Vec3> {
        self.targets.get(&target).filter(|t| t.alive).map(|t| t.position)
    }

    fn held_item(&self, target: TargetId) -> Option<ItemDescriptor> {
        self.targets.get(&target).and_then(|t| t.held.clone())
    }

    fn consume_held_item(&mut self, target: TargetId) -> bool {
        match self.targets.get_mut(&target).and_then(|t| t.held.take()) {
            Some(_) => {
                self.consumed.push(target);
                true
            }
            None => false,
        }
    }

    fn kill(&mut self, target: TargetId) {
        if let Some(t) = self.targets.get_mut(&target) {
            t.alive = false;
        }
        self.killed.push(target);
    }
}

/// Ray caster over an open scene: a ray reaches whichever known target
/// lies along its direction, with nothing in between.
#[derive(Default)]
pub struct SceneRay {
    pub targets: Vec<(TargetId, Vec3)>,
    /// When set, every ray hits scenery first.
    pub blocked: bool,
}

impl RayCaster for SceneRay {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        if self.blocked {
            return Some(RayHit::Scenery);
        }
        for (id, position) in &self.targets {
            let to_target = math::sub(*position, origin);
            if math::length(to_target) > max_distance {
                continue;
            }
            if math::dot(math::normalize(to_target), direction) > 0.999 {
                return Some(RayHit::Target(*id));
            }
        }
        None
    }
}

/// Full collaborator set backed by the recording fakes above.
#[derive(Default)]
pub struct Collaborators {
    pub nav: RecordingNav,
    pub anim: RecordingAnim,
    pub audio: RecordingAudio,
    pub control: RecordingControl,
    pub world: FakeWorld,
    pub ray: SceneRay,
}

impl Collaborators {
    /// Keep the ray caster's view of target positions current.
    pub fn sync_ray(&mut self) {
        self.ray.targets = self
            .world
            .targets
            .iter()
            .filter(|(_, t)| t.alive)
            .map(|(id, t)| (*id, t.position))
            .collect();
        self.ray.targets.sort_by_key(|(id, _)| *id);
    }

    pub fn services(&mut self) -> Services<'_> {
        Services {
            nav: &mut self.nav,
            anim: &mut self.anim,
            audio: &mut self.audio,
            control: &mut self.control,
            world: &mut self.world,
            ray: &self.ray,
        }
    }
}
