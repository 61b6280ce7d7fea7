//! Checkpoint state machine: WaitInLine, Chase, Cleared.
//!
//! The agent mans a queue of waiting NPCs, draining one entry per fixed
//! interval. Once the queue is empty it hunts the nearest perceived target
//! and inspects its held item on contact: the required credential clears
//! the agent permanently, anything else is rejected and the hunt resumes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::deterministic::{derive_seed, subcase};
use crate::engine::math::{self, Vec3};
use crate::engine::patrol::{PatrolConfig, PatrolPlanner};
use crate::engine::perception::{PerceptionResult, SensorConfig};
use crate::engine::services::{AnimTag, AudioEvent, Services};
use crate::error::{CoreError, Result};
use crate::models::{AgentId, AgentPose, ItemCategory, NpcHandle, SpeedProfile, TargetId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub sensor: SensorConfig,
    pub patrol: PatrolConfig,
    pub speeds: SpeedProfile,
    /// Seconds between queue entries being processed.
    pub drain_interval: f32,
    /// Contact distance at which the held item is inspected.
    pub interaction_range: f32,
    /// Gap between consecutive queue slots.
    pub queue_spacing: f32,
    /// Item category that clears the checkpoint.
    pub required_credential: ItemCategory,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            patrol: PatrolConfig::default(),
            speeds: SpeedProfile::default(),
            drain_interval: 60.0,
            interaction_range: 1.5,
            queue_spacing: 2.0,
            required_credential: ItemCategory::Document,
        }
    }
}

impl CheckpointConfig {
    pub fn validate(&self) -> Result<()> {
        if self.drain_interval <= 0.0 {
            return Err(CoreError::InvalidParameter(
                "drain_interval must be positive".into(),
            ));
        }
        if self.interaction_range <= 0.0 {
            return Err(CoreError::InvalidParameter(
                "interaction_range must be positive".into(),
            ));
        }
        if self.queue_spacing <= 0.0 {
            return Err(CoreError::InvalidParameter(
                "queue_spacing must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointState {
    WaitInLine,
    Chase,
    Cleared,
}

/// Timed FIFO of NPCs waiting at the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointQueue {
    entries: VecDeque<NpcHandle>,
    timer: f32,
}

impl CheckpointQueue {
    pub fn new(entries: Vec<NpcHandle>) -> Self {
        Self { entries: entries.into(), timer: 0.0 }
    }

    /// Advance the drain timer; pops at most one entry per call, carrying
    /// any overshoot into the next interval. Idle while empty.
    pub fn update(&mut self, dt: f32, interval: f32) -> Option<NpcHandle> {
        if self.entries.is_empty() {
            return None;
        }
        self.timer += dt;
        if self.timer < interval {
            return None;
        }
        self.timer -= interval;
        self.entries.pop_front()
    }

    /// World position of the slot at `index`, counting back from the head.
    pub fn slot_position(line_start: Vec3, line_back: Vec3, spacing: f32, index: usize) -> Vec3 {
        math::add(line_start, math::scale(line_back, spacing * index as f32))
    }

    /// Current slot assignments, head of the line first.
    pub fn slots(&self, line_start: Vec3, line_back: Vec3, spacing: f32) -> Vec<(NpcHandle, Vec3)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, handle)| (*handle, Self::slot_position(line_start, line_back, spacing, i)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one credential inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointDecision {
    pub has_required_item: bool,
    pub consumed_item: bool,
}

/// Whether `held` satisfies the required category. Masks match on the
/// exact mask kind, other categories on the category alone.
pub fn credential_matches(held: Option<&ItemCategory>, required: &ItemCategory) -> bool {
    match held {
        Some(category) => category == required,
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointMachine {
    id: AgentId,
    config: CheckpointConfig,
    state: CheckpointState,
    queue: CheckpointQueue,
    line_start: Vec3,
    /// Direction the line extends in, away from the head slot.
    line_back: Vec3,
    patrol: PatrolPlanner,
    /// Contact latch; decisions are made on the rising edge only.
    in_contact: bool,
}

impl CheckpointMachine {
    pub fn new(
        id: AgentId,
        line_start: Vec3,
        line_back: Vec3,
        queue: Vec<NpcHandle>,
        config: CheckpointConfig,
        world_seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            state: CheckpointState::WaitInLine,
            queue: CheckpointQueue::new(queue),
            line_start,
            line_back: math::normalize(line_back),
            patrol: PatrolPlanner::new(
                line_start,
                config.patrol,
                derive_seed(world_seed, id.0, subcase::PATROL),
            ),
            config,
            in_contact: false,
        })
    }

    pub fn state(&self) -> CheckpointState {
        self.state
    }

    pub fn sensor(&self) -> &SensorConfig {
        &self.config.sensor
    }

    pub fn queue(&self) -> &CheckpointQueue {
        &self.queue
    }

    /// Slot assignments for the NPCs still waiting in line.
    pub fn line_slots(&self) -> Vec<(NpcHandle, Vec3)> {
        self.queue
            .slots(self.line_start, self.line_back, self.config.queue_spacing)
    }

    /// Advance one tick. `contact` reports a host-side collision with the
    /// perceived target since the previous tick; proximity within
    /// `interaction_range` counts as contact too.
    pub fn tick(
        &mut self,
        dt: f32,
        pose: &AgentPose,
        perception: &PerceptionResult,
        contact: bool,
        services: &mut Services<'_>,
    ) {
        match self.state {
            CheckpointState::WaitInLine => self.tick_wait(dt, services),
            CheckpointState::Chase => self.tick_chase(pose, perception, contact, services),
            CheckpointState::Cleared => self.tick_cleared(dt, services),
        }
    }

    fn tick_wait(&mut self, dt: f32, services: &mut Services<'_>) {
        services.anim.set_state(self.id, AnimTag::Idle);
        if let Some(handle) = self.queue.update(dt, self.config.drain_interval) {
            debug!(agent = self.id.0, npc = handle.0, "queue entry processed");
        }
        if self.queue.is_empty() {
            info!(agent = self.id.0, "queue drained, hunting");
            self.state = CheckpointState::Chase;
        }
    }

    fn tick_chase(
        &mut self,
        pose: &AgentPose,
        perception: &PerceptionResult,
        contact: bool,
        services: &mut Services<'_>,
    ) {
        let target = match perception.visible_target() {
            Some(target) => target,
            None => {
                services.anim.set_state(self.id, AnimTag::Idle);
                self.in_contact = false;
                return;
            }
        };
        let target_pos = match services.world.position(target) {
            Some(pos) => pos,
            None => {
                self.in_contact = false;
                return;
            }
        };
        services.anim.set_state(self.id, AnimTag::Running);
        services.nav.set_speed(self.id, self.config.speeds.run);
        services.nav.request_destination(self.id, target_pos);

        let near = math::distance(pose.position, target_pos) <= self.config.interaction_range;
        let touching = near || contact;
        if touching && !self.in_contact {
            let decision = self.inspect(target, services);
            if decision.has_required_item {
                info!(agent = self.id.0, target = target.0, "credential accepted");
                services.audio.trigger_event(AudioEvent::CheckpointAccept);
                services.nav.stop(self.id);
                self.patrol.reset();
                self.state = CheckpointState::Cleared;
            } else {
                debug!(agent = self.id.0, target = target.0, "credential rejected");
                services.audio.trigger_event(AudioEvent::CheckpointReject);
            }
        }
        self.in_contact = touching;
    }

    fn inspect(&self, target: TargetId, services: &mut Services<'_>) -> CheckpointDecision {
        let held = services.world.held_item(target);
        let matches =
            credential_matches(held.as_ref().map(|i| &i.category), &self.config.required_credential);
        let consumed = matches && services.world.consume_held_item(target);
        CheckpointDecision { has_required_item: matches, consumed_item: consumed }
    }

    fn tick_cleared(&mut self, dt: f32, services: &mut Services<'_>) {
        services.anim.set_state(self.id, AnimTag::Walking);
        services.nav.set_speed(self.id, self.config.speeds.walk);
        if let Some(point) = self
            .patrol
            .update(dt, services.nav.remaining_distance(self.id))
        {
            services.nav.request_destination(self.id, point);
        }
    }
}
