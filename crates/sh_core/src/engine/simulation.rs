//! Simulation root: owns every agent machine and advances them in one
//! fixed-timestep tick.
//!
//! The host supplies fresh pose and target snapshots each tick and receives
//! all effects through the `Services` collaborators. Input events (struggle
//! pulses, collision contacts) are buffered between ticks and drained at
//! the start of the next one.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::checkpoint::{CheckpointConfig, CheckpointMachine, CheckpointState};
use crate::engine::math::{self, Vec3};
use crate::engine::perception::{sense, PerceptionResult, SensorConfig, TargetSnapshot};
use crate::engine::pursuer::{PursuerConfig, PursuerMachine, PursuerState};
use crate::engine::registry::AgentRegistry;
use crate::engine::services::Services;
use crate::engine::tension::{TensionAggregator, TensionConfig};
use crate::engine::timestep::TICK_DT;
use crate::error::Result;
use crate::models::{AgentId, AgentPose, Archetype, NpcHandle, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// World seed all agent rng streams derive from.
    pub seed: u64,
    /// The target whose proximity drives global tension.
    pub player: TargetId,
    pub tension: TensionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            player: TargetId(0),
            tension: TensionConfig::default(),
        }
    }
}

/// Host-supplied world snapshot for one tick.
pub struct TickInput<'a> {
    /// Current pose of every live agent.
    pub poses: &'a [(AgentId, AgentPose)],
    /// Every target candidate perception may select.
    pub targets: &'a [TargetSnapshot],
}

enum AgentMachine {
    Pursuer(PursuerMachine),
    Checkpoint(CheckpointMachine),
}

struct AgentEntry {
    machine: AgentMachine,
    last_perception: PerceptionResult,
}

impl AgentEntry {
    fn sensor(&self) -> &SensorConfig {
        match &self.machine {
            AgentMachine::Pursuer(m) => m.sensor(),
            AgentMachine::Checkpoint(m) => m.sensor(),
        }
    }

    fn archetype(&self) -> Archetype {
        match &self.machine {
            AgentMachine::Pursuer(_) => Archetype::Pursuer,
            AgentMachine::Checkpoint(_) => Archetype::Checkpoint,
        }
    }
}

/// Coarse behavior state, mainly for host UI and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStateTag {
    Patrol,
    Chase,
    Struggle,
    Cooldown,
    WaitInLine,
    Cleared,
}

pub struct Simulation {
    config: SimulationConfig,
    registry: AgentRegistry<AgentEntry>,
    tension: TensionAggregator,
    pending_pulses: FxHashMap<TargetId, u32>,
    pending_contacts: Vec<(AgentId, TargetId)>,
    tick_count: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        info!(seed = config.seed, "simulation created");
        Self {
            tension: TensionAggregator::new(config.tension),
            config,
            registry: AgentRegistry::new(),
            pending_pulses: FxHashMap::default(),
            pending_contacts: Vec::new(),
            tick_count: 0,
        }
    }

    /// Queue a pursuer for spawning at the next tick boundary.
    pub fn spawn_pursuer(&mut self, id: AgentId, home: Vec3, config: PursuerConfig) -> Result<()> {
        let machine = PursuerMachine::new(id, home, config, self.config.seed)?;
        self.registry.spawn(
            id,
            AgentEntry {
                machine: AgentMachine::Pursuer(machine),
                last_perception: PerceptionResult::none(),
            },
        )
    }

    /// Queue a checkpoint agent for spawning at the next tick boundary.
    /// The line extends from `line_start` along `line_back`.
    pub fn spawn_checkpoint(
        &mut self,
        id: AgentId,
        line_start: Vec3,
        line_back: Vec3,
        queue: Vec<NpcHandle>,
        config: CheckpointConfig,
    ) -> Result<()> {
        let machine =
            CheckpointMachine::new(id, line_start, line_back, queue, config, self.config.seed)?;
        self.registry.spawn(
            id,
            AgentEntry {
                machine: AgentMachine::Checkpoint(machine),
                last_perception: PerceptionResult::none(),
            },
        )
    }

    /// Queue an agent for removal at the next tick boundary.
    pub fn despawn(&mut self, id: AgentId) -> Result<()> {
        self.registry.despawn(id)
    }

    /// Buffer one struggle input pulse aimed at `target`.
    pub fn on_interact_pulse(&mut self, target: TargetId) {
        *self.pending_pulses.entry(target).or_insert(0) += 1;
    }

    /// Buffer a host-reported collision between an agent and a target.
    pub fn on_contact(&mut self, agent: AgentId, target: TargetId) {
        self.pending_contacts.push((agent, target));
    }

    /// Advance the world by one fixed tick.
    pub fn tick(&mut self, input: &TickInput<'_>, services: &mut Services<'_>) {
        self.registry.commit();
        self.tick_count += 1;

        let poses: FxHashMap<AgentId, AgentPose> = input.poses.iter().copied().collect();
        let pulses = std::mem::take(&mut self.pending_pulses);
        let contacts = std::mem::take(&mut self.pending_contacts);

        for id in self.registry.ids() {
            let entry = match self.registry.get_mut(id) {
                Some(entry) => entry,
                None => continue,
            };
            let pose = match poses.get(&id) {
                Some(pose) => *pose,
                None => {
                    debug!(agent = id.0, "no pose supplied, agent skipped");
                    continue;
                }
            };
            let perception = sense(&pose, entry.sensor(), input.targets, services.ray);
            entry.last_perception = perception;

            match &mut entry.machine {
                AgentMachine::Pursuer(machine) => {
                    let routed = match machine.state() {
                        PursuerState::Struggle { target } => {
                            pulses.get(target).copied().unwrap_or(0)
                        }
                        _ => 0,
                    };
                    machine.tick(TICK_DT, &pose, &perception, routed, services);
                }
                AgentMachine::Checkpoint(machine) => {
                    let contact = perception
                        .target
                        .map(|target| contacts.contains(&(id, target)))
                        .unwrap_or(false);
                    machine.tick(TICK_DT, &pose, &perception, contact, services);
                }
            }
        }

        let threatened = self.player_in_any_range(&poses, input.targets);
        self.tension.update(TICK_DT, threatened, services.audio);
    }

    fn player_in_any_range(
        &self,
        poses: &FxHashMap<AgentId, AgentPose>,
        targets: &[TargetSnapshot],
    ) -> bool {
        let player_pos = match targets.iter().find(|t| t.id == self.config.player) {
            Some(snapshot) => snapshot.position,
            None => return false,
        };
        self.registry.iter().any(|(id, entry)| {
            poses.get(id).is_some_and(|pose| {
                math::distance(pose.position, player_pos) <= entry.sensor().detection_range
            })
        })
    }

    pub fn tension_level(&self) -> f32 {
        self.tension.level()
    }

    pub fn is_threatened(&self) -> bool {
        self.tension.is_threatened()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn agent_count(&self) -> usize {
        self.registry.len()
    }

    /// Live agent ids in ascending order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.registry.ids()
    }

    /// Coarse state of one agent, `None` for unknown ids.
    pub fn agent_state(&self, id: AgentId) -> Option<AgentStateTag> {
        self.registry.get(id).map(|entry| match &entry.machine {
            AgentMachine::Pursuer(m) => match m.state() {
                PursuerState::Patrol => AgentStateTag::Patrol,
                PursuerState::Chase => AgentStateTag::Chase,
                PursuerState::Struggle { .. } => AgentStateTag::Struggle,
                PursuerState::Cooldown { .. } => AgentStateTag::Cooldown,
            },
            AgentMachine::Checkpoint(m) => match m.state() {
                CheckpointState::WaitInLine => AgentStateTag::WaitInLine,
                CheckpointState::Chase => AgentStateTag::Chase,
                CheckpointState::Cleared => AgentStateTag::Cleared,
            },
        })
    }

    /// Perception computed for the agent on the most recent tick.
    pub fn agent_perception(&self, id: AgentId) -> Option<PerceptionResult> {
        self.registry.get(id).map(|entry| entry.last_perception)
    }

    /// Which state machine drives the agent.
    pub fn agent_archetype(&self, id: AgentId) -> Option<Archetype> {
        self.registry.get(id).map(|entry| entry.archetype())
    }

    /// Queue slot assignments for a checkpoint agent; `None` for unknown
    /// ids or non-checkpoint agents.
    pub fn queue_slots(&self, id: AgentId) -> Option<Vec<(NpcHandle, Vec3)>> {
        self.registry.get(id).and_then(|entry| match &entry.machine {
            AgentMachine::Checkpoint(m) => Some(m.line_slots()),
            AgentMachine::Pursuer(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_fixtures::Collaborators;
    use crate::error::CoreError;

    const PLAYER: TargetId = TargetId(1);

    fn sim() -> Simulation {
        Simulation::new(SimulationConfig { seed: 42, player: PLAYER, ..Default::default() })
    }

    fn step(sim: &mut Simulation, collab: &mut Collaborators, poses: &[(AgentId, AgentPose)]) {
        collab.sync_ray();
        let targets: Vec<TargetSnapshot> = collab
            .ray
            .targets
            .iter()
            .map(|(id, position)| TargetSnapshot { id: *id, position: *position })
            .collect();
        let input = TickInput { poses, targets: &targets };
        sim.tick(&input, &mut collab.services());
    }

    #[test]
    fn test_spawn_applies_at_tick_boundary() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        assert_eq!(sim.agent_count(), 0);
        step(&mut sim, &mut collab, &[]);
        assert_eq!(sim.agent_count(), 1);
        assert_eq!(sim.agent_state(AgentId(1)), Some(AgentStateTag::Patrol));
    }

    #[test]
    fn test_duplicate_spawn_is_error() {
        let mut sim = sim();
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        assert!(matches!(
            sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default()),
            Err(CoreError::DuplicateAgent(1))
        ));
    }

    #[test]
    fn test_missing_pose_skips_agent() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        step(&mut sim, &mut collab, &[]);
        step(&mut sim, &mut collab, &[]);
        // No behavior ran, no navigation requests went out.
        assert!(collab.nav.destinations.is_empty());
        assert_eq!(sim.agent_count(), 1);
    }

    #[test]
    fn test_pursuer_detects_and_chases_player() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 3.0));
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        let poses = [(AgentId(1), AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0)))];
        step(&mut sim, &mut collab, &poses);
        assert_eq!(sim.agent_state(AgentId(1)), Some(AgentStateTag::Chase));
        let perception = sim.agent_perception(AgentId(1)).unwrap();
        assert_eq!(perception.target, Some(PLAYER));
        assert!(perception.has_line_of_sight);
    }

    #[test]
    fn test_pulses_reach_struggling_machine() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 1.2));
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        let poses = [(AgentId(1), AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0)))];
        step(&mut sim, &mut collab, &poses);
        step(&mut sim, &mut collab, &poses);
        assert_eq!(sim.agent_state(AgentId(1)), Some(AgentStateTag::Struggle));
        for _ in 0..6 {
            sim.on_interact_pulse(PLAYER);
        }
        step(&mut sim, &mut collab, &poses);
        assert_eq!(sim.agent_state(AgentId(1)), Some(AgentStateTag::Cooldown));
        assert!(collab.world.killed.is_empty());
    }

    #[test]
    fn test_pulses_without_struggle_are_dropped() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 1.2));
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        let poses = [(AgentId(1), AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0)))];
        // Pulses buffered before any struggle exists must not leak into one.
        for _ in 0..20 {
            sim.on_interact_pulse(PLAYER);
        }
        step(&mut sim, &mut collab, &poses);
        step(&mut sim, &mut collab, &poses);
        assert_eq!(sim.agent_state(AgentId(1)), Some(AgentStateTag::Struggle));
        // With no further pulses the struggle eventually resolves Lost.
        for _ in 0..110 {
            step(&mut sim, &mut collab, &poses);
        }
        assert_eq!(collab.world.killed, vec![PLAYER]);
    }

    #[test]
    fn test_contact_routes_to_checkpoint() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 3.0));
        sim.spawn_checkpoint(
            AgentId(2),
            (0.0, 0.0, 0.0),
            (0.0, 0.0, -1.0),
            vec![],
            CheckpointConfig::default(),
        )
        .unwrap();
        let poses = [(AgentId(2), AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0)))];
        step(&mut sim, &mut collab, &poses);
        assert_eq!(sim.agent_state(AgentId(2)), Some(AgentStateTag::Chase));
        // Target sits outside interaction range; only the reported
        // collision makes the inspection happen.
        use crate::engine::services::AudioEvent;
        assert!(!collab.audio.events.contains(&AudioEvent::CheckpointReject));
        sim.on_contact(AgentId(2), PLAYER);
        step(&mut sim, &mut collab, &poses);
        assert!(collab.audio.events.contains(&AudioEvent::CheckpointReject));
    }

    #[test]
    fn test_tension_rises_near_agent_and_recovers() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 30.0));
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        let poses = [(AgentId(1), AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0)))];
        step(&mut sim, &mut collab, &poses);
        assert_eq!(sim.tension_level(), 0.0);
        assert!(!sim.is_threatened());

        collab.world.targets.get_mut(&PLAYER).unwrap().position = (0.0, 0.0, 4.0);
        for _ in 0..20 {
            step(&mut sim, &mut collab, &poses);
        }
        assert!(sim.is_threatened());
        assert!(sim.tension_level() > 0.0);

        collab.world.targets.get_mut(&PLAYER).unwrap().position = (0.0, 0.0, 30.0);
        for _ in 0..40 {
            step(&mut sim, &mut collab, &poses);
        }
        assert!(!sim.is_threatened());
        assert_eq!(sim.tension_level(), 0.0);
    }

    #[test]
    fn test_despawn_applies_at_tick_boundary() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        sim.spawn_pursuer(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default())
            .unwrap();
        step(&mut sim, &mut collab, &[]);
        sim.despawn(AgentId(1)).unwrap();
        assert_eq!(sim.agent_count(), 1);
        step(&mut sim, &mut collab, &[]);
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.agent_state(AgentId(1)), None);
    }

    #[test]
    fn test_queue_slots_exposed() {
        let mut sim = sim();
        let mut collab = Collaborators::default();
        sim.spawn_checkpoint(
            AgentId(2),
            (0.0, 0.0, 10.0),
            (0.0, 0.0, -1.0),
            vec![NpcHandle(1), NpcHandle(2)],
            CheckpointConfig::default(),
        )
        .unwrap();
        step(&mut sim, &mut collab, &[]);
        let slots = sim.queue_slots(AgentId(2)).unwrap();
        assert_eq!(
            slots,
            vec![
                (NpcHandle(1), (0.0, 0.0, 10.0)),
                (NpcHandle(2), (0.0, 0.0, 8.0)),
            ]
        );
        assert_eq!(sim.queue_slots(AgentId(99)), None);
    }
}
