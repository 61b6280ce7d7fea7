//! Pursuer state machine: Patrol, Chase, Struggle, Cooldown.
//!
//! ```text
//! Patrol <-> Chase -> Struggle -> Cooldown -> { Chase, Patrol }
//! ```
//! Chase engages as soon as perception reports any target in detection
//! range. A grab opens a struggle session; its verdict decides whether the
//! target escapes (knock-back on the pursuer) or dies. Cooldown halts the
//! pursuer completely before it re-engages.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::deterministic::{derive_seed, subcase};
use crate::engine::math::{self, Vec3};
use crate::engine::patrol::{PatrolConfig, PatrolPlanner};
use crate::engine::perception::{PerceptionResult, SensorConfig};
use crate::engine::qte::{QteConfig, QteOutcome, QteSession};
use crate::engine::services::{AnimTag, AudioEvent, Services};
use crate::error::{CoreError, Result};
use crate::models::{AgentId, AgentPose, SpeedProfile, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PursuerConfig {
    pub sensor: SensorConfig,
    pub qte: QteConfig,
    pub patrol: PatrolConfig,
    pub speeds: SpeedProfile,
    /// Forward distance from the agent to the center of its grab region.
    pub attack_offset: f32,
    /// Radius of the grab region.
    pub attack_radius: f32,
    /// Full stop after a struggle resolves, seconds.
    pub cooldown_seconds: f32,
    /// Bounds of the randomized growl interval, seconds.
    pub growl_interval_min: f32,
    pub growl_interval_max: f32,
}

impl Default for PursuerConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            qte: QteConfig::default(),
            patrol: PatrolConfig::default(),
            speeds: SpeedProfile::default(),
            attack_offset: 1.0,
            attack_radius: 0.75,
            cooldown_seconds: 3.0,
            growl_interval_min: 3.0,
            growl_interval_max: 8.0,
        }
    }
}

impl PursuerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.attack_radius <= 0.0 {
            return Err(CoreError::InvalidParameter(
                "attack_radius must be positive".into(),
            ));
        }
        if self.cooldown_seconds < 0.0 {
            return Err(CoreError::InvalidParameter(
                "cooldown_seconds must not be negative".into(),
            ));
        }
        if self.growl_interval_min > self.growl_interval_max || self.growl_interval_min <= 0.0 {
            return Err(CoreError::InvalidParameter(
                "growl interval bounds must be positive and ordered".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PursuerState {
    Patrol,
    Chase,
    Struggle { target: TargetId },
    Cooldown { remaining: f32 },
}

/// Randomized vocalization scheduler on its own rng stream.
#[derive(Debug, Clone)]
struct GrowlTimer {
    rng: ChaCha8Rng,
    min: f32,
    max: f32,
    remaining: f32,
}

impl GrowlTimer {
    fn new(min: f32, max: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let remaining = rng.gen_range(min..=max);
        Self { rng, min, max, remaining }
    }

    /// Returns true when a growl is due this tick.
    fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = self.rng.gen_range(self.min..=self.max);
            return true;
        }
        false
    }
}

#[derive(Debug, Clone)]
pub struct PursuerMachine {
    id: AgentId,
    config: PursuerConfig,
    state: PursuerState,
    qte: QteSession,
    patrol: PatrolPlanner,
    growl: GrowlTimer,
}

impl PursuerMachine {
    pub fn new(id: AgentId, home: Vec3, config: PursuerConfig, world_seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            state: PursuerState::Patrol,
            qte: QteSession::new(config.qte),
            patrol: PatrolPlanner::new(
                home,
                config.patrol,
                derive_seed(world_seed, id.0, subcase::PATROL),
            ),
            growl: GrowlTimer::new(
                config.growl_interval_min,
                config.growl_interval_max,
                derive_seed(world_seed, id.0, subcase::GROWL),
            ),
            config,
        })
    }

    pub fn state(&self) -> &PursuerState {
        &self.state
    }

    pub fn sensor(&self) -> &SensorConfig {
        &self.config.sensor
    }

    pub fn qte(&self) -> &QteSession {
        &self.qte
    }

    /// Advance one tick. `pulses` is the count of struggle inputs buffered
    /// for this agent since the previous tick; it is ignored outside the
    /// Struggle state.
    pub fn tick(
        &mut self,
        dt: f32,
        pose: &AgentPose,
        perception: &PerceptionResult,
        pulses: u32,
        services: &mut Services<'_>,
    ) {
        match self.state {
            PursuerState::Patrol => self.tick_patrol(dt, perception, services),
            PursuerState::Chase => self.tick_chase(dt, pose, perception, services),
            PursuerState::Struggle { target } => {
                self.tick_struggle(dt, pose, target, pulses, services)
            }
            PursuerState::Cooldown { .. } => self.tick_cooldown(dt, perception, services),
        }
    }

    fn tick_patrol(
        &mut self,
        dt: f32,
        perception: &PerceptionResult,
        services: &mut Services<'_>,
    ) {
        self.growl_tick(dt, services);
        services.anim.set_state(self.id, AnimTag::Walking);
        services.nav.set_speed(self.id, self.config.speeds.walk);
        if let Some(point) = self
            .patrol
            .update(dt, services.nav.remaining_distance(self.id))
        {
            services.nav.request_destination(self.id, point);
        }
        if perception.visible_target().is_some() {
            debug!(agent = self.id.0, "pursuer engaging");
            self.state = PursuerState::Chase;
        }
    }

    fn tick_chase(
        &mut self,
        dt: f32,
        pose: &AgentPose,
        perception: &PerceptionResult,
        services: &mut Services<'_>,
    ) {
        self.growl_tick(dt, services);
        // Occlusion or leaving the cone ends the chase just like leaving
        // detection range does.
        let target = match perception.visible_target() {
            Some(target) => target,
            None => {
                debug!(agent = self.id.0, "pursuer lost sight of its target");
                self.patrol.reset();
                self.state = PursuerState::Patrol;
                return;
            }
        };
        services.anim.set_state(self.id, AnimTag::Running);
        services.nav.set_speed(self.id, self.config.speeds.run);
        let target_pos = match services.world.position(target) {
            Some(pos) => pos,
            // Stale handle: drop back to patrol next tick via perception.
            None => return,
        };
        services.nav.request_destination(self.id, target_pos);

        let grab_center =
            math::add(pose.position, math::scale(pose.forward, self.config.attack_offset));
        if math::distance(grab_center, target_pos) <= self.config.attack_radius {
            self.begin_struggle(target, services);
        }
    }

    fn begin_struggle(&mut self, target: TargetId, services: &mut Services<'_>) {
        info!(agent = self.id.0, target = target.0, "pursuer grabbed target");
        self.qte.start();
        services.control.set_control_active(target, false);
        services.nav.stop(self.id);
        services.anim.set_state(self.id, AnimTag::Struggling);
        services.audio.trigger_event(AudioEvent::Grab);
        self.state = PursuerState::Struggle { target };
    }

    fn tick_struggle(
        &mut self,
        dt: f32,
        pose: &AgentPose,
        target: TargetId,
        pulses: u32,
        services: &mut Services<'_>,
    ) {
        services.anim.set_state(self.id, AnimTag::Struggling);
        if !services.world.is_alive(target) {
            // Target destroyed externally mid-struggle: no verdict, no
            // control restore against the dead handle.
            debug!(agent = self.id.0, target = target.0, "struggle target gone");
            self.qte.abort();
            self.enter_cooldown(services);
            return;
        }
        for _ in 0..pulses {
            self.qte.on_input_pulse();
        }
        match self.qte.tick(dt) {
            QteOutcome::Running => {}
            QteOutcome::Won => {
                info!(agent = self.id.0, target = target.0, "target escaped struggle");
                services.control.set_control_active(target, true);
                let knockback =
                    math::scale(pose.forward, -self.config.qte.knockback_distance);
                services.nav.displace(self.id, knockback);
                self.enter_cooldown(services);
            }
            QteOutcome::Lost => {
                info!(agent = self.id.0, target = target.0, "struggle lost, target killed");
                services.control.set_control_active(target, true);
                services.world.kill(target);
                self.enter_cooldown(services);
            }
        }
    }

    fn enter_cooldown(&mut self, services: &mut Services<'_>) {
        services.nav.stop(self.id);
        services.anim.set_state(self.id, AnimTag::Idle);
        self.state = PursuerState::Cooldown { remaining: self.config.cooldown_seconds };
    }

    fn tick_cooldown(
        &mut self,
        dt: f32,
        perception: &PerceptionResult,
        services: &mut Services<'_>,
    ) {
        self.growl_tick(dt, services);
        services.anim.set_state(self.id, AnimTag::Idle);
        // Movement stays fully halted until the timer elapses.
        let PursuerState::Cooldown { remaining } = &mut self.state else {
            return;
        };
        *remaining -= dt;
        if *remaining > 0.0 {
            return;
        }
        if perception.visible_target().is_some() {
            debug!(agent = self.id.0, "cooldown over, re-engaging");
            self.state = PursuerState::Chase;
        } else {
            debug!(agent = self.id.0, "cooldown over, resuming patrol");
            self.patrol.reset();
            self.state = PursuerState::Patrol;
        }
    }

    fn growl_tick(&mut self, dt: f32, services: &mut Services<'_>) {
        if self.growl.tick(dt) {
            services.audio.trigger_event(AudioEvent::Growl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::perception::sense;
    use crate::engine::test_fixtures::Collaborators;
    use crate::engine::timestep::TICK_DT;

    const PLAYER: TargetId = TargetId(1);

    fn machine() -> PursuerMachine {
        PursuerMachine::new(AgentId(1), (0.0, 0.0, 0.0), PursuerConfig::default(), 42).unwrap()
    }

    fn perceiving(target: TargetId) -> PerceptionResult {
        PerceptionResult {
            target: Some(target),
            in_front_hemisphere: true,
            in_field_of_view: true,
            in_range: true,
            has_line_of_sight: true,
        }
    }

    fn occluded(target: TargetId) -> PerceptionResult {
        PerceptionResult {
            target: Some(target),
            in_front_hemisphere: true,
            in_field_of_view: true,
            in_range: true,
            has_line_of_sight: false,
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PursuerConfig { attack_radius: 0.0, ..PursuerConfig::default() };
        assert!(matches!(
            PursuerMachine::new(AgentId(1), (0.0, 0.0, 0.0), config, 42),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_patrol_requests_walk_destinations() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &PerceptionResult::none(), 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Patrol));
        assert_eq!(collab.nav.destinations.len(), 1);
        assert_eq!(collab.nav.speeds, vec![(AgentId(1), 1.5)]);
        assert_eq!(collab.anim.states, vec![(AgentId(1), AnimTag::Walking)]);
    }

    #[test]
    fn test_detection_switches_to_chase() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 3.0));
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Chase));
        // The chase tick that follows runs at target position.
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
        assert_eq!(collab.nav.destinations.last(), Some(&(AgentId(1), (0.0, 0.0, 3.0))));
        assert_eq!(collab.nav.speeds.last(), Some(&(AgentId(1), 4.0)));
    }

    #[test]
    fn test_occluded_target_is_not_engaged() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 3.0));
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        // Nearest candidate exists but scenery blocks the sight line.
        for _ in 0..40 {
            m.tick(TICK_DT, &pose, &occluded(PLAYER), 0, &mut collab.services());
            assert!(matches!(m.state(), PursuerState::Patrol));
        }
    }

    #[test]
    fn test_occlusion_mid_chase_breaks_off() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 3.0));
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Chase));
        m.tick(TICK_DT, &pose, &occluded(PLAYER), 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Patrol));
    }

    #[test]
    fn test_losing_target_returns_to_patrol() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 3.0));
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
        m.tick(TICK_DT, &pose, &PerceptionResult::none(), 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Patrol));
    }

    fn grab(m: &mut PursuerMachine, collab: &mut Collaborators) {
        collab.world.insert(PLAYER, (0.0, 0.0, 1.2));
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Struggle { .. }));
    }

    #[test]
    fn test_grab_opens_struggle_and_locks_target() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        grab(&mut m, &mut collab);
        assert!(m.qte().is_active());
        assert_eq!(collab.control.calls, vec![(PLAYER, false)]);
        assert_eq!(collab.nav.stops, vec![AgentId(1)]);
        assert!(collab.audio.events.contains(&AudioEvent::Grab));
    }

    #[test]
    fn test_struggle_won_restores_control_and_knocks_back() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        grab(&mut m, &mut collab);
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        // 0.5 initial + 6 pulses * 0.1 wins on the next tick.
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 6, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Cooldown { .. }));
        assert_eq!(collab.control.calls.last(), Some(&(PLAYER, true)));
        assert_eq!(collab.nav.displacements, vec![(AgentId(1), (0.0, 0.0, -7.0))]);
        assert!(collab.world.killed.is_empty());
    }

    #[test]
    fn test_struggle_lost_kills_target() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        grab(&mut m, &mut collab);
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        // No pulses: drain the clock until the session resolves.
        for _ in 0..110 {
            m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
            if matches!(m.state(), PursuerState::Cooldown { .. }) {
                break;
            }
        }
        assert!(matches!(m.state(), PursuerState::Cooldown { .. }));
        assert_eq!(collab.world.killed, vec![PLAYER]);
        assert_eq!(collab.control.calls.last(), Some(&(PLAYER, true)));
        assert!(collab.nav.displacements.is_empty());
    }

    #[test]
    fn test_external_destruction_aborts_without_restore() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        grab(&mut m, &mut collab);
        collab.world.targets.get_mut(&PLAYER).unwrap().alive = false;
        let calls_before = collab.control.calls.len();
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 3, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Cooldown { .. }));
        assert!(!m.qte().is_active());
        assert_eq!(collab.control.calls.len(), calls_before);
        assert!(collab.world.killed.is_empty());
    }

    #[test]
    fn test_cooldown_halts_then_reengages() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        grab(&mut m, &mut collab);
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 6, &mut collab.services());
        let destinations_before = collab.nav.destinations.len();
        // 3 seconds of cooldown at 20 ticks per second, allowing float drift.
        let mut halted_ticks = 0;
        while matches!(m.state(), PursuerState::Cooldown { .. }) {
            m.tick(TICK_DT, &pose, &perceiving(PLAYER), 0, &mut collab.services());
            halted_ticks += 1;
            assert!(halted_ticks <= 62, "cooldown never elapsed");
        }
        assert!(halted_ticks >= 58, "cooldown ended after {} ticks", halted_ticks);
        assert_eq!(collab.nav.destinations.len(), destinations_before);
        assert!(matches!(m.state(), PursuerState::Chase));
    }

    #[test]
    fn test_cooldown_without_target_resumes_patrol() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        grab(&mut m, &mut collab);
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        m.tick(TICK_DT, &pose, &perceiving(PLAYER), 6, &mut collab.services());
        for _ in 0..61 {
            m.tick(TICK_DT, &pose, &PerceptionResult::none(), 0, &mut collab.services());
        }
        assert!(matches!(m.state(), PursuerState::Patrol));
    }

    #[test]
    fn test_growl_gaps_stay_within_interval_bounds() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        let mut growl_ticks = Vec::new();
        for tick in 0..2000u32 {
            let before = collab.audio.events.len();
            m.tick(TICK_DT, &pose, &PerceptionResult::none(), 0, &mut collab.services());
            if collab.audio.events.len() > before {
                assert_eq!(collab.audio.events.last(), Some(&AudioEvent::Growl));
                growl_ticks.push(tick);
            }
        }
        // 100 seconds of patrolling yields many growls from the 3..8s range.
        assert!(growl_ticks.len() >= 10, "got {} growls", growl_ticks.len());
        for pair in growl_ticks.windows(2) {
            let gap_seconds = (pair[1] - pair[0]) as f32 * TICK_DT;
            assert!(
                (2.9..=8.1).contains(&gap_seconds),
                "growl gap {} s outside bounds",
                gap_seconds
            );
        }
    }

    #[test]
    fn test_full_sense_to_chase_pipeline() {
        let mut m = machine();
        let mut collab = Collaborators::default();
        collab.world.insert(PLAYER, (0.0, 0.0, 4.0));
        collab.sync_ray();
        let pose = AgentPose::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0));
        let snapshot = crate::engine::perception::TargetSnapshot {
            id: PLAYER,
            position: (0.0, 0.0, 4.0),
        };
        let perception = sense(&pose, m.sensor(), &[snapshot], &collab.ray);
        assert!(perception.has_line_of_sight);
        m.tick(TICK_DT, &pose, &perception, 0, &mut collab.services());
        assert!(matches!(m.state(), PursuerState::Chase));
    }
}
