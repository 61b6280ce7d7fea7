//! Random patrol around a home position.
//!
//! Points are sampled uniformly in a disc of `radius` around home; the
//! planner dwells at each reached point before picking the next, and
//! resamples every tick while navigation reports no viable path.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::engine::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatrolConfig {
    /// Maximum distance of patrol points from the home position.
    pub radius: f32,
    /// Seconds to wait at a reached point before moving on.
    pub dwell_seconds: f32,
    /// Remaining path distance under which a point counts as reached.
    pub arrive_distance: f32,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self { radius: 25.0, dwell_seconds: 3.0, arrive_distance: 0.5 }
    }
}

/// Per-agent patrol state advanced each tick.
#[derive(Debug, Clone)]
pub struct PatrolPlanner {
    home: Vec3,
    config: PatrolConfig,
    rng: ChaCha8Rng,
    current: Option<Vec3>,
    dwell_remaining: f32,
}

impl PatrolPlanner {
    pub fn new(home: Vec3, config: PatrolConfig, seed: u64) -> Self {
        Self {
            home,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            current: None,
            dwell_remaining: 0.0,
        }
    }

    /// Advance the planner; returns a destination to request this tick,
    /// if a new one was picked. `remaining_distance` is the navigation
    /// collaborator's progress report, `None` meaning no active path
    /// (unreached destination was unreachable, or none requested yet).
    pub fn update(&mut self, dt: f32, remaining_distance: Option<f32>) -> Option<Vec3> {
        match (self.current, remaining_distance) {
            (None, _) => Some(self.pick_point()),
            // Path was dropped: the point was unreachable, retry.
            (Some(_), None) => Some(self.pick_point()),
            (Some(_), Some(remaining)) => {
                if remaining > self.config.arrive_distance {
                    return None;
                }
                self.dwell_remaining -= dt;
                if self.dwell_remaining <= 0.0 {
                    Some(self.pick_point())
                } else {
                    None
                }
            }
        }
    }

    /// Forget the current point so the next `update` starts fresh. Used
    /// when the owner re-enters its patrol state after a chase.
    pub fn reset(&mut self) {
        self.current = None;
        self.dwell_remaining = 0.0;
    }

    pub fn current_point(&self) -> Option<Vec3> {
        self.current
    }

    pub fn home(&self) -> Vec3 {
        self.home
    }

    fn pick_point(&mut self) -> Vec3 {
        // Uniform over the disc: sqrt on the radial draw.
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let r = self.config.radius * self.rng.gen::<f32>().sqrt();
        let point = (
            self.home.0 + angle.cos() * r,
            self.home.1,
            self.home.2 + angle.sin() * r,
        );
        self.current = Some(point);
        self.dwell_remaining = self.config.dwell_seconds;
        point
    }
}
