//! Global tension scalar exposed to presentation collaborators.
//!
//! Tension rises while any registered agent's detection range contains the
//! player and falls back when the player is clear; the aggregator is a pure
//! consumer of perception-side data and never drives agent decisions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::services::{AudioEvent, AudioSink};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensionConfig {
    /// Level gained per second while an agent is in range.
    pub rise_rate: f32,
    /// Level lost per second while safe.
    pub fall_rate: f32,
}

impl Default for TensionConfig {
    fn default() -> Self {
        Self { rise_rate: 0.5, fall_rate: 1.0 }
    }
}

/// Clamped [0, 1] alert level with edge events on state flips.
#[derive(Debug, Clone)]
pub struct TensionAggregator {
    config: TensionConfig,
    level: f32,
    threatened: bool,
}

impl TensionAggregator {
    pub fn new(config: TensionConfig) -> Self {
        Self { config, level: 0.0, threatened: false }
    }

    /// Integrate one tick. `any_agent_in_range` is the result of testing
    /// the player position against every live agent's detection range.
    pub fn update(&mut self, dt: f32, any_agent_in_range: bool, audio: &mut dyn AudioSink) {
        if any_agent_in_range {
            self.level += self.config.rise_rate * dt;
        } else {
            self.level -= self.config.fall_rate * dt;
        }
        self.level = self.level.clamp(0.0, 1.0);

        if any_agent_in_range != self.threatened {
            self.threatened = any_agent_in_range;
            debug!(threatened = self.threatened, "tension state flipped");
            audio.trigger_event(if self.threatened {
                AudioEvent::TensionStarted
            } else {
                AudioEvent::TensionEnded
            });
        }
        audio.set_tension_level(self.level);
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_threatened(&self) -> bool {
        self.threatened
    }
}
