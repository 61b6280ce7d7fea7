//! Timed skill-check ("struggle") state machine.
//!
//! A session holds a bounded progress value that decays every tick and is
//! pushed up by discrete input pulses. It resolves exactly once, to Won or
//! Lost, and is inert afterwards until restarted by its owner.
//!
//! ## Resolution rules
//! ```text
//! Idle -> Active -> { Won, Lost } -> Idle
//! ```
//! Pulses buffered since the last tick are applied before decay. Reaching
//! full progress wins; reaching zero progress loses immediately regardless
//! of remaining time; running out of time with partial progress also loses.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tuning parameters of a struggle session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QteConfig {
    /// Session time limit, seconds.
    pub time_limit: f32,
    /// Passive progress decay per second while active.
    pub decay_per_second: f32,
    /// Progress added by one input pulse.
    pub pulse_increment: f32,
    /// Progress the session opens with.
    pub initial_progress: f32,
    /// Backward displacement applied to the agent when the target escapes.
    pub knockback_distance: f32,
}

impl Default for QteConfig {
    fn default() -> Self {
        Self {
            time_limit: 5.0,
            decay_per_second: 0.2,
            pulse_increment: 0.1,
            initial_progress: 0.5,
            knockback_distance: 7.0,
        }
    }
}

/// Per-tick resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QteOutcome {
    Running,
    Won,
    Lost,
}

/// One timed skill-check session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QteSession {
    config: QteConfig,
    progress: f32,
    time_remaining: f32,
    active: bool,
    pending_pulses: u32,
}

impl QteSession {
    pub fn new(config: QteConfig) -> Self {
        let time_remaining = config.time_limit;
        Self {
            config,
            progress: 0.0,
            time_remaining,
            active: false,
            pending_pulses: 0,
        }
    }

    /// Open the session. Restarting an active session is ignored.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.progress = self.config.initial_progress.clamp(0.0, 1.0);
        self.time_remaining = self.config.time_limit;
        self.pending_pulses = 0;
        self.active = true;
        debug!(progress = self.progress, limit = self.config.time_limit, "qte session started");
    }

    /// Buffer one input pulse; applied at the start of the next tick.
    /// Pulses arriving while idle are dropped.
    pub fn on_input_pulse(&mut self) {
        if self.active {
            self.pending_pulses += 1;
        }
    }

    /// Advance the session. Pulses first, then decay, then resolution.
    /// Ticking an idle session reports `Running` and does nothing.
    pub fn tick(&mut self, dt: f32) -> QteOutcome {
        if !self.active {
            return QteOutcome::Running;
        }

        let pulses = std::mem::take(&mut self.pending_pulses);
        self.progress =
            (self.progress + pulses as f32 * self.config.pulse_increment).clamp(0.0, 1.0);
        if self.progress >= 1.0 {
            self.resolve("won");
            return QteOutcome::Won;
        }

        self.progress = (self.progress - self.config.decay_per_second * dt).clamp(0.0, 1.0);
        self.time_remaining -= dt;

        if self.progress <= 0.0 || self.time_remaining <= 0.0 {
            self.resolve("lost");
            return QteOutcome::Lost;
        }
        QteOutcome::Running
    }

    /// Tear the session down without a verdict, e.g. when the engaged
    /// target was destroyed externally mid-session.
    pub fn abort(&mut self) {
        if self.active {
            debug!("qte session aborted");
        }
        self.active = false;
        self.pending_pulses = 0;
        self.time_remaining = self.config.time_limit;
    }

    fn resolve(&mut self, verdict: &str) {
        debug!(verdict, progress = self.progress, "qte session resolved");
        self.active = false;
        self.pending_pulses = 0;
        self.time_remaining = self.config.time_limit;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current progress, always within [0, 1].
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    pub fn config(&self) -> &QteConfig {
        &self.config
    }
}
