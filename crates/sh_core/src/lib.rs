//! # sh_core - Deterministic Stealth NPC Behavior Core
//!
//! Fixed-timestep behavior simulation for the NPC population of a
//! stealth game: perception sensing, pursuer and checkpoint state
//! machines, a timed struggle minigame, and a global tension scalar.
//!
//! The core is headless. Navigation, animation, audio, and the target
//! world stay on the host side and are reached through the trait
//! contracts in [`engine::services`]; the host feeds pose and target
//! snapshots into [`engine::Simulation::tick`] once per fixed tick and
//! receives every effect back through those traits.
//!
//! ## Determinism
//! Same seed, same inputs, same tick count: identical behavior. All
//! randomness flows from per-agent rng streams derived in
//! [`engine::deterministic`].

// Allow unused code for features under development
#![allow(dead_code)]

pub mod api;
pub mod engine;
pub mod error;
pub mod models;

pub use api::{build_simulation_json, world_status_json};
pub use engine::{AgentStateTag, Simulation, SimulationConfig, TickInput};
pub use error::{CoreError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
