//! Version-stable sub-seed derivation.
//!
//! Every agent draws its random decisions from its own stream so that
//! spawning or despawning one agent never shifts another's behavior.
//! Streams are keyed by `(world_seed, agent_id, subcase)` and hashed with
//! `FxHasher`; the std `DefaultHasher` is not stable across Rust versions
//! and would desync replays of the same seed.

use std::hash::{Hash, Hasher};

use fxhash::FxHasher;

/// Subcase constants separating decision streams per agent.
pub mod subcase {
    /// Patrol destination sampling.
    pub const PATROL: u32 = 0x0100;
    /// Idle growl interval scheduling.
    pub const GROWL: u32 = 0x0200;
}

/// Derive the rng seed for one agent's decision stream.
pub fn derive_seed(world_seed: u64, agent_id: u32, subcase: u32) -> u64 {
    let mut hasher = FxHasher::default();
    world_seed.hash(&mut hasher);
    agent_id.hash(&mut hasher);
    subcase.hash(&mut hasher);
    hasher.finish()
}
