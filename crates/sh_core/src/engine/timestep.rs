/// timestep.rs
/// Canonical simulation tick constants.
///
/// The core is driven by the host at a fixed rate; every timer in the
/// behavior machines advances by the `dt` the host passes in, so these
/// constants are the reference rate rather than a hard requirement.

/// Canonical simulation timestep (50ms) - behavior update rate
pub const TICK_DT: f32 = 0.05;

/// Ticks per simulated second at the canonical rate
pub const TICKS_PER_SECOND: u32 = 20;

// Compile-time validation
const _: () = assert!(TICK_DT * TICKS_PER_SECOND as f32 == 1.0);
