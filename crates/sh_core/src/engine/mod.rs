pub mod checkpoint;
pub mod deterministic;
pub mod math;
pub mod patrol;
pub mod perception;
pub mod pursuer;
pub mod qte;
pub mod registry;
pub mod services;
pub mod simulation;
pub mod tension;
pub mod test_fixtures;
pub mod timestep;


pub use perception::{PerceptionResult, RayCaster, RayHit, SensorConfig, TargetSnapshot};
pub use simulation::{AgentStateTag, Simulation, SimulationConfig, TickInput};
