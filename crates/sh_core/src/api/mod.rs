pub mod json_api;

pub use json_api::{
    build_simulation_json, world_status_json, AgentStatus, CheckpointSpawn, PursuerSpawn,
    WorldRequest, WorldStatus, SCHEMA_VERSION,
};
