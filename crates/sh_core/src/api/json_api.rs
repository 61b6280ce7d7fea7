//! JSON construction and status reporting for engine hosts.
//!
//! Hosts that cannot share Rust types (engine scripting layers, tools)
//! describe the NPC population as a JSON document and poll world state
//! back as JSON. The per-tick path stays typed; only setup and
//! inspection go through strings.

use serde::{Deserialize, Serialize};

use crate::engine::checkpoint::CheckpointConfig;
use crate::engine::math::Vec3;
use crate::engine::pursuer::PursuerConfig;
use crate::engine::simulation::{AgentStateTag, Simulation, SimulationConfig};
use crate::engine::tension::TensionConfig;
use crate::error::{CoreError, Result};
use crate::models::{AgentId, Archetype, NpcHandle, TargetId};

pub const SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Deserialize)]
pub struct WorldRequest {
    pub schema_version: u8,
    pub seed: u64,
    /// Target id whose proximity drives tension.
    pub player: u32,
    #[serde(default)]
    pub tension: Option<TensionConfig>,
    #[serde(default)]
    pub pursuers: Vec<PursuerSpawn>,
    #[serde(default)]
    pub checkpoints: Vec<CheckpointSpawn>,
}

#[derive(Debug, Deserialize)]
pub struct PursuerSpawn {
    pub id: u32,
    pub home: Vec3,
    /// Omitted fields fall back to the default tuning.
    #[serde(default)]
    pub config: Option<PursuerConfig>,
}

#[derive(Debug, Deserialize)]
pub struct CheckpointSpawn {
    pub id: u32,
    pub line_start: Vec3,
    pub line_back: Vec3,
    #[serde(default)]
    pub queue: Vec<u32>,
    #[serde(default)]
    pub config: Option<CheckpointConfig>,
}

/// Build a simulation with its initial population from a JSON request.
/// The spawns are queued and become live on the first tick.
pub fn build_simulation_json(request_json: &str) -> Result<Simulation> {
    let request: WorldRequest = serde_json::from_str(request_json)?;
    if request.schema_version != SCHEMA_VERSION {
        return Err(CoreError::InvalidParameter(format!(
            "unsupported schema_version {}, expected {}",
            request.schema_version, SCHEMA_VERSION
        )));
    }

    let mut sim = Simulation::new(SimulationConfig {
        seed: request.seed,
        player: TargetId(request.player),
        tension: request.tension.unwrap_or_default(),
    });
    for spawn in request.pursuers {
        sim.spawn_pursuer(
            AgentId(spawn.id),
            spawn.home,
            spawn.config.unwrap_or_default(),
        )?;
    }
    for spawn in request.checkpoints {
        sim.spawn_checkpoint(
            AgentId(spawn.id),
            spawn.line_start,
            spawn.line_back,
            spawn.queue.into_iter().map(NpcHandle).collect(),
            spawn.config.unwrap_or_default(),
        )?;
    }
    Ok(sim)
}

#[derive(Debug, Serialize)]
pub struct WorldStatus {
    pub tick: u64,
    pub tension: f32,
    pub threatened: bool,
    pub agents: Vec<AgentStatus>,
}

#[derive(Debug, Serialize)]
pub struct AgentStatus {
    pub id: u32,
    pub archetype: Archetype,
    pub state: AgentStateTag,
    /// Whether the last tick's perception passed every visibility gate.
    pub target_visible: bool,
}

/// Snapshot of the whole world as a JSON string, agents in id order.
pub fn world_status_json(sim: &Simulation) -> Result<String> {
    let agents = sim
        .agent_ids()
        .into_iter()
        .filter_map(|id| {
            let state = sim.agent_state(id)?;
            let perception = sim.agent_perception(id)?;
            Some(AgentStatus {
                id: id.0,
                archetype: sim.agent_archetype(id)?,
                state,
                target_visible: perception.visible_target().is_some(),
            })
        })
        .collect();
    let status = WorldStatus {
        tick: sim.tick_count(),
        tension: sim.tension_level(),
        threatened: sim.is_threatened(),
        agents,
    };
    Ok(serde_json::to_string(&status)?)
}
