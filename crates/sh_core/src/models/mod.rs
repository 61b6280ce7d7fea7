pub mod agent;
pub mod item;

pub use agent::{AgentId, AgentPose, Archetype, NpcHandle, SpeedProfile, TargetId};
pub use item::{ItemCategory, ItemDescriptor, MaskKind};
