//! Geometric perception: nearest-candidate selection, front-hemisphere and
//! field-of-view gating, and ray-cast line of sight.
//!
//! The result is recomputed from scratch every tick; there is no smoothing
//! or hysteresis. A `target` of `None` means nothing was within detection
//! range and callers must treat the agent as idle.

use serde::{Deserialize, Serialize};

use crate::engine::math::{self, Vec3};
use crate::models::{AgentPose, TargetId};

/// Front-hemisphere gate: dot(forward, to_target) must exceed cos 60°.
/// Coarse "roughly ahead" check, independent of the configurable FOV cone.
pub const FRONT_HEMISPHERE_COS: f32 = 0.5;

/// Per-agent sensing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Half-angle of the vision cone, degrees.
    pub fov_half_angle_deg: f32,
    /// Maximum perception distance.
    pub detection_range: f32,
    /// Sensor origin offset along the agent's forward axis.
    pub forward_offset: f32,
    /// Sensor origin offset straight up (eye height).
    pub height_offset: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            fov_half_angle_deg: 45.0,
            detection_range: 5.0,
            forward_offset: 0.0,
            height_offset: 0.0,
        }
    }
}

impl SensorConfig {
    /// World-space sensor origin for a given pose.
    pub fn origin(&self, pose: &AgentPose) -> Vec3 {
        let mut origin = math::add(pose.position, math::scale(pose.forward, self.forward_offset));
        origin.1 += self.height_offset;
        origin
    }
}

/// Position snapshot of one candidate target, supplied by the host per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: TargetId,
    pub position: Vec3,
}

/// What a line-of-sight ray hit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayHit {
    /// The ray reached a tracked target.
    Target(TargetId),
    /// The ray was blocked by scenery.
    Scenery,
}

/// Ray-cast collaborator owned by the host physics/scene system.
pub trait RayCaster {
    /// First hit along `direction` from `origin`, within `max_distance`.
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit>;
}

/// Ephemeral perception output, recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerceptionResult {
    pub target: Option<TargetId>,
    pub in_front_hemisphere: bool,
    pub in_field_of_view: bool,
    pub in_range: bool,
    pub has_line_of_sight: bool,
}

impl PerceptionResult {
    /// No candidate within range: idle, no reaction.
    pub fn none() -> Self {
        Self {
            target: None,
            in_front_hemisphere: false,
            in_field_of_view: false,
            in_range: false,
            has_line_of_sight: false,
        }
    }

    /// The selected target, but only when it passed every visibility
    /// gate: roughly ahead, inside the vision cone (range included), and
    /// unobstructed. This is what the behavior machines react to; a
    /// merely-nearby candidate is not a sighting.
    pub fn visible_target(&self) -> Option<TargetId> {
        if self.in_front_hemisphere && self.in_field_of_view && self.has_line_of_sight {
            self.target
        } else {
            None
        }
    }
}

impl Default for PerceptionResult {
    fn default() -> Self {
        Self::none()
    }
}

/// Compute perception for one agent against all candidate targets.
///
/// Candidate selection: minimum Euclidean distance to the agent position
/// among candidates within `detection_range`; ties break toward the lowest
/// target id so the result is stable across platforms.
pub fn sense(
    pose: &AgentPose,
    config: &SensorConfig,
    candidates: &[TargetSnapshot],
    ray: &dyn RayCaster,
) -> PerceptionResult {
    let mut nearest: Option<(TargetSnapshot, f32)> = None;
    for candidate in candidates {
        let dist = math::distance(candidate.position, pose.position);
        if dist > config.detection_range {
            continue;
        }
        let closer = match &nearest {
            None => true,
            Some((best, best_dist)) => {
                dist < *best_dist || (dist == *best_dist && candidate.id < best.id)
            }
        };
        if closer {
            nearest = Some((*candidate, dist));
        }
    }

    let (target, _) = match nearest {
        Some(found) => found,
        None => return PerceptionResult::none(),
    };

    let to_target = math::normalize(math::sub(target.position, pose.position));
    let forward_dot = math::dot(pose.forward, to_target);
    let in_front_hemisphere = forward_dot > FRONT_HEMISPHERE_COS;

    // FOV and range are re-checked against the sensor origin, which may be
    // offset from the position the broad-phase filtered on.
    let origin = config.origin(pose);
    let origin_dist = math::distance(target.position, origin);
    let in_range = origin_dist <= config.detection_range;
    let fov_cos = config.fov_half_angle_deg.to_radians().cos();
    let in_field_of_view = forward_dot >= fov_cos && in_range;

    let ray_dir = math::normalize(math::sub(target.position, origin));
    let has_line_of_sight = matches!(
        ray.cast(origin, ray_dir, config.detection_range),
        Some(RayHit::Target(hit)) if hit == target.id
    );

    PerceptionResult {
        target: Some(target.id),
        in_front_hemisphere,
        in_field_of_view,
        in_range,
        has_line_of_sight,
    }
}
