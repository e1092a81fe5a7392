//! Capabilities the enemy simulation borrows from its host.
//!
//! The simulation never talks to the physics engine or the ECS directly.
//! Everything it needs from the outside world goes through these traits, which
//! the Rapier adapter implements in-game and the fake world implements in tests.

use bevy::prelude::*;
use serde::Deserialize;

use super::pool::AgentId;

/// Collision layer bitmask used to filter ray and overlap queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Static level geometry (ground, walls, crates).
    pub const WORLD: LayerMask = LayerMask(1 << 0);
    /// Enemy bodies.
    pub const ENEMY: LayerMask = LayerMask(1 << 1);
    /// The player body.
    pub const PLAYER: LayerMask = LayerMask(1 << 2);
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::WORLD
    }
}

/// Opaque identity of a collider reported by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(pub u64);

/// Opaque handle to something enemies chase and hurt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetRef(pub u64);

/// Nearest hit reported by a ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub collider: ColliderId,
}

/// Ray and overlap queries against world geometry.
///
/// A miss is a definite negative, never an error.
pub trait SpatialQuery {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RayHit>;

    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<ColliderId>;
}

/// Outcome of a movement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    /// Where the agent is as far as the motor knows right now.
    pub position: Vec3,
    pub grounded: bool,
}

/// Collision-resolved movement for full-detail agents.
pub trait AgentMotor {
    fn move_agent(&mut self, agent: AgentId, from: Vec3, delta: Vec3) -> MoveResult;
}

/// The chased target: lookup, position, and damage intake.
pub trait TargetLink {
    /// Recover a target when none is assigned (e.g. the player was respawned).
    fn find_target(&self) -> Option<TargetRef>;

    /// Current world position, or `None` if the target no longer exists.
    fn position(&self, target: TargetRef) -> Option<Vec3>;

    fn deal_damage(&mut self, target: TargetRef, amount: f32);

    /// Map a collider hit by a weapon ray back to a damageable target.
    fn target_of(&self, collider: ColliderId) -> Option<TargetRef>;
}
