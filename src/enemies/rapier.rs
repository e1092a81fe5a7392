//! Rapier-backed implementations of the simulation's capability traits.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::collections::HashMap;

use super::pool::AgentId;
use super::query::{AgentMotor, ColliderId, LayerMask, MoveResult, RayHit, SpatialQuery};

impl From<LayerMask> for Group {
    fn from(mask: LayerMask) -> Self {
        Group::from_bits_truncate(mask.0)
    }
}

/// Collision groups for a body living on `layer`.
pub fn collision_groups(layer: LayerMask) -> CollisionGroups {
    CollisionGroups::new(layer.into(), Group::ALL)
}

fn layer_filter(layers: LayerMask) -> QueryFilter<'static> {
    QueryFilter::default()
        .exclude_sensors()
        .groups(CollisionGroups::new(Group::ALL, layers.into()))
}

/// Ray and overlap queries against the live Rapier world.
pub struct RapierSpatialQuery<'a> {
    context: &'a RapierContext,
}

impl<'a> RapierSpatialQuery<'a> {
    pub fn new(context: &'a RapierContext) -> Self {
        Self { context }
    }
}

impl SpatialQuery for RapierSpatialQuery<'_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let (entity, hit) = self.context.cast_ray_and_get_normal(
            origin,
            dir,
            max_distance,
            true,
            layer_filter(layers),
        )?;
        Some(RayHit {
            point: hit.point,
            normal: hit.normal,
            distance: hit.point.distance(origin),
            collider: ColliderId(entity.to_bits()),
        })
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<ColliderId> {
        let mut hits = Vec::new();
        let shape = Collider::ball(radius);
        self.context.intersections_with_shape(
            center,
            Quat::IDENTITY,
            &shape,
            layer_filter(layers),
            |entity| {
                hits.push(ColliderId(entity.to_bits()));
                true
            },
        );
        hits
    }
}

/// Movement requests for full-detail agents, resolved by each body's
/// `KinematicCharacterController` during the physics step.
///
/// The reported position is where the agent asked to go. The corrected
/// position is read back from the body at the start of the next frame.
#[derive(Debug, Default)]
pub struct RapierMotor {
    grounded: HashMap<AgentId, bool>,
    moves: Vec<(AgentId, Vec3)>,
}

impl RapierMotor {
    /// Ground contact reported by the controllers after the last physics step.
    pub fn new(grounded: HashMap<AgentId, bool>) -> Self {
        Self {
            grounded,
            moves: Vec::new(),
        }
    }

    /// Translations requested this frame, in request order.
    pub fn into_moves(self) -> Vec<(AgentId, Vec3)> {
        self.moves
    }
}

impl AgentMotor for RapierMotor {
    fn move_agent(&mut self, agent: AgentId, from: Vec3, delta: Vec3) -> MoveResult {
        self.moves.push((agent, delta));
        MoveResult {
            position: from + delta,
            grounded: self.grounded.get(&agent).copied().unwrap_or(false),
        }
    }
}
