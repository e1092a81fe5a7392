//! In-memory stand-ins for physics and the player, used by unit tests.

use bevy::prelude::*;

use super::pool::AgentId;
use super::query::{
    AgentMotor, ColliderId, LayerMask, MoveResult, RayHit, SpatialQuery, TargetLink, TargetRef,
};

pub const GROUND: ColliderId = ColliderId(1);

struct Block {
    min: Vec3,
    max: Vec3,
    layer: LayerMask,
    collider: ColliderId,
}

/// Horizontal ground plane plus axis-aligned boxes.
pub struct FlatWorld {
    ground: Option<f32>,
    blocks: Vec<Block>,
}

impl FlatWorld {
    /// Ground at y = 0.
    pub fn new() -> Self {
        Self {
            ground: Some(0.0),
            blocks: Vec::new(),
        }
    }

    /// Nothing to stand on.
    pub fn empty() -> Self {
        Self {
            ground: None,
            blocks: Vec::new(),
        }
    }

    pub fn ground(&self) -> Option<f32> {
        self.ground
    }

    pub fn with_box(mut self, min: Vec3, max: Vec3) -> Self {
        let collider = ColliderId(100 + self.blocks.len() as u64);
        self.blocks.push(Block {
            min,
            max,
            layer: LayerMask::WORLD,
            collider,
        });
        self
    }

    /// Player-sized body standing at `feet`, reported as [`RecordingTarget::COLLIDER`].
    pub fn with_player(mut self, feet: Vec3) -> Self {
        self.blocks.push(Block {
            min: feet - Vec3::new(0.4, 0.0, 0.4),
            max: feet + Vec3::new(0.4, 2.0, 0.4),
            layer: LayerMask::PLAYER,
            collider: RecordingTarget::COLLIDER,
        });
        self
    }
}

/// Slab test. Returns entry distance and the face normal.
fn ray_box(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_enter = 0.0f32;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let mut t0 = (min[axis] - o) / d;
        let mut t1 = (max[axis] - o) / d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            normal = Vec3::ZERO;
            normal[axis] = -d.signum();
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }
    Some((t_enter, normal))
}

impl SpatialQuery for FlatWorld {
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

        let mut best: Option<RayHit> = None;
        let mut consider = |distance: f32, normal: Vec3, collider: ColliderId| {
            if distance > max_distance || best.is_some_and(|hit| hit.distance <= distance) {
                return;
            }
            best = Some(RayHit {
                point: origin + dir * distance,
                normal,
                distance,
                collider,
            });
        };

        if let Some(height) = self.ground {
            if layers.contains(LayerMask::WORLD) && dir.y < 0.0 && origin.y >= height {
                consider((height - origin.y) / dir.y, Vec3::Y, GROUND);
            }
        }
        for block in self.blocks.iter().filter(|b| layers.contains(b.layer)) {
            if let Some((distance, normal)) = ray_box(origin, dir, block.min, block.max) {
                consider(distance, normal, block.collider);
            }
        }
        best
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<ColliderId> {
        let mut hits = Vec::new();
        if let Some(height) = self.ground {
            if layers.contains(LayerMask::WORLD) && center.y - radius <= height {
                hits.push(GROUND);
            }
        }
        for block in self.blocks.iter().filter(|b| layers.contains(b.layer)) {
            let closest = center.clamp(block.min, block.max);
            if closest.distance_squared(center) <= radius * radius {
                hits.push(block.collider);
            }
        }
        hits
    }
}

/// Moves agents freely, stopping only at the ground plane.
#[derive(Debug, Default)]
pub struct KinematicMotor {
    pub floor: Option<f32>,
    /// Ignore every request, like an agent wedged against something.
    pub frozen: bool,
    /// Only apply vertical movement.
    pub lock_horizontal: bool,
    pub moves: Vec<AgentId>,
}

impl KinematicMotor {
    pub fn over(world: &FlatWorld) -> Self {
        Self {
            floor: world.ground(),
            ..default()
        }
    }
}

impl AgentMotor for KinematicMotor {
    fn move_agent(&mut self, agent: AgentId, from: Vec3, delta: Vec3) -> MoveResult {
        self.moves.push(agent);
        let mut delta = if self.frozen { Vec3::ZERO } else { delta };
        if self.lock_horizontal {
            delta.x = 0.0;
            delta.z = 0.0;
        }

        let mut position = from + delta;
        let mut grounded = false;
        if let Some(floor) = self.floor {
            if position.y <= floor {
                position.y = floor;
                grounded = true;
            }
        }
        MoveResult { position, grounded }
    }
}

/// Single target that records every hit it takes.
#[derive(Debug)]
pub struct RecordingTarget {
    pub position: Vec3,
    pub present: bool,
    pub hits: Vec<f32>,
}

impl RecordingTarget {
    pub const PLAYER: TargetRef = TargetRef(1);
    pub const COLLIDER: ColliderId = ColliderId(7);

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            present: true,
            hits: Vec::new(),
        }
    }

    pub fn damage_taken(&self) -> f32 {
        self.hits.iter().sum()
    }
}

impl TargetLink for RecordingTarget {
    fn find_target(&self) -> Option<TargetRef> {
        self.present.then_some(Self::PLAYER)
    }

    fn position(&self, target: TargetRef) -> Option<Vec3> {
        (self.present && target == Self::PLAYER).then_some(self.position)
    }

    fn deal_damage(&mut self, target: TargetRef, amount: f32) {
        if target == Self::PLAYER {
            self.hits.push(amount);
        }
    }

    fn target_of(&self, collider: ColliderId) -> Option<TargetRef> {
        (collider == Self::COLLIDER).then_some(Self::PLAYER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_nearest_face() {
        let world =
            FlatWorld::new().with_box(Vec3::new(-1.0, 0.0, -3.0), Vec3::new(1.0, 2.0, -2.0));
        let hit = world
            .cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 10.0, LayerMask::WORLD)
            .unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Z);
        assert_eq!(hit.collider, ColliderId(100));

        let down = world
            .cast_ray(Vec3::new(5.0, 3.0, 0.0), Vec3::NEG_Y, 10.0, LayerMask::WORLD)
            .unwrap();
        assert_eq!(down.collider, GROUND);
        assert!((down.point.y).abs() < 1e-5);
    }

    #[test]
    fn layers_and_range_filter_hits() {
        let world = FlatWorld::new().with_player(Vec3::new(0.0, 0.0, -5.0));
        let origin = Vec3::new(0.0, 1.0, 0.0);
        assert!(world.cast_ray(origin, Vec3::NEG_Z, 10.0, LayerMask::WORLD).is_none());
        assert!(world.cast_ray(origin, Vec3::NEG_Z, 3.0, LayerMask::PLAYER).is_none());
        assert!(world.cast_ray(origin, Vec3::NEG_Z, 10.0, LayerMask::PLAYER).is_some());
    }

    #[test]
    fn overlap_finds_nearby_boxes() {
        let world =
            FlatWorld::new().with_box(Vec3::new(1.0, 0.0, -1.0), Vec3::new(2.0, 2.0, 1.0));
        let hits = world.overlap_sphere(Vec3::new(0.0, 2.0, 0.0), 1.2, LayerMask::WORLD);
        assert_eq!(hits, vec![ColliderId(100)]);
        let hits = world.overlap_sphere(Vec3::new(0.0, 0.5, 0.0), 1.2, LayerMask::WORLD);
        assert_eq!(hits, vec![GROUND, ColliderId(100)]);
    }
}
