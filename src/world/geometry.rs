//! Geometry spawning functions for the arena.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::enemies::{collision_groups, LayerMask};

/// Marker for all arena geometry.
#[derive(Component)]
pub struct ArenaGeometry;

/// Floor as a slab whose top surface is at y = 0.
pub fn spawn_floor(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    size: f32,
) {
    let depth = 1.0;
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(size, depth, size))),
        MeshMaterial3d(material),
        Transform::from_xyz(0.0, -depth / 2.0, 0.0),
        Collider::cuboid(size / 2.0, depth / 2.0, size / 2.0),
        collision_groups(LayerMask::WORLD),
        ArenaGeometry,
    ));
}

/// Spawn a solid box standing on the floor.
pub fn spawn_block(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    footprint: Vec2,
    size: Vec3,
) {
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
        MeshMaterial3d(material),
        Transform::from_xyz(footprint.x, size.y / 2.0, footprint.y),
        Collider::cuboid(size.x / 2.0, size.y / 2.0, size.z / 2.0),
        collision_groups(LayerMask::WORLD),
        ArenaGeometry,
    ));
}

/// Four walls enclosing the floor.
pub fn spawn_boundary(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    size: f32,
    height: f32,
) {
    let half = size / 2.0;
    let thickness = 1.0;
    let walls = [
        (Vec2::new(0.0, -half), Vec3::new(size, height, thickness)),
        (Vec2::new(0.0, half), Vec3::new(size, height, thickness)),
        (Vec2::new(-half, 0.0), Vec3::new(thickness, height, size)),
        (Vec2::new(half, 0.0), Vec3::new(thickness, height, size)),
    ];
    for (footprint, dimensions) in walls {
        spawn_block(commands, meshes, material.clone(), footprint, dimensions);
    }
}

/// Spawn a point light.
pub fn spawn_light(commands: &mut Commands, position: Vec3, intensity: f32, range: f32) {
    commands.spawn((
        PointLight {
            color: Color::srgb(1.0, 0.92, 0.8),
            intensity,
            range,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(position),
        ArenaGeometry,
    ));
}
