//! World plugin - arena construction.

use bevy::prelude::*;

use crate::core::GameState;
use crate::player::spawn_player;

use super::data::ArenaDefinition;
use super::geometry::{spawn_block, spawn_boundary, spawn_floor, spawn_light};

/// World plugin - builds the arena once, when loading finishes.
pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnExit(GameState::Loading), setup_arena);
    }
}

/// Build the arena and spawn the player in it.
pub fn setup_arena(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let arena = ArenaDefinition::load();
    info!("Building arena: {} blocks", arena.blocks.len());

    let floor = materials.add(StandardMaterial {
        base_color: Color::srgb(0.28, 0.27, 0.26),
        perceptual_roughness: 0.9,
        ..default()
    });
    let stone = materials.add(StandardMaterial {
        base_color: Color::srgb(0.35, 0.30, 0.25),
        perceptual_roughness: 0.7,
        ..default()
    });

    spawn_floor(&mut commands, &mut meshes, floor, arena.size);
    spawn_boundary(&mut commands, &mut meshes, stone.clone(), arena.size, arena.wall_height);
    for block in &arena.blocks {
        spawn_block(
            &mut commands,
            &mut meshes,
            stone.clone(),
            Vec2::new(block.position.0, block.position.1),
            Vec3::new(block.size.0, block.size.1, block.size.2),
        );
    }

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: arena.ambient_brightness,
    });
    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            ..default()
        },
        Transform::from_xyz(20.0, 40.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    spawn_light(&mut commands, Vec3::new(0.0, 8.0, 0.0), 400_000.0, 40.0);

    spawn_player(&mut commands, arena.player_spawn());
    commands.insert_resource(arena);
}
