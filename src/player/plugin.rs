//! Player plugin - movement, camera, and run resets.

use bevy::prelude::*;

use super::components::*;
use super::{camera, movement};
use crate::combat::Health;
use crate::core::GameState;

/// Player plugin - handles player movement, camera, and respawning.
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        camera::setup_camera_systems(app);
        movement::setup_movement_systems(app);

        app.add_systems(OnExit(GameState::GameOver), reset_player);
    }
}

/// Put the player back at the spawn point with full health.
fn reset_player(
    mut player_query: Query<
        (&mut Transform, &mut Health, &mut PlayerMotion, &SpawnPoint),
        With<Player>,
    >,
) {
    let Ok((mut transform, mut health, mut motion, spawn)) = player_query.get_single_mut() else {
        return;
    };
    transform.translation = spawn.0;
    health.reset();
    *motion = PlayerMotion::default();
}
