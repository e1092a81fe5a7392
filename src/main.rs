//! Swarm Rush - Entry Point
//!
//! Controls:
//! - WASD: Move
//! - Mouse: Look around
//! - Left click: Shoot
//! - Shift: Sprint
//! - Space: Jump
//! - Escape: Pause/Unpause
//! - R: Restart after dying

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

fn main() {
    App::new()
        // Bevy default plugins
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Swarm Rush".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))

        // Physics
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())

        // Our game plugin
        .add_plugins(swarm_rush::SwarmRushPlugin)

        .run();
}
