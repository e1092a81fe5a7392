//! Swarm Rush - a first-person survival arena against hundreds of enemies.
//!
//! # Architecture
//!
//! The game is organized into plugins, each handling a specific aspect:
//!
//! - **Core**: Game states, global events, pause and restart
//! - **Player**: First-person movement, camera, spawn point
//! - **Combat**: The player's weapon, damage, deaths, run stats
//! - **Enemies**: Pooled swarm simulation with LOD scheduling and waves
//! - **World**: The arena
//! - **UI**: HUD and overlays

pub mod combat;
pub mod core;
pub mod enemies;
pub mod player;
pub mod ui;
pub mod world;

use bevy::prelude::*;

/// Main game plugin that adds all sub-plugins.
pub struct SwarmRushPlugin;

impl Plugin for SwarmRushPlugin {
    fn build(&self, app: &mut App) {
        app
            // Core systems (must be first)
            .add_plugins(core::CorePlugin)
            .add_plugins(player::PlayerPlugin)
            .add_plugins(combat::CombatPlugin)
            .add_plugins(enemies::EnemyPlugin)
            .add_plugins(world::WorldPlugin)
            .add_plugins(ui::UiPlugin);
    }
}
