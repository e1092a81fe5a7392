//! Arena layout loaded from RON.

use serde::Deserialize;
use std::fs;

use bevy::prelude::*;

const ARENA_PATH: &str = "assets/data/arena.ron";

/// A solid box the swarm has to walk around or climb over.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDef {
    /// Center of the box's footprint, on the ground.
    pub position: (f32, f32),
    pub size: (f32, f32, f32),
}

/// The playable area: a square floor, boundary walls, and scattered crates.
#[derive(Debug, Clone, Deserialize, Resource)]
#[serde(default)]
pub struct ArenaDefinition {
    /// Floor edge length.
    pub size: f32,
    pub wall_height: f32,
    pub player_spawn: (f32, f32, f32),
    pub ambient_brightness: f32,
    pub blocks: Vec<BlockDef>,
}

impl Default for ArenaDefinition {
    fn default() -> Self {
        Self {
            size: 120.0,
            wall_height: 4.0,
            player_spawn: (0.0, 1.0, 0.0),
            ambient_brightness: 300.0,
            blocks: vec![
                BlockDef {
                    position: (8.0, -6.0),
                    size: (3.0, 1.5, 3.0),
                },
                BlockDef {
                    position: (-10.0, 4.0),
                    size: (4.0, 2.5, 2.0),
                },
            ],
        }
    }
}

impl ArenaDefinition {
    /// Load the arena from RON, falling back to the built-in layout.
    pub fn load() -> Self {
        match fs::read_to_string(ARENA_PATH) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(arena) => {
                    info!("Loaded arena from {}", ARENA_PATH);
                    arena
                }
                Err(e) => {
                    error!("Failed to parse {}: {}. Using defaults.", ARENA_PATH, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read {}: {}. Using defaults.", ARENA_PATH, e);
                Self::default()
            }
        }
    }

    pub fn player_spawn(&self) -> Vec3 {
        Vec3::new(self.player_spawn.0, self.player_spawn.1, self.player_spawn.2)
    }
}
