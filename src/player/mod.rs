//! Player module - player entity, swarm-aware movement, and camera control.

mod camera;
mod components;
mod movement;
mod plugin;

pub use components::*;
pub use camera::PlayerCamera;
pub use movement::spawn_player;
pub use plugin::PlayerPlugin;
