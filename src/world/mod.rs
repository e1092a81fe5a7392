//! World module - the arena the swarm fights in.

mod data;
mod geometry;
mod plugin;

pub use data::{ArenaDefinition, BlockDef};
pub use geometry::ArenaGeometry;
pub use plugin::{setup_arena, WorldPlugin};
