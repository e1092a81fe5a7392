//! Combat module - the player's weapon and damage bookkeeping.

mod components;
mod plugin;
mod systems;

pub use components::*;
pub use plugin::CombatPlugin;
