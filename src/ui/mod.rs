//! UI module - HUD and overlays.

mod hud;
mod plugin;

pub use plugin::UiPlugin;
