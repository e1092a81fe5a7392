//! Simulation tuning loaded from external RON file.
//!
//! Allows tweaking LOD budgets and wave pacing without recompilation.

use bevy::prelude::*;
use serde::Deserialize;
use std::fs;

use super::data::EnemyRegistry;
use super::error::ConfigError;
use super::query::LayerMask;

const CONFIG_PATH: &str = "assets/data/enemies/enemy_config.ron";

/// How the scan start moves between frames when more agents are near than
/// the full-detail budget allows.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LodRotation {
    /// Shift the start by one agent per frame.
    Step,
    /// Resume right after the last agent that got full detail.
    #[default]
    Budget,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LodConfig {
    pub full_logic_radius: f32,
    /// Hard cap on full-detail ticks per frame.
    pub max_full_logic: usize,
    /// Far agents only move on one frame out of this many.
    pub far_skip_interval: u32,
    pub far_speed_fraction: f32,
    pub rotation: LodRotation,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            full_logic_radius: 15.0,
            max_full_logic: 300,
            far_skip_interval: 8,
            far_speed_fraction: 0.4,
            rotation: LodRotation::Budget,
        }
    }
}

/// Scripted settings for one wave number. Only used when random waves are off.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct WaveOverride {
    /// 1-based wave number.
    pub wave: u32,
    /// Archetype to spawn. Unpooled archetypes are instantiated directly.
    pub archetype: Option<String>,
    pub count: Option<u32>,
    /// Seconds until this wave starts.
    pub interval: Option<f32>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct WaveConfig {
    // size = initial_size + (wave - 1) * size_increment, capped at max_wave_size
    pub initial_size: u32,
    pub size_increment: u32,
    pub max_wave_size: u32,

    // interval = initial_interval * interval_multiplier^(wave - 1), floored at min_interval
    pub initial_interval: f32,
    pub interval_multiplier: f32,
    pub min_interval: f32,

    // alive cap = base_cap + (wave - 1) * cap_increment, capped at hard_cap
    pub base_cap: u32,
    pub cap_increment: u32,
    pub hard_cap: u32,

    /// Spawns allowed per frame.
    pub spawn_batch_size: u32,
    pub elite_chance: f32,

    pub ring_min_radius: f32,
    pub ring_max_radius: f32,
    /// Height above the ring point the ground probe starts from.
    pub ring_probe_height: f32,
    pub ground_mask: LayerMask,

    /// When true every wave picks a random pooled archetype and overrides are ignored.
    pub random_waves: bool,
    pub overrides: Vec<WaveOverride>,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            initial_size: 10,
            size_increment: 3,
            max_wave_size: 500,
            initial_interval: 4.0,
            interval_multiplier: 0.95,
            min_interval: 0.75,
            base_cap: 200,
            cap_increment: 40,
            hard_cap: 800,
            spawn_batch_size: 10,
            elite_chance: 0.1,
            ring_min_radius: 20.0,
            ring_max_radius: 25.0,
            ring_probe_height: 20.0,
            ground_mask: LayerMask::WORLD,
            random_waves: true,
            overrides: Vec::new(),
        }
    }
}

impl WaveConfig {
    /// Scripted override for a wave, if scripted mode is on.
    pub fn override_for(&self, wave: u32) -> Option<&WaveOverride> {
        if self.random_waves {
            return None;
        }
        self.overrides.iter().find(|o| o.wave == wave)
    }

    /// Formula wave size, ignoring overrides.
    pub fn formula_size(&self, wave: u32) -> u32 {
        let scaled = self
            .initial_size
            .saturating_add(wave.saturating_sub(1).saturating_mul(self.size_increment));
        scaled.min(self.max_wave_size)
    }

    pub fn target_size(&self, wave: u32) -> u32 {
        self.override_for(wave)
            .and_then(|o| o.count)
            .filter(|&count| count > 0)
            .unwrap_or_else(|| self.formula_size(wave))
    }

    /// Global alive cap for a wave.
    pub fn alive_cap(&self, wave: u32) -> u32 {
        let scaled = self
            .base_cap
            .saturating_add(wave.saturating_sub(1).saturating_mul(self.cap_increment));
        scaled.min(self.hard_cap)
    }

    /// Seconds to wait before the given wave starts.
    pub fn interval(&self, wave: u32) -> f32 {
        if let Some(interval) = self
            .override_for(wave)
            .and_then(|o| o.interval)
            .filter(|&i| i > 0.0)
        {
            return interval;
        }
        let exponent = wave.saturating_sub(1) as i32;
        let interval = self.initial_interval * self.interval_multiplier.powi(exponent);
        interval.max(self.min_interval)
    }
}

/// All enemy simulation tuning, loaded from assets/data/enemies/enemy_config.ron.
#[derive(Resource, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct EnemyConfig {
    pub lod: LodConfig,
    pub waves: WaveConfig,
    /// Fixed RNG seed, for reproducible runs.
    pub seed: Option<u64>,
}

impl EnemyConfig {
    /// Load enemy config from RON file.
    pub fn load() -> Self {
        match fs::read_to_string(CONFIG_PATH) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded enemy config from {}", CONFIG_PATH);
                    config
                }
                Err(e) => {
                    error!("Failed to parse {}: {}. Using defaults.", CONFIG_PATH, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read {}: {}. Using defaults.", CONFIG_PATH, e);
                Self::default()
            }
        }
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self, registry: &EnemyRegistry) -> Result<(), ConfigError> {
        let lod = &self.lod;
        if lod.full_logic_radius <= 0.0 {
            return Err(ConfigError::invalid("lod.full_logic_radius", "must be positive"));
        }
        if lod.max_full_logic == 0 {
            return Err(ConfigError::invalid("lod.max_full_logic", "must be at least 1"));
        }
        if lod.far_skip_interval == 0 {
            return Err(ConfigError::invalid("lod.far_skip_interval", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&lod.far_speed_fraction) {
            return Err(ConfigError::invalid("lod.far_speed_fraction", "must be within [0, 1]"));
        }

        let waves = &self.waves;
        if waves.spawn_batch_size == 0 {
            return Err(ConfigError::invalid("waves.spawn_batch_size", "must be at least 1"));
        }
        if waves.hard_cap == 0 {
            return Err(ConfigError::invalid("waves.hard_cap", "must be at least 1"));
        }
        if waves.base_cap > waves.hard_cap {
            return Err(ConfigError::invalid(
                "waves.base_cap",
                format!("{} exceeds hard_cap {}", waves.base_cap, waves.hard_cap),
            ));
        }
        if waves.interval_multiplier <= 0.0 {
            return Err(ConfigError::invalid("waves.interval_multiplier", "must be positive"));
        }
        if waves.min_interval <= 0.0 {
            return Err(ConfigError::invalid("waves.min_interval", "must be positive"));
        }
        if !(0.0..=1.0).contains(&waves.elite_chance) {
            return Err(ConfigError::invalid("waves.elite_chance", "must be within [0, 1]"));
        }
        if waves.ring_min_radius < 0.0 || waves.ring_min_radius > waves.ring_max_radius {
            return Err(ConfigError::invalid(
                "waves.ring_min_radius",
                "must be non-negative and not above ring_max_radius",
            ));
        }

        if registry.is_empty() {
            return Err(ConfigError::NoArchetypes);
        }
        for ov in &waves.overrides {
            if let Some(name) = &ov.archetype {
                if registry.id_of(name).is_none() {
                    return Err(ConfigError::UnknownArchetype {
                        wave: ov.wave,
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
