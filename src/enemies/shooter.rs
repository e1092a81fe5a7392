//! Ranged attacks for archetypes that carry hitscan weapons.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use super::query::{LayerMask, SpatialQuery, TargetLink, TargetRef};

/// How a shooter spends its cooldown.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FirePattern {
    /// Every weapon fires, then the cooldown starts.
    #[default]
    FireAllThenCooldown,
    /// One randomly chosen weapon fires per cooldown.
    RandomOnePerCooldown,
}

/// A single instant-hit weapon.
#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct HitscanConfig {
    pub damage: f32,
    pub range: f32,
    pub hit_mask: LayerMask,
}

impl Default for HitscanConfig {
    fn default() -> Self {
        Self {
            damage: 10.0,
            range: 40.0,
            hit_mask: LayerMask::WORLD.union(LayerMask::PLAYER),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ShooterConfig {
    pub shoot_distance: f32,
    pub cooldown: f32,
    pub pattern: FirePattern,
    /// Max random deviation in degrees, applied separately to yaw and pitch.
    pub spread_degrees: f32,
    /// Aim this far above the target's feet.
    pub aim_height_offset: f32,
    pub weapons: Vec<HitscanConfig>,
}

impl Default for ShooterConfig {
    fn default() -> Self {
        Self {
            shoot_distance: 12.0,
            cooldown: 1.25,
            pattern: FirePattern::FireAllThenCooldown,
            spread_degrees: 4.0,
            aim_height_offset: 1.0,
            weapons: vec![HitscanConfig::default()],
        }
    }
}

impl ShooterConfig {
    /// Direction from `muzzle` toward the target's aim point, with random spread.
    pub fn aim_direction(&self, muzzle: Vec3, target_position: Vec3, rng: &mut impl Rng) -> Vec3 {
        let aim_point = target_position + Vec3::Y * self.aim_height_offset;
        let base = (aim_point - muzzle).normalize_or_zero();
        if self.spread_degrees <= 0.001 || base == Vec3::ZERO {
            return base;
        }

        let spread = self.spread_degrees;
        let yaw = Quat::from_rotation_y(rng.gen_range(-spread..=spread).to_radians());
        let pitch = Quat::from_rotation_x(rng.gen_range(-spread..=spread).to_radians());
        (yaw * pitch * base).normalize_or_zero()
    }
}

/// Per-agent firing state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShooterState {
    timer: f32,
}

/// Everything a volley needs besides the shooter itself.
pub struct Volley<'a> {
    pub muzzle: Vec3,
    pub target: TargetRef,
    pub target_position: Vec3,
    pub damage_multiplier: f32,
    pub query: &'a dyn SpatialQuery,
    pub targets: &'a mut dyn TargetLink,
}

impl ShooterState {
    pub fn reset(&mut self) {
        self.timer = 0.0;
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.timer.max(0.0)
    }

    /// Count down and fire when ready and in range. Returns the number of
    /// weapon rays that damaged the target.
    pub fn update(
        &mut self,
        config: &ShooterConfig,
        dt: f32,
        mut volley: Volley<'_>,
        rng: &mut impl Rng,
    ) -> u32 {
        if config.weapons.is_empty() {
            return 0;
        }

        self.timer -= dt;
        if self.timer > 0.0 {
            return 0;
        }

        let dist_sq = volley.muzzle.distance_squared(volley.target_position);
        if dist_sq > config.shoot_distance * config.shoot_distance {
            return 0;
        }

        let mut hits = 0;
        match config.pattern {
            FirePattern::FireAllThenCooldown => {
                for weapon in &config.weapons {
                    hits += fire_hitscan(config, weapon, &mut volley, rng) as u32;
                }
            }
            FirePattern::RandomOnePerCooldown => {
                let weapon = &config.weapons[rng.gen_range(0..config.weapons.len())];
                hits += fire_hitscan(config, weapon, &mut volley, rng) as u32;
            }
        }
        self.timer = config.cooldown;
        hits
    }
}

fn fire_hitscan(
    config: &ShooterConfig,
    weapon: &HitscanConfig,
    volley: &mut Volley<'_>,
    rng: &mut impl Rng,
) -> bool {
    let direction = config.aim_direction(volley.muzzle, volley.target_position, rng);
    if direction == Vec3::ZERO {
        return false;
    }

    let Some(hit) = volley
        .query
        .cast_ray(volley.muzzle, direction, weapon.range, weapon.hit_mask)
    else {
        return false;
    };

    match volley.targets.target_of(hit.collider) {
        Some(target) if target == volley.target => {
            volley
                .targets
                .deal_damage(target, weapon.damage * volley.damage_multiplier);
            true
        }
        _ => false,
    }
}
