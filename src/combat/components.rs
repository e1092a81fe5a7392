//! Combat-related components.

use bevy::prelude::*;

/// Component for entities that can take damage.
#[derive(Component)]
pub struct Health {
    pub current: f32,
    pub maximum: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            maximum: max,
        }
    }

    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let actual = amount.max(0.0).min(self.current);
        self.current -= actual;
        actual
    }

    pub fn heal(&mut self, amount: f32) -> f32 {
        let actual = amount.max(0.0).min(self.maximum - self.current);
        self.current += actual;
        actual
    }

    pub fn reset(&mut self) {
        self.current = self.maximum;
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn percentage(&self) -> f32 {
        self.current / self.maximum
    }
}

/// The player's hitscan weapon.
#[derive(Component)]
pub struct Weapon {
    pub damage: f32,
    /// Hitscan range in units
    pub range: f32,
    /// Seconds between shots
    pub cooldown: f32,
    /// Knockback speed added to the enemy that was hit
    pub knockback: f32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            damage: 35.0,
            range: 60.0,
            cooldown: 0.15,
            knockback: 6.0,
        }
    }
}

/// Time until the weapon can fire again.
#[derive(Component, Default)]
pub struct WeaponCooldown {
    pub remaining: f32,
}

impl WeaponCooldown {
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Start the cooldown if the weapon is ready. Returns whether it fired.
    pub fn try_fire(&mut self, weapon: &Weapon) -> bool {
        if !self.ready() {
            return false;
        }
        self.remaining = weapon.cooldown;
        true
    }
}

/// Kill and experience totals for the current run.
#[derive(Resource, Default, Debug)]
pub struct RunStats {
    pub kills: u32,
    pub elite_kills: u32,
    pub experience: u32,
}

impl RunStats {
    pub fn record_kill(&mut self, elite: bool, xp_orbs: u32, xp_per_orb: u32) {
        self.kills += 1;
        if elite {
            self.elite_kills += 1;
        }
        self.experience += xp_orbs * xp_per_orb;
    }
}
