//! Enemy hit points and death reports.

use bevy::prelude::*;
use rand::Rng;

use super::data::{ArchetypeId, HealthConfig};
use super::pool::AgentId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyHealth {
    pub current: f32,
    pub max: f32,
    dead: bool,
}

impl EnemyHealth {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            dead: false,
        }
    }

    /// Refill for a fresh spawn.
    pub fn reset(&mut self, max: f32) {
        *self = Self::new(max);
    }

    /// Apply damage. Returns true only on the hit that kills.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if amount <= 0.0 || self.dead {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        if self.current <= 0.0 {
            self.dead = true;
            return true;
        }
        false
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn percentage(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.current / self.max
    }
}

impl Default for EnemyHealth {
    fn default() -> Self {
        Self::new(HealthConfig::default().max_health)
    }
}

/// Produced once per enemy killed by damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyDeath {
    pub id: AgentId,
    pub archetype: ArchetypeId,
    pub position: Vec3,
    pub elite: bool,
    pub xp_orbs: u32,
    pub xp_per_orb: u32,
}

/// Roll how many xp orbs a kill drops.
pub fn roll_xp_orbs(config: &HealthConfig, rng: &mut impl Rng) -> u32 {
    let min = config.xp_orbs_min.min(config.xp_orbs_max);
    let max = config.xp_orbs_min.max(config.xp_orbs_max);
    rng.gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn dies_exactly_once() {
        let mut health = EnemyHealth::new(30.0);
        assert!(!health.take_damage(20.0));
        assert!(health.take_damage(20.0));
        assert!(health.is_dead());
        assert_eq!(health.current, 0.0);
        assert!(!health.take_damage(5.0));
    }

    #[test]
    fn non_positive_damage_is_ignored() {
        let mut health = EnemyHealth::new(10.0);
        assert!(!health.take_damage(0.0));
        assert!(!health.take_damage(-4.0));
        assert_eq!(health.current, 10.0);
    }

    #[test]
    fn reset_revives() {
        let mut health = EnemyHealth::new(10.0);
        health.take_damage(50.0);
        health.reset(30.0);
        assert!(!health.is_dead());
        assert_eq!(health.current, 30.0);
        assert_eq!(health.percentage(), 1.0);
    }

    #[test]
    fn xp_roll_is_inclusive() {
        let config = HealthConfig {
            xp_orbs_min: 2,
            xp_orbs_max: 4,
            ..default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = [false; 5];
        for _ in 0..500 {
            let orbs = roll_xp_orbs(&config, &mut rng);
            assert!((2..=4).contains(&orbs));
            seen[orbs as usize] = true;
        }
        assert!(seen[2] && seen[3] && seen[4]);
    }
}
