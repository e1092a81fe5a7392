//! Player-related components.

use bevy::prelude::*;

/// Player capsule is `capsule_y(0.5, 0.3)`, so the feet sit this far below
/// the body's center.
pub const PLAYER_HALF_HEIGHT: f32 = 0.8;

/// Marker component for the player entity.
#[derive(Component)]
pub struct Player;

/// Where the player (re)spawns at the start of each run.
#[derive(Component, Clone, Copy)]
pub struct SpawnPoint(pub Vec3);

/// Enemies pressing on the player this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Crowd {
    /// Enemy bodies inside the crowd radius.
    pub count: usize,
    /// Horizontal push away from them, already scaled by closeness.
    pub push: Vec3,
}

impl Crowd {
    /// Sum of pushes away from each neighbour, stronger the closer it is.
    /// Neighbours stacked exactly on the player are ignored.
    pub fn around(center: Vec3, neighbours: &[Vec3], radius: f32) -> Self {
        let mut push = Vec3::ZERO;
        let mut count = 0;
        for &other in neighbours {
            let mut away = center - other;
            away.y = 0.0;
            let distance = away.length();
            if distance > radius {
                continue;
            }
            count += 1;
            if distance > f32::EPSILON {
                push += away / distance * (1.0 - distance / radius);
            }
        }
        Self { count, push }
    }

    /// Walk speed multiplier while wading through this crowd.
    pub fn speed_factor(&self, config: &PlayerConfig) -> f32 {
        (1.0 - self.count as f32 * config.crowd_drag).max(config.min_crowd_speed)
    }
}

/// Vertical and shove state the mover carries between frames.
#[derive(Component, Debug, Default)]
pub struct PlayerMotion {
    pub grounded: bool,
    pub vertical_velocity: f32,
    /// Velocity from being hit, decays back to zero.
    pub shove: Vec3,
    pub crowd: Crowd,
}

impl PlayerMotion {
    /// Gravity and jumping for one frame.
    pub fn step_vertical(&mut self, jump: bool, config: &PlayerConfig, dt: f32) {
        if self.grounded {
            if self.vertical_velocity < 0.0 {
                self.vertical_velocity = 0.0;
            }
            if jump {
                self.vertical_velocity = config.jump_force;
            }
        } else {
            self.vertical_velocity -= config.gravity * dt;
        }
    }

    /// Knock the player away from the crowd pushing on them.
    pub fn take_hit(&mut self, config: &PlayerConfig) {
        let away = self.crowd.push.normalize_or_zero();
        self.shove += away * config.hit_shove;
    }

    /// Total velocity for this frame, given the walk direction from input.
    pub fn velocity(&self, walk: Vec3, speed: f32, config: &PlayerConfig) -> Vec3 {
        walk * speed * self.crowd.speed_factor(config)
            + self.crowd.push * config.crowd_push
            + self.shove
            + Vec3::Y * self.vertical_velocity
    }

    pub fn decay_shove(&mut self, config: &PlayerConfig, dt: f32) {
        let step = config.shove_damping * dt;
        let length = self.shove.length();
        self.shove = if length <= step {
            Vec3::ZERO
        } else {
            self.shove * ((length - step) / length)
        };
    }
}

/// Tuning for the first-person controller.
#[derive(Resource)]
pub struct PlayerConfig {
    /// Mouse sensitivity multiplier
    pub mouse_sensitivity: f32,
    /// Invert Y-axis for mouse look
    pub invert_y: bool,
    /// Base movement speed in units per second
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    pub jump_force: f32,
    pub gravity: f32,

    /// Enemies closer than this crowd the player.
    pub crowd_radius: f32,
    /// Speed lost per crowding enemy.
    pub crowd_drag: f32,
    /// Floor for the crowd speed multiplier.
    pub min_crowd_speed: f32,
    /// Units per second the crowd pushes the player at full strength.
    pub crowd_push: f32,
    /// Shove speed added by each hit taken.
    pub hit_shove: f32,
    /// Shove speed lost per second.
    pub shove_damping: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 1.5,
            invert_y: false,
            move_speed: 6.0,
            sprint_multiplier: 1.5,
            jump_force: 6.0,
            gravity: 15.0,
            crowd_radius: 1.2,
            crowd_drag: 0.12,
            min_crowd_speed: 0.35,
            crowd_push: 1.5,
            hit_shove: 4.0,
            shove_damping: 12.0,
        }
    }
}
