//! Per-enemy movement, climbing, and contact damage.

use bevy::prelude::*;
use rand::rngs::StdRng;
use std::sync::Arc;

use super::config::LodConfig;
use super::data::{ArchetypeDef, ArchetypeId};
use super::health::EnemyHealth;
use super::pool::AgentId;
use super::query::{AgentMotor, SpatialQuery, TargetLink, TargetRef};
use super::shooter::{ShooterState, Volley};

const MIN_DIRECTION_SQ: f32 = 0.0001;

/// Simulation detail an agent receives this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyLod {
    Full,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The agent left the playable space and should be killed.
    Despawn,
}

/// Capabilities and shared per-frame values handed to every tick.
pub struct TickContext<'a> {
    pub query: &'a dyn SpatialQuery,
    pub motor: &'a mut dyn AgentMotor,
    pub targets: &'a mut dyn TargetLink,
    pub lod: &'a LodConfig,
    pub rng: &'a mut StdRng,
    pub target_position: Vec3,
}

/// One simulated enemy.
pub struct EnemyAgent {
    def: Arc<ArchetypeDef>,
    archetype: ArchetypeId,
    /// Pool the agent returns to on kill. Cleared on release.
    pool_slot: Option<ArchetypeId>,
    target: Option<TargetRef>,
    elite: bool,

    position: Vec3,
    rotation: Quat,
    last_position: Vec3,
    grounded: bool,

    vertical_velocity: f32,
    knockback: Vec3,
    blocked_timer: f32,
    climbing: bool,
    climb_dir: Vec3,
    climb_start_y: f32,

    contact_cooldown: f32,
    health: EnemyHealth,
    shooter: ShooterState,

    frame_counter: u32,
    phase_offset: u32,
    last_lod: Option<EnemyLod>,
}

impl EnemyAgent {
    pub fn new(archetype: ArchetypeId, def: Arc<ArchetypeDef>, phase_offset: u32) -> Self {
        let health = EnemyHealth::new(def.health.max_health);
        Self {
            def,
            archetype,
            pool_slot: None,
            target: None,
            elite: false,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            last_position: Vec3::ZERO,
            grounded: false,
            vertical_velocity: 0.0,
            knockback: Vec3::ZERO,
            blocked_timer: 0.0,
            climbing: false,
            climb_dir: Vec3::ZERO,
            climb_start_y: 0.0,
            contact_cooldown: 0.0,
            health,
            shooter: ShooterState::default(),
            frame_counter: 0,
            phase_offset,
            last_lod: None,
        }
    }

    /// Reset all per-life state for a spawn at `position`.
    pub fn initialize(
        &mut self,
        position: Vec3,
        target: Option<TargetRef>,
        elite: bool,
        pool_slot: Option<ArchetypeId>,
    ) {
        self.target = target;
        self.elite = elite;
        self.pool_slot = pool_slot;

        self.position = position;
        self.last_position = position;
        self.grounded = false;
        self.vertical_velocity = 0.0;
        self.knockback = Vec3::ZERO;
        self.blocked_timer = 0.0;
        self.climbing = false;
        self.climb_dir = Vec3::ZERO;
        self.climb_start_y = position.y;
        self.contact_cooldown = 0.0;
        self.shooter.reset();
        self.last_lod = None;

        let multiplier = if elite {
            self.def.elite.health_multiplier
        } else {
            1.0
        };
        self.health.reset(self.def.health.max_health * multiplier);
    }

    pub(crate) fn deactivate(&mut self) {
        self.target = None;
        self.knockback = Vec3::ZERO;
        self.climbing = false;
        self.last_lod = None;
    }

    pub(crate) fn take_pool_slot(&mut self) -> Option<ArchetypeId> {
        self.pool_slot.take()
    }

    /// Advance one frame. Does nothing without a target.
    pub fn tick(
        &mut self,
        id: AgentId,
        dt: f32,
        dist_sq: f32,
        lod: EnemyLod,
        ctx: &mut TickContext<'_>,
    ) -> TickOutcome {
        let Some(target) = self.target else {
            return TickOutcome::Continue;
        };
        if dt <= 0.0 {
            return TickOutcome::Continue;
        }

        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.last_lod = Some(lod);

        match lod {
            EnemyLod::Far => {
                let skip = ctx.lod.far_skip_interval.max(1);
                if self.frame_counter.wrapping_add(self.phase_offset) % skip == 0 {
                    self.far_step(dt, ctx.lod.far_speed_fraction, ctx.target_position);
                }
                // Far agents hold their height; only the floor check still runs.
                if self.position.y < self.def.locomotion.world_floor {
                    return TickOutcome::Despawn;
                }
                TickOutcome::Continue
            }
            EnemyLod::Full => self.full_step(id, target, dt, dist_sq, ctx),
        }
    }

    /// Slide toward the target with no probing, collision, or turning.
    fn far_step(&mut self, dt: f32, speed_fraction: f32, target_position: Vec3) {
        let mut to_target = target_position - self.position;
        to_target.y = 0.0;
        if to_target.length_squared() < MIN_DIRECTION_SQ {
            return;
        }
        let speed = self.def.locomotion.move_speed * speed_fraction;
        self.position += to_target.normalize() * speed * dt;
    }

    fn full_step(
        &mut self,
        id: AgentId,
        target: TargetRef,
        dt: f32,
        dist_sq: f32,
        ctx: &mut TickContext<'_>,
    ) -> TickOutcome {
        let locomotion = self.def.locomotion;
        let climb = self.def.climb;

        let mut move_dir = ctx.target_position - self.position;
        move_dir.y = 0.0;
        let has_dir = move_dir.length_squared() > MIN_DIRECTION_SQ;
        move_dir = if has_dir {
            move_dir.normalize()
        } else {
            Vec3::ZERO
        };

        // Blocked when forward progress since the last tick is too slow.
        if has_dir {
            let mut delta = self.position - self.last_position;
            delta.y = 0.0;
            let forward_speed = delta.dot(move_dir) / dt;
            if forward_speed < climb.min_forward_speed {
                self.blocked_timer += dt;
            } else {
                self.blocked_timer = 0.0;
            }
        } else {
            self.blocked_timer = 0.0;
        }
        self.last_position = self.position;

        self.handle_climb(move_dir, has_dir, ctx.query);

        if has_dir {
            let t = (dt * locomotion.turn_speed).min(1.0);
            self.rotation = self.rotation.slerp(facing(move_dir), t);
        }

        if self.climbing {
            self.vertical_velocity = self.vertical_velocity.max(climb.climb_speed);
            self.vertical_velocity += locomotion.gravity * climb.gravity_scale * dt;
        } else if self.grounded && self.vertical_velocity < 0.0 {
            self.vertical_velocity = locomotion.grounded_gravity;
        } else {
            self.vertical_velocity += locomotion.gravity * dt;
        }
        self.vertical_velocity = self.vertical_velocity.max(-locomotion.terminal_fall_speed);

        // Climbing keeps pushing along the locked direction.
        let walk = if self.climbing { self.climb_dir } else { move_dir };
        let velocity =
            walk * locomotion.move_speed + self.knockback + Vec3::Y * self.vertical_velocity;
        let moved = ctx.motor.move_agent(id, self.position, velocity * dt);
        self.position = moved.position;
        self.grounded = moved.grounded;

        if self.knockback.length_squared() > MIN_DIRECTION_SQ {
            self.knockback = move_towards(
                self.knockback,
                Vec3::ZERO,
                locomotion.knockback_damping * dt,
            );
        }

        let contact = self.def.contact;
        if self.contact_cooldown > 0.0 {
            self.contact_cooldown -= dt;
        }
        if self.contact_cooldown <= 0.0 && dist_sq <= contact.radius * contact.radius {
            ctx.targets
                .deal_damage(target, contact.damage * self.damage_multiplier());
            self.contact_cooldown = contact.interval;
        }

        if let Some(shooter) = &self.def.shooter {
            let volley = Volley {
                muzzle: self.position + Vec3::Y * self.def.body.chest_height(),
                target,
                target_position: ctx.target_position,
                damage_multiplier: self.damage_multiplier(),
                query: ctx.query,
                targets: &mut *ctx.targets,
            };
            self.shooter.update(shooter, dt, volley, &mut *ctx.rng);
        }

        if self.position.y < locomotion.world_floor {
            return TickOutcome::Despawn;
        }
        TickOutcome::Continue
    }

    fn handle_climb(&mut self, move_dir: Vec3, has_dir: bool, query: &dyn SpatialQuery) {
        if !has_dir {
            if !self.climbing {
                self.blocked_timer = 0.0;
            }
            return;
        }

        let body = self.def.body;
        let climb = self.def.climb;
        let chest = self.position + Vec3::Y * body.chest_height();

        if self.climbing {
            if self.climb_dir.length_squared() < MIN_DIRECTION_SQ {
                self.climb_dir = move_dir;
            }

            let obstacle = query
                .cast_ray(chest, self.climb_dir, climb.check_distance, climb.obstacle_mask)
                .is_some();
            if !obstacle {
                let ahead = self.position
                    + self.climb_dir * body.radius
                    + Vec3::Y * (body.height + 0.5);
                let ledge = query
                    .cast_ray(ahead, Vec3::NEG_Y, body.height + 1.0, climb.ground_mask)
                    .is_some();
                if ledge {
                    self.stop_climbing();
                    return;
                }
            }

            if self.position.y > self.climb_start_y + climb.max_height {
                self.stop_climbing();
            }
            return;
        }

        if self.blocked_timer < climb.blocked_time {
            return;
        }

        if query
            .cast_ray(chest, move_dir, climb.check_distance, climb.obstacle_mask)
            .is_some()
        {
            self.climbing = true;
            self.climb_start_y = self.position.y;
            self.climb_dir = move_dir;
        }
    }

    fn stop_climbing(&mut self) {
        self.climbing = false;
        self.blocked_timer = 0.0;
    }

    /// Add an external impulse. Decays during full-detail ticks.
    pub fn apply_knockback(&mut self, impulse: Vec3) {
        self.knockback += impulse;
    }

    /// Overwrite position and ground contact with what the physics body reports.
    pub fn sync_body(&mut self, position: Vec3, grounded: bool) {
        self.position = position;
        self.grounded = grounded;
    }

    pub fn damage_multiplier(&self) -> f32 {
        if self.elite {
            self.def.elite.damage_multiplier
        } else {
            1.0
        }
    }

    /// Visual scale including the elite bonus.
    pub fn scale(&self) -> f32 {
        if self.elite {
            self.def.scale * self.def.elite.scale_multiplier
        } else {
            self.def.scale
        }
    }

    pub fn definition(&self) -> &Arc<ArchetypeDef> {
        &self.def
    }

    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    pub fn pool_slot(&self) -> Option<ArchetypeId> {
        self.pool_slot
    }

    pub fn target(&self) -> Option<TargetRef> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<TargetRef>) {
        self.target = target;
    }

    pub fn is_elite(&self) -> bool {
        self.elite
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_climbing(&self) -> bool {
        self.climbing
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn knockback(&self) -> Vec3 {
        self.knockback
    }

    pub fn blocked_timer(&self) -> f32 {
        self.blocked_timer
    }

    /// Tier from the most recent tick, `None` before the first one.
    pub fn last_lod(&self) -> Option<EnemyLod> {
        self.last_lod
    }

    pub fn health(&self) -> &EnemyHealth {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut EnemyHealth {
        &mut self.health
    }
}

/// Yaw-only rotation whose forward (-Z) points along `dir`.
fn facing(dir: Vec3) -> Quat {
    Quat::from_rotation_y((-dir.x).atan2(-dir.z))
}

fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance == 0.0 {
        return target;
    }
    current + delta / distance * max_delta
}
