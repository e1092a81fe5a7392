//! Global events used for cross-system communication.
//!
//! Events allow decoupled systems to communicate. The enemy simulation sends
//! DamageEvents at the player, weapons send EnemyHitEvents at enemy bodies,
//! and neither side needs to know how the other stores its state.

use bevy::prelude::*;

use crate::enemies::ArchetypeId;

/// Sent when an entity takes damage.
///
/// The damage system listens for these events and applies the actual
/// health reduction.
#[derive(Event, Debug)]
pub struct DamageEvent {
    /// Entity receiving damage
    pub target: Entity,
    pub amount: f32,
}

/// Sent when an entity dies (health reaches 0).
#[derive(Event, Debug)]
pub struct DeathEvent {
    pub entity: Entity,
}

/// Sent by weapons when they hit an enemy body.
#[derive(Event, Debug)]
pub struct EnemyHitEvent {
    /// The enemy body entity that was hit
    pub entity: Entity,
    pub damage: f32,
    /// Impulse added to the enemy's knockback velocity
    pub knockback: Vec3,
}

/// Sent once per enemy death, after the agent went back to its pool.
#[derive(Event, Debug, Clone)]
pub struct EnemyKilledEvent {
    pub position: Vec3,
    pub archetype: ArchetypeId,
    pub elite: bool,
    /// Experience orbs to drop
    pub xp_orbs: u32,
    /// Experience carried by each orb
    pub xp_per_orb: u32,
}
