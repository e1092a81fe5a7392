//! Enemies module - the swarm population, its LOD scheduler, pools, and waves.
//!
//! Everything except `rapier`, `systems`, and `plugin` is plain Rust over
//! `bevy::math` types and the capability traits in `query`.

mod agent;
mod config;
mod data;
mod error;
mod health;
mod manager;
mod plugin;
mod pool;
mod query;
mod rapier;
mod shooter;
mod simulation;
mod systems;
mod waves;

#[cfg(test)]
mod testing;

pub use agent::{EnemyAgent, EnemyLod, TickContext, TickOutcome};
pub use config::{EnemyConfig, LodConfig, LodRotation, WaveConfig, WaveOverride};
pub use data::{
    ArchetypeDef, ArchetypeId, BodyConfig, ClimbConfig, ContactConfig, EliteConfig, EnemyRegistry,
    HealthConfig, LocomotionConfig,
};
pub use error::{ConfigError, DataLoadError};
pub use health::{EnemyDeath, EnemyHealth};
pub use manager::{EnemyManager, FrameStats};
pub use plugin::EnemyPlugin;
pub use pool::{AgentId, EnemyPool, EnemyPools, SlotState};
pub use query::{
    AgentMotor, ColliderId, LayerMask, MoveResult, RayHit, SpatialQuery, TargetLink, TargetRef,
};
pub use rapier::{collision_groups, RapierMotor, RapierSpatialQuery};
pub use shooter::{FirePattern, HitscanConfig, ShooterConfig, ShooterState};
pub use simulation::{EnemySimulation, FrameReport};
pub use systems::{EnemyBodies, EnemyBody};
pub use waves::{WavePhase, WaveScheduler, WaveSource};
