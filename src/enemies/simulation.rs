//! The enemy population as one owned unit: registry, pools, and waves.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::agent::EnemyAgent;
use super::config::EnemyConfig;
use super::data::{ArchetypeId, EnemyRegistry};
use super::error::ConfigError;
use super::health::{roll_xp_orbs, EnemyDeath};
use super::manager::{EnemyManager, FrameStats};
use super::pool::{AgentId, EnemyPools};
use super::query::{AgentMotor, SpatialQuery, TargetLink};
use super::waves::WaveScheduler;

/// Result of one simulation step.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub stats: FrameStats,
    pub spawned: Vec<AgentId>,
}

#[derive(Resource)]
pub struct EnemySimulation {
    config: EnemyConfig,
    manager: EnemyManager,
    pools: EnemyPools,
    waves: WaveScheduler,
    rng: StdRng,
}

impl EnemySimulation {
    /// Validate the config and build pools for every pooled archetype.
    pub fn new(config: EnemyConfig, registry: &EnemyRegistry) -> Result<Self, ConfigError> {
        config.validate(registry)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pools = EnemyPools::new(registry, &mut rng);
        info!(
            "Enemy simulation ready: {} archetypes, {} pooled instances",
            registry.len(),
            pools.slot_count()
        );

        Ok(Self {
            manager: EnemyManager::new(config.lod.clone()),
            waves: WaveScheduler::new(config.waves.clone(), registry),
            pools,
            config,
            rng,
        })
    }

    /// Tick every active agent, then let the wave scheduler spawn.
    /// Agents spawned here get their first tick next frame. Slots freed
    /// before or during this call are reused from the next frame on.
    pub fn update(
        &mut self,
        dt: f32,
        query: &dyn SpatialQuery,
        motor: &mut dyn AgentMotor,
        targets: &mut dyn TargetLink,
    ) -> FrameReport {
        let stats = self.manager.update(
            dt,
            &mut self.pools,
            query,
            motor,
            &mut *targets,
            &mut self.rng,
        );
        let target = self.manager.resolve_target(&*targets);
        let spawned = self.waves.update(
            dt,
            &mut self.pools,
            &mut self.manager,
            query,
            target,
            &mut self.rng,
        );
        self.pools.recycle_released();
        FrameReport { stats, spawned }
    }

    /// Spawn one agent outside the wave schedule.
    pub fn spawn(&mut self, archetype: ArchetypeId, position: Vec3, elite: bool) -> Option<AgentId> {
        let id = match self.pools.pool(archetype) {
            Some(_) => self.pools.acquire(archetype, &mut self.rng)?,
            None => self.pools.instantiate(archetype, &mut self.rng)?,
        };
        if !self
            .pools
            .activate(id, position, self.manager.target(), elite)
        {
            return None;
        }
        self.manager.register(id);
        Some(id)
    }

    /// Deactivate an agent and return it to its pool. Safe to call repeatedly.
    pub fn kill(&mut self, id: AgentId) -> bool {
        self.manager.unregister(id);
        self.pools.release(id)
    }

    /// Hurt an agent. Returns the death report on the killing blow.
    pub fn damage(&mut self, id: AgentId, amount: f32) -> Option<EnemyDeath> {
        let agent = self.pools.get_mut(id)?;
        if !agent.health_mut().take_damage(amount) {
            return None;
        }

        let health = agent.definition().health;
        let death = EnemyDeath {
            id,
            archetype: agent.archetype(),
            position: agent.position(),
            elite: agent.is_elite(),
            xp_orbs: roll_xp_orbs(&health, &mut self.rng),
            xp_per_orb: health.xp_per_orb,
        };
        self.kill(id);
        Some(death)
    }

    pub fn apply_knockback(&mut self, id: AgentId, impulse: Vec3) -> bool {
        match self.pools.get_mut(id) {
            Some(agent) => {
                agent.apply_knockback(impulse);
                true
            }
            None => false,
        }
    }

    pub fn agent(&self, id: AgentId) -> Option<&EnemyAgent> {
        self.pools.get(id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut EnemyAgent> {
        self.pools.get_mut(id)
    }

    pub fn active_count(&self) -> usize {
        self.manager.active_count()
    }

    pub fn manager(&self) -> &EnemyManager {
        &self.manager
    }

    pub fn pools(&self) -> &EnemyPools {
        &self.pools
    }

    pub fn waves(&self) -> &WaveScheduler {
        &self.waves
    }

    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }
}
