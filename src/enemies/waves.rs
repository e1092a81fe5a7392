//! Wave pacing: when to spawn, how many, and where.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::TAU;

use super::config::WaveConfig;
use super::data::{ArchetypeId, EnemyRegistry};
use super::manager::EnemyManager;
use super::pool::{AgentId, EnemyPools};
use super::query::{SpatialQuery, TargetRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavePhase {
    WaitingForWave,
    WaveActive,
}

/// Where the current wave's agents come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSource {
    Pool(ArchetypeId),
    /// Archetype without a pool, built on demand and never reused.
    Direct(ArchetypeId),
}

pub struct WaveScheduler {
    config: WaveConfig,
    /// Archetype overrides by wave number, resolved from names once.
    scripted: HashMap<u32, ArchetypeId>,
    wave: u32,
    phase: WavePhase,
    countdown: f32,
    pending: u32,
    alive_cap: u32,
    source: Option<WaveSource>,
    no_source_logged: bool,
}

impl WaveScheduler {
    pub fn new(config: WaveConfig, registry: &EnemyRegistry) -> Self {
        let mut scripted = HashMap::new();
        for ov in &config.overrides {
            let Some(name) = &ov.archetype else {
                continue;
            };
            match registry.id_of(name) {
                Some(id) => {
                    scripted.insert(ov.wave, id);
                }
                None => warn!("Wave {} override names unknown archetype '{}'", ov.wave, name),
            }
        }

        Self {
            countdown: config.interval(1),
            alive_cap: config.alive_cap(1),
            config,
            scripted,
            wave: 1,
            phase: WavePhase::WaitingForWave,
            pending: 0,
            source: None,
            no_source_logged: false,
        }
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Seconds until the next wave starts. Only meaningful while waiting.
    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn alive_cap(&self) -> u32 {
        self.alive_cap
    }

    pub fn source(&self) -> Option<WaveSource> {
        self.source
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    /// Advance timers and spawn this frame's batch. Returns the agents spawned.
    /// Nothing happens, timers included, while there is no target.
    pub fn update(
        &mut self,
        dt: f32,
        pools: &mut EnemyPools,
        manager: &mut EnemyManager,
        query: &dyn SpatialQuery,
        target: Option<(TargetRef, Vec3)>,
        rng: &mut StdRng,
    ) -> Vec<AgentId> {
        let Some((target, center)) = target else {
            return Vec::new();
        };

        if self.phase == WavePhase::WaitingForWave {
            self.countdown -= dt;
            if self.countdown > 0.0 {
                return Vec::new();
            }
            self.begin_wave(pools, manager.active_count(), rng);
        }

        let mut spawned = Vec::new();
        let room = self
            .alive_cap
            .saturating_sub(manager.active_count() as u32);
        let batch = self.config.spawn_batch_size.min(self.pending).min(room);
        for _ in 0..batch {
            self.pending -= 1;
            let Some(id) = self.acquire(pools, rng) else {
                continue;
            };
            let position = self.ring_position(center, query, rng);
            let elite = rng.gen::<f32>() < self.config.elite_chance;
            if pools.activate(id, position, Some(target), elite) {
                manager.register(id);
                spawned.push(id);
            }
        }

        if batch == 0 || self.pending == 0 {
            self.end_wave(manager.active_count());
        }
        spawned
    }

    fn begin_wave(&mut self, pools: &EnemyPools, active: usize, rng: &mut StdRng) {
        self.phase = WavePhase::WaveActive;
        self.source = self.choose_source(pools, rng);

        let size = self.config.target_size(self.wave);
        self.alive_cap = self.config.alive_cap(self.wave);
        let room = self.alive_cap.saturating_sub(active as u32);
        self.pending = if self.source.is_some() {
            size.min(room)
        } else {
            0
        };

        info!(
            "Wave {} started: {} of {} queued ({} alive, cap {})",
            self.wave, self.pending, size, active, self.alive_cap
        );
    }

    fn end_wave(&mut self, active: usize) {
        debug!(
            "Wave {} finished with {} alive, {} never spawned",
            self.wave, active, self.pending
        );
        self.phase = WavePhase::WaitingForWave;
        self.pending = 0;
        self.source = None;
        self.wave = self.wave.saturating_add(1);
        self.countdown = self.config.interval(self.wave);
    }

    fn choose_source(&mut self, pools: &EnemyPools, rng: &mut StdRng) -> Option<WaveSource> {
        if !self.config.random_waves {
            if let Some(&archetype) = self.scripted.get(&self.wave) {
                return Some(if pools.pool(archetype).is_some() {
                    WaveSource::Pool(archetype)
                } else {
                    WaveSource::Direct(archetype)
                });
            }
        }

        let pooled: Vec<_> = pools.pooled_archetypes().collect();
        if pooled.is_empty() {
            if !self.no_source_logged {
                warn!("No pooled enemy archetypes, waves will not spawn");
                self.no_source_logged = true;
            }
            return None;
        }
        Some(WaveSource::Pool(pooled[rng.gen_range(0..pooled.len())]))
    }

    /// Take an agent from the wave's source, falling back to the first pool.
    fn acquire(&mut self, pools: &mut EnemyPools, rng: &mut StdRng) -> Option<AgentId> {
        let acquired = match self.source? {
            WaveSource::Pool(archetype) => pools.acquire(archetype, rng),
            WaveSource::Direct(archetype) => pools.instantiate(archetype, rng),
        };
        if acquired.is_some() {
            return acquired;
        }

        let fallback = pools.pooled_archetypes().next()?;
        warn!("Wave source {:?} unusable, falling back to {:?}", self.source, fallback);
        self.source = Some(WaveSource::Pool(fallback));
        pools.acquire(fallback, rng)
    }

    /// Random point on the spawn ring, snapped down onto the ground.
    pub fn ring_position(&self, center: Vec3, query: &dyn SpatialQuery, rng: &mut impl Rng) -> Vec3 {
        let config = &self.config;
        let angle = rng.gen_range(0.0..TAU);
        let radius = if config.ring_min_radius < config.ring_max_radius {
            rng.gen_range(config.ring_min_radius..=config.ring_max_radius)
        } else {
            config.ring_max_radius
        };
        let flat = center + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius;

        let origin = flat + Vec3::Y * config.ring_probe_height;
        query
            .cast_ray(
                origin,
                Vec3::NEG_Y,
                config.ring_probe_height * 2.0,
                config.ground_mask,
            )
            .map_or(flat, |hit| hit.point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemies::config::{LodConfig, WaveOverride};
    use crate::enemies::data::ArchetypeDef;
    use crate::enemies::testing::{FlatWorld, RecordingTarget};
    use rand::SeedableRng;

    const TARGET: Option<(TargetRef, Vec3)> = Some((RecordingTarget::PLAYER, Vec3::ZERO));

    struct Rig {
        waves: WaveScheduler,
        pools: EnemyPools,
        manager: EnemyManager,
        world: FlatWorld,
        rng: StdRng,
    }

    impl Rig {
        fn new(config: WaveConfig) -> Self {
            let mut boss = ArchetypeDef::named("boss");
            boss.prewarm = None;
            let mut grunt = ArchetypeDef::named("grunt");
            grunt.prewarm = Some(8);
            let registry =
                EnemyRegistry::from_definitions([grunt, ArchetypeDef::named("runner"), boss]);
            let mut rng = StdRng::seed_from_u64(99);
            Self {
                waves: WaveScheduler::new(config, &registry),
                pools: EnemyPools::new(&registry, &mut rng),
                manager: EnemyManager::new(LodConfig::default()),
                world: FlatWorld::new(),
                rng,
            }
        }

        fn step(&mut self, dt: f32) -> Vec<AgentId> {
            self.waves.update(
                dt,
                &mut self.pools,
                &mut self.manager,
                &self.world,
                TARGET,
                &mut self.rng,
            )
        }

        /// Skip to the end of the countdown.
        fn start_wave(&mut self) -> Vec<AgentId> {
            let countdown = self.waves.countdown();
            self.step(countdown + 1e-3)
        }
    }

    #[test]
    fn first_wave_waits_for_interval() {
        let mut rig = Rig::new(WaveConfig::default());
        assert_eq!(rig.waves.wave(), 1);
        assert!(rig.step(3.9).is_empty());
        assert_eq!(rig.waves.phase(), WavePhase::WaitingForWave);

        let spawned = rig.step(0.2);
        assert_eq!(spawned.len(), 10);
        assert_eq!(rig.manager.active_count(), 10);
    }

    #[test]
    fn batches_spread_a_wave_over_frames() {
        let mut rig = Rig::new(WaveConfig {
            spawn_batch_size: 4,
            ..default()
        });

        assert_eq!(rig.start_wave().len(), 4);
        assert_eq!(rig.waves.phase(), WavePhase::WaveActive);
        assert_eq!(rig.waves.pending(), 6);
        assert_eq!(rig.step(0.016).len(), 4);
        assert_eq!(rig.step(0.016).len(), 2);

        assert_eq!(rig.waves.phase(), WavePhase::WaitingForWave);
        assert_eq!(rig.waves.wave(), 2);
        assert!((rig.waves.countdown() - 3.8).abs() < 1e-5);
        assert_eq!(rig.manager.active_count(), 10);
    }

    #[test]
    fn spawning_never_exceeds_alive_cap() {
        let mut rig = Rig::new(WaveConfig {
            initial_size: 12,
            size_increment: 7,
            base_cap: 15,
            cap_increment: 5,
            hard_cap: 30,
            spawn_batch_size: 5,
            min_interval: 0.1,
            initial_interval: 0.1,
            ..default()
        });

        for _ in 0..400 {
            rig.step(0.05);
            let cap = rig.waves.config().alive_cap(rig.waves.wave());
            assert!(rig.manager.active_count() as u32 <= cap);
            assert!(rig.waves.pending() <= rig.waves.config().target_size(rig.waves.wave()));
        }
        assert_eq!(rig.manager.active_count(), 30);
        assert!(rig.waves.wave() > 5);
    }

    #[test]
    fn full_population_ends_the_wave_immediately() {
        let mut rig = Rig::new(WaveConfig {
            base_cap: 10,
            cap_increment: 0,
            hard_cap: 10,
            ..default()
        });
        assert_eq!(rig.start_wave().len(), 10);
        assert_eq!(rig.waves.wave(), 2);

        assert!(rig.start_wave().is_empty());
        assert_eq!(rig.waves.phase(), WavePhase::WaitingForWave);
        assert_eq!(rig.waves.wave(), 3);
    }

    #[test]
    fn ring_positions_land_on_ground_within_radius() {
        let rig = Rig::new(WaveConfig::default());
        let mut rng = StdRng::seed_from_u64(4);
        let center = Vec3::new(3.0, 2.0, -1.0);
        for _ in 0..200 {
            let p = rig.waves.ring_position(center, &rig.world, &mut rng);
            let flat = Vec2::new(p.x - center.x, p.z - center.z).length();
            assert!((20.0 - 1e-3..=25.0 + 1e-3).contains(&flat));
            assert!(p.y.abs() < 1e-4);
        }
    }

    #[test]
    fn ring_probe_miss_uses_target_height() {
        let rig = Rig::new(WaveConfig::default());
        let mut rng = StdRng::seed_from_u64(4);
        let p = rig
            .waves
            .ring_position(Vec3::new(0.0, 7.5, 0.0), &FlatWorld::empty(), &mut rng);
        assert_eq!(p.y, 7.5);
    }

    #[test]
    fn elite_roll_follows_chance() {
        let mut rig = Rig::new(WaveConfig {
            elite_chance: 1.0,
            ..default()
        });
        for id in rig.start_wave() {
            assert!(rig.pools.get(id).unwrap().is_elite());
        }

        let mut rig = Rig::new(WaveConfig {
            elite_chance: 0.0,
            ..default()
        });
        for id in rig.start_wave() {
            assert!(!rig.pools.get(id).unwrap().is_elite());
        }
    }

    #[test]
    fn scripted_wave_instantiates_unpooled_archetype() {
        let mut rig = Rig::new(WaveConfig {
            random_waves: false,
            overrides: vec![
                WaveOverride {
                    wave: 1,
                    archetype: Some("boss".into()),
                    count: Some(2),
                    interval: None,
                },
                WaveOverride {
                    wave: 2,
                    archetype: Some("runner".into()),
                    count: Some(3),
                    interval: Some(0.5),
                },
            ],
            ..default()
        });

        let bosses = rig.start_wave();
        assert_eq!(bosses.len(), 2);
        for id in &bosses {
            let agent = rig.pools.get(*id).unwrap();
            assert_eq!(agent.archetype(), ArchetypeId(2));
            assert_eq!(agent.pool_slot(), None);
        }
        assert!((rig.waves.countdown() - 0.5).abs() < 1e-6);

        let runners = rig.start_wave();
        assert_eq!(runners.len(), 3);
        for id in &runners {
            assert_eq!(rig.pools.get(*id).unwrap().pool_slot(), Some(ArchetypeId(1)));
        }

        // Wave 3 has no override: formula size, random pooled archetype.
        let third = rig.start_wave();
        assert_eq!(third.len(), 10);
        assert_eq!(rig.waves.pending(), 6);
        assert!(matches!(rig.waves.source(), Some(WaveSource::Pool(_))));
        for id in &third {
            assert!(rig.pools.get(*id).unwrap().pool_slot().is_some());
        }
    }

    #[test]
    fn no_target_freezes_the_countdown() {
        let mut rig = Rig::new(WaveConfig::default());
        let spawned = rig.waves.update(
            10.0,
            &mut rig.pools,
            &mut rig.manager,
            &rig.world,
            None,
            &mut rig.rng,
        );
        assert!(spawned.is_empty());
        assert_eq!(rig.waves.countdown(), 4.0);
    }
}
