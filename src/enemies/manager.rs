//! Active-agent registry and the per-frame LOD scheduler.
//!
//! Every registered agent is ticked once per frame. Agents inside the
//! full-logic radius get the expensive tick until the per-frame cap runs
//! out; everyone else gets the cheap one. The scan start rotates between
//! frames so the cap does not always favor the same agents.

use bevy::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::mem;

use super::agent::{EnemyLod, TickContext, TickOutcome};
use super::config::{LodConfig, LodRotation};
use super::pool::{AgentId, EnemyPools};
use super::query::{AgentMotor, SpatialQuery, TargetLink, TargetRef};

/// What happened during one scheduler update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub full: usize,
    pub far: usize,
    /// Snapshot entries that no longer resolved to a live agent.
    pub skipped: usize,
    /// Agents that removed themselves this frame.
    pub despawned: usize,
}

impl FrameStats {
    pub fn ticked(&self) -> usize {
        self.full + self.far
    }
}

pub struct EnemyManager {
    lod: LodConfig,
    full_radius_sq: f32,
    target: Option<TargetRef>,
    target_missing_logged: bool,

    active: Vec<AgentId>,
    index: HashMap<AgentId, usize>,
    /// Reused buffer for the per-frame copy of `active`.
    snapshot: Vec<AgentId>,
    start_index: usize,
}

impl EnemyManager {
    pub fn new(lod: LodConfig) -> Self {
        Self {
            full_radius_sq: lod.full_logic_radius * lod.full_logic_radius,
            lod,
            target: None,
            target_missing_logged: false,
            active: Vec::new(),
            index: HashMap::new(),
            snapshot: Vec::new(),
            start_index: 0,
        }
    }

    /// Add an agent to the registry. Returns false if it was already there.
    pub fn register(&mut self, id: AgentId) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.active.len());
        self.active.push(id);
        true
    }

    /// Remove an agent. Takes effect from the next frame's snapshot.
    pub fn unregister(&mut self, id: AgentId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        self.active.swap_remove(slot);
        if let Some(&moved) = self.active.get(slot) {
            self.index.insert(moved, slot);
        }
        true
    }

    pub fn is_registered(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active(&self) -> &[AgentId] {
        &self.active
    }

    pub fn target(&self) -> Option<TargetRef> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<TargetRef>) {
        self.target = target;
    }

    pub fn lod(&self) -> &LodConfig {
        &self.lod
    }

    /// Current target and its position, recovering a new one if the old
    /// target is gone.
    pub fn resolve_target(&mut self, targets: &dyn TargetLink) -> Option<(TargetRef, Vec3)> {
        if let Some(target) = self.target {
            if let Some(position) = targets.position(target) {
                return Some((target, position));
            }
        }

        let found = targets
            .find_target()
            .and_then(|target| targets.position(target).map(|position| (target, position)));
        match found {
            Some((target, position)) => {
                if self.target_missing_logged {
                    info!("Enemy target recovered");
                }
                self.target = Some(target);
                self.target_missing_logged = false;
                Some((target, position))
            }
            None => {
                if !self.target_missing_logged {
                    warn!("No enemy target found, skipping enemy updates");
                    self.target_missing_logged = true;
                }
                self.target = None;
                None
            }
        }
    }

    /// Tick every registered agent once.
    pub fn update(
        &mut self,
        dt: f32,
        pools: &mut EnemyPools,
        query: &dyn SpatialQuery,
        motor: &mut dyn AgentMotor,
        targets: &mut dyn TargetLink,
        rng: &mut StdRng,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        let Some((target, target_position)) = self.resolve_target(&*targets) else {
            return stats;
        };
        if self.active.is_empty() {
            return stats;
        }

        // Registry edits made while ticking only show up next frame.
        let mut snapshot = mem::take(&mut self.snapshot);
        snapshot.clear();
        snapshot.extend_from_slice(&self.active);
        let count = snapshot.len();
        let start = self.start_index % count;

        let lod = self.lod.clone();
        let mut ctx = TickContext {
            query,
            motor,
            targets,
            lod: &lod,
            rng,
            target_position,
        };

        let mut last_full = None;
        let mut capped = false;
        for n in 0..count {
            let i = (start + n) % count;
            let id = snapshot[i];
            let Some(agent) = pools.get_mut(id) else {
                stats.skipped += 1;
                continue;
            };

            // Agents chase whatever the manager is tracking.
            if agent.target() != Some(target) {
                agent.set_target(Some(target));
            }

            let dist_sq = agent.position().distance_squared(target_position);
            let in_radius = dist_sq <= self.full_radius_sq;
            let tier = if in_radius && stats.full < lod.max_full_logic {
                stats.full += 1;
                last_full = Some(i);
                EnemyLod::Full
            } else {
                capped |= in_radius;
                stats.far += 1;
                EnemyLod::Far
            };

            if agent.tick(id, dt, dist_sq, tier, &mut ctx) == TickOutcome::Despawn {
                self.unregister(id);
                pools.release(id);
                stats.despawned += 1;
            }
        }

        self.start_index = match (lod.rotation, last_full) {
            (LodRotation::Budget, Some(i)) if capped => i + 1,
            _ => start + 1,
        };
        self.snapshot = snapshot;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemies::data::{ArchetypeDef, ArchetypeId, EnemyRegistry};
    use crate::enemies::testing::{FlatWorld, KinematicMotor, RecordingTarget};
    use rand::SeedableRng;
    use std::collections::HashSet;

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        manager: EnemyManager,
        pools: EnemyPools,
        world: FlatWorld,
        motor: KinematicMotor,
        targets: RecordingTarget,
        rng: StdRng,
    }

    impl Rig {
        fn new(lod: LodConfig) -> Self {
            let mut def = ArchetypeDef::named("grunt");
            def.contact.damage = 0.0;
            let registry = EnemyRegistry::from_definitions([def]);
            let mut rng = StdRng::seed_from_u64(17);
            let world = FlatWorld::new();
            Self {
                manager: EnemyManager::new(lod),
                pools: EnemyPools::new(&registry, &mut rng),
                motor: KinematicMotor::over(&world),
                world,
                targets: RecordingTarget::at(Vec3::ZERO),
                rng,
            }
        }

        fn spawn(&mut self, position: Vec3) -> AgentId {
            let id = self.pools.acquire(ArchetypeId(0), &mut self.rng).unwrap();
            self.pools
                .activate(id, position, Some(RecordingTarget::PLAYER), false);
            self.manager.register(id);
            id
        }

        /// Agents spread on a circle of `radius` around the target.
        fn spawn_ring(&mut self, count: usize, radius: f32) -> Vec<AgentId> {
            (0..count)
                .map(|i| {
                    let angle = i as f32 / count as f32 * std::f32::consts::TAU;
                    self.spawn(Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius))
                })
                .collect()
        }

        fn frame(&mut self) -> FrameStats {
            self.motor.moves.clear();
            self.manager.update(
                DT,
                &mut self.pools,
                &self.world,
                &mut self.motor,
                &mut self.targets,
                &mut self.rng,
            )
        }

        fn full_set(&self) -> HashSet<AgentId> {
            self.motor.moves.iter().copied().collect()
        }
    }

    fn lod(cap: usize, rotation: LodRotation) -> LodConfig {
        LodConfig {
            full_logic_radius: 15.0,
            max_full_logic: cap,
            rotation,
            ..default()
        }
    }

    #[test]
    fn register_is_idempotent() {
        let mut rig = Rig::new(LodConfig::default());
        let id = rig.spawn(Vec3::X);
        assert!(!rig.manager.register(id));
        assert_eq!(rig.manager.active_count(), 1);

        assert!(rig.manager.unregister(id));
        assert!(!rig.manager.unregister(id));
        assert_eq!(rig.manager.active_count(), 0);
    }

    #[test]
    fn unregister_keeps_index_consistent() {
        let mut rig = Rig::new(LodConfig::default());
        let ids = rig.spawn_ring(5, 3.0);
        rig.manager.unregister(ids[1]);
        rig.manager.unregister(ids[4]);
        for &id in &[ids[0], ids[2], ids[3]] {
            assert!(rig.manager.is_registered(id));
            assert!(rig.manager.unregister(id));
        }
        assert_eq!(rig.manager.active_count(), 0);
    }

    #[test]
    fn over_budget_frame_splits_tiers() {
        let mut rig = Rig::new(lod(300, LodRotation::Step));
        rig.spawn_ring(500, 5.0);

        let first = rig.frame();
        assert_eq!(first.full, 300);
        assert_eq!(first.far, 200);
        let first_set = rig.full_set();

        let second = rig.frame();
        assert_eq!(second.full, 300);
        assert_eq!(second.far, 200);
        assert_ne!(first_set, rig.full_set());
    }

    #[test]
    fn full_tier_never_exceeds_cap() {
        let mut rig = Rig::new(lod(7, LodRotation::Budget));
        rig.spawn_ring(40, 4.0);
        rig.spawn_ring(10, 100.0);
        for _ in 0..20 {
            let stats = rig.frame();
            assert!(stats.full <= 7);
            assert_eq!(stats.ticked(), 50);
            assert_eq!(rig.motor.moves.len(), stats.full);
        }
    }

    #[test]
    fn budget_rotation_covers_everyone_within_ceil_frames() {
        let cap = 30;
        let total = 100;
        let mut rig = Rig::new(lod(cap, LodRotation::Budget));
        rig.spawn_ring(total, 5.0);

        let frames = total.div_ceil(cap);
        let mut seen = HashSet::new();
        let mut previous = 0;
        for _ in 0..frames {
            rig.frame();
            seen.extend(rig.full_set());
            assert!(seen.len() > previous);
            previous = seen.len();
        }
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn step_rotation_shifts_by_one() {
        let mut rig = Rig::new(lod(3, LodRotation::Step));
        rig.spawn_ring(10, 5.0);

        rig.frame();
        let first = rig.full_set();
        rig.frame();
        let second = rig.full_set();
        assert_eq!(first.intersection(&second).count(), 2);
    }

    #[test]
    fn far_agents_are_not_promoted_by_spare_budget() {
        let mut rig = Rig::new(lod(300, LodRotation::Budget));
        rig.spawn_ring(5, 4.0);
        rig.spawn_ring(5, 40.0);
        let stats = rig.frame();
        assert_eq!(stats.full, 5);
        assert_eq!(stats.far, 5);
    }

    #[test]
    fn every_snapshot_agent_ticks_once_despite_mid_frame_despawns() {
        let mut rig = Rig::new(LodConfig {
            full_logic_radius: 100.0,
            ..lod(1_000, LodRotation::Budget)
        });
        let walkers = rig.spawn_ring(20, 5.0);
        // Already below the world floor: these despawn during their own tick.
        let fallers: Vec<_> = (0..5)
            .map(|i| rig.spawn(Vec3::new(i as f32, -60.0, 2.0)))
            .collect();
        rig.motor.floor = None;

        let stats = rig.frame();
        assert_eq!(stats.full, 25);
        assert_eq!(stats.despawned, 5);
        let mut counts: HashMap<AgentId, usize> = HashMap::new();
        for id in &rig.motor.moves {
            *counts.entry(*id).or_default() += 1;
        }
        for id in walkers.iter().chain(&fallers) {
            assert_eq!(counts.get(id), Some(&1));
        }

        assert_eq!(rig.manager.active_count(), 20);
        for id in &fallers {
            assert!(!rig.pools.is_active(*id));
        }
        assert_eq!(rig.pools.pool(ArchetypeId(0)).unwrap().queued(), 5);

        let stats = rig.frame();
        assert_eq!(stats.ticked(), 20);
        assert_eq!(stats.despawned, 0);
    }

    #[test]
    fn released_agents_are_skipped() {
        let mut rig = Rig::new(LodConfig::default());
        let ids = rig.spawn_ring(4, 3.0);
        // Released without unregistering, like an external kill.
        rig.pools.release(ids[2]);
        let stats = rig.frame();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.ticked(), 3);
    }

    #[test]
    fn missing_target_skips_the_frame() {
        let mut rig = Rig::new(LodConfig::default());
        rig.spawn_ring(3, 3.0);
        rig.targets.present = false;
        assert_eq!(rig.frame(), FrameStats::default());
        assert!(rig.motor.moves.is_empty());
        assert_eq!(rig.manager.target(), None);

        rig.targets.present = true;
        assert_eq!(rig.frame().ticked(), 3);
        assert_eq!(rig.manager.target(), Some(RecordingTarget::PLAYER));
    }

    #[test]
    fn empty_registry_is_a_no_op() {
        let mut rig = Rig::new(LodConfig::default());
        assert_eq!(rig.frame(), FrameStats::default());
    }
}
