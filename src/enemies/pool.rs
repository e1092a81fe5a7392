//! Agent storage and per-archetype object pools.
//!
//! Every agent ever created lives in one slot arena. Pools are queues of slot
//! indices; nothing is ever freed, only deactivated and queued for reuse.
//! Releasing a slot bumps its generation, so any [`AgentId`] handed out
//! before the release stops resolving. Released slots wait out the rest of
//! the frame before `acquire` can hand them out again.

use bevy::prelude::*;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;

use super::agent::EnemyAgent;
use super::data::{ArchetypeDef, ArchetypeId, EnemyRegistry};
use super::query::TargetRef;

/// Generational handle to an agent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId {
    pub index: u32,
    pub generation: u32,
}

/// Lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Sitting in its pool queue.
    Pooled,
    /// Handed out by `acquire`, waiting for `activate` or `release`.
    Outstanding,
    Active,
    /// Non-pooled agent that was killed. Never reused.
    Retired,
}

struct AgentSlot {
    agent: EnemyAgent,
    generation: u32,
    state: SlotState,
    /// Pool this slot returns to; `None` for directly instantiated agents.
    origin: Option<ArchetypeId>,
}

/// Reusable instances of one archetype.
#[derive(Debug)]
pub struct EnemyPool {
    archetype: ArchetypeId,
    queue: VecDeque<u32>,
    /// Released this frame; moved to `queue` by `recycle_released`.
    released: Vec<u32>,
    created: usize,
    outstanding: usize,
}

impl EnemyPool {
    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    /// Instances waiting in the queue, including ones released this frame.
    pub fn queued(&self) -> usize {
        self.queue.len() + self.released.len()
    }

    /// Instances `acquire` can hand out without constructing.
    pub fn ready(&self) -> usize {
        self.queue.len()
    }

    /// Instances handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Instances this pool ever constructed.
    pub fn created(&self) -> usize {
        self.created
    }
}

/// Owner of every agent plus one pool per pooled archetype.
pub struct EnemyPools {
    definitions: Vec<Arc<ArchetypeDef>>,
    /// Indexed by archetype id; `None` for unpooled archetypes.
    pools: Vec<Option<EnemyPool>>,
    slots: Vec<AgentSlot>,
    active: usize,
}

impl EnemyPools {
    /// Build pools for every pooled archetype and prewarm them.
    pub fn new(registry: &EnemyRegistry, rng: &mut impl Rng) -> Self {
        let mut pools = Self {
            definitions: registry.iter().map(|(_, def)| def.clone()).collect(),
            pools: registry
                .iter()
                .map(|(id, def)| {
                    def.is_pooled().then(|| EnemyPool {
                        archetype: id,
                        queue: VecDeque::new(),
                        released: Vec::new(),
                        created: 0,
                        outstanding: 0,
                    })
                })
                .collect(),
            slots: Vec::new(),
            active: 0,
        };

        for (id, def) in registry.iter() {
            let count = def.prewarm.unwrap_or(0);
            for _ in 0..count {
                let index = pools.construct(id, Some(id), rng);
                if let Some(pool) = pools.pool_mut(id) {
                    pool.queue.push_back(index);
                }
            }
            if count > 0 {
                info!("Prewarmed {} '{}' enemies", count, def.name);
            }
        }
        pools
    }

    fn construct(
        &mut self,
        archetype: ArchetypeId,
        origin: Option<ArchetypeId>,
        rng: &mut impl Rng,
    ) -> u32 {
        let def = self.definitions[archetype.0 as usize].clone();
        let index = self.slots.len() as u32;
        self.slots.push(AgentSlot {
            agent: EnemyAgent::new(archetype, def, rng.gen()),
            generation: 0,
            state: SlotState::Pooled,
            origin,
        });
        if let Some(pool) = origin.and_then(|id| self.pool_mut(id)) {
            pool.created += 1;
        }
        index
    }

    fn pool_mut(&mut self, archetype: ArchetypeId) -> Option<&mut EnemyPool> {
        self.pools
            .get_mut(archetype.0 as usize)
            .and_then(Option::as_mut)
    }

    pub fn pool(&self, archetype: ArchetypeId) -> Option<&EnemyPool> {
        self.pools.get(archetype.0 as usize).and_then(Option::as_ref)
    }

    /// Archetypes that have a pool, in id order.
    pub fn pooled_archetypes(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.pools.iter().flatten().map(|pool| pool.archetype)
    }

    pub fn definition(&self, archetype: ArchetypeId) -> Option<&Arc<ArchetypeDef>> {
        self.definitions.get(archetype.0 as usize)
    }

    /// Take an instance from the archetype's pool, constructing one if the
    /// queue is empty. `None` only if the archetype has no pool.
    pub fn acquire(&mut self, archetype: ArchetypeId, rng: &mut impl Rng) -> Option<AgentId> {
        let queued = self.pool_mut(archetype)?.queue.pop_front();
        let index = match queued {
            Some(index) => index,
            None => {
                let index = self.construct(archetype, Some(archetype), rng);
                debug!(
                    "Enemy pool {:?} grew to {} instances",
                    archetype,
                    self.pool(archetype).map_or(0, EnemyPool::created)
                );
                index
            }
        };
        if let Some(pool) = self.pool_mut(archetype) {
            pool.outstanding += 1;
        }

        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Outstanding;
        Some(AgentId {
            index,
            generation: slot.generation,
        })
    }

    /// Create an agent that belongs to no pool. Killing it only deactivates it.
    pub fn instantiate(&mut self, archetype: ArchetypeId, rng: &mut impl Rng) -> Option<AgentId> {
        if self.definition(archetype).is_none() {
            return None;
        }
        let index = self.construct(archetype, None, rng);
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Outstanding;
        Some(AgentId {
            index,
            generation: slot.generation,
        })
    }

    /// Place and initialize an outstanding agent, making it active.
    pub fn activate(
        &mut self,
        id: AgentId,
        position: Vec3,
        target: Option<TargetRef>,
        elite: bool,
    ) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        if slot.state != SlotState::Outstanding {
            return false;
        }
        slot.agent.initialize(position, target, elite, slot.origin);
        slot.state = SlotState::Active;
        self.active += 1;
        true
    }

    /// Deactivate an agent and queue it for reuse. Idempotent: returns
    /// `false` if the id is stale or the agent was already released.
    pub fn release(&mut self, id: AgentId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        let was_active = match slot.state {
            SlotState::Active => true,
            SlotState::Outstanding => false,
            SlotState::Pooled | SlotState::Retired => return false,
        };

        slot.agent.deactivate();
        slot.generation = slot.generation.wrapping_add(1);
        // Cleared before queueing so a second release has nothing to return.
        let home = slot.agent.take_pool_slot().or(slot.origin);
        slot.state = if home.is_some() {
            SlotState::Pooled
        } else {
            SlotState::Retired
        };

        if was_active {
            self.active -= 1;
        }
        if let Some(pool) = home.and_then(|archetype| self.pool_mut(archetype)) {
            pool.outstanding = pool.outstanding.saturating_sub(1);
            pool.released.push(id.index);
        }
        true
    }

    /// Make slots released since the last call available to `acquire`.
    /// Called once per frame, after all spawning for the frame is done.
    pub fn recycle_released(&mut self) {
        for pool in self.pools.iter_mut().flatten() {
            pool.queue.extend(pool.released.drain(..));
        }
    }

    fn slot_mut(&mut self, id: AgentId) -> Option<&mut AgentSlot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    fn slot(&self, id: AgentId) -> Option<&AgentSlot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    /// Active agent behind `id`, if the id is current.
    pub fn get(&self, id: AgentId) -> Option<&EnemyAgent> {
        self.slot(id)
            .filter(|slot| slot.state == SlotState::Active)
            .map(|slot| &slot.agent)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut EnemyAgent> {
        self.slot_mut(id)
            .filter(|slot| slot.state == SlotState::Active)
            .map(|slot| &mut slot.agent)
    }

    pub fn is_active(&self, id: AgentId) -> bool {
        self.get(id).is_some()
    }

    pub fn state(&self, id: AgentId) -> Option<SlotState> {
        self.slot(id).map(|slot| slot.state)
    }

    /// Current id of the active agent in a slot.
    pub fn active_id_at(&self, index: u32) -> Option<AgentId> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.state == SlotState::Active)
            .map(|slot| AgentId {
                index,
                generation: slot.generation,
            })
    }

    /// Every slot's agent with its current state, including inactive ones.
    pub fn slots(&self) -> impl Iterator<Item = (u32, &EnemyAgent, SlotState)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (i as u32, &slot.agent, slot.state))
    }

    pub fn active_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == SlotState::Active)
            .map(|(i, slot)| AgentId {
                index: i as u32,
                generation: slot.generation,
            })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry(prewarm: u32) -> EnemyRegistry {
        let mut pooled = ArchetypeDef::named("grunt");
        pooled.prewarm = Some(prewarm);
        let mut unpooled = ArchetypeDef::named("boss");
        unpooled.prewarm = None;
        EnemyRegistry::from_definitions([pooled, unpooled])
    }

    const GRUNT: ArchetypeId = ArchetypeId(0);
    const BOSS: ArchetypeId = ArchetypeId(1);

    fn conserved(pools: &EnemyPools) -> usize {
        let pool = pools.pool(GRUNT).unwrap();
        pool.queued() + pool.outstanding()
    }

    #[test]
    fn prewarm_fills_queue() {
        let mut rng = StdRng::seed_from_u64(1);
        let pools = EnemyPools::new(&registry(5), &mut rng);
        let pool = pools.pool(GRUNT).unwrap();
        assert_eq!(pool.queued(), 5);
        assert_eq!(pool.created(), 5);
        assert!(pools.pool(BOSS).is_none());
        assert_eq!(pools.pooled_archetypes().collect::<Vec<_>>(), vec![GRUNT]);
    }

    #[test]
    fn acquire_grows_on_empty_queue() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pools = EnemyPools::new(&registry(1), &mut rng);

        let first = pools.acquire(GRUNT, &mut rng).unwrap();
        assert_eq!(pools.pool(GRUNT).unwrap().created(), 1);
        let second = pools.acquire(GRUNT, &mut rng).unwrap();
        assert_ne!(first.index, second.index);
        assert_eq!(pools.pool(GRUNT).unwrap().created(), 2);
        assert_eq!(pools.state(second), Some(SlotState::Outstanding));
    }

    #[test]
    fn total_only_grows_on_overflow() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pools = EnemyPools::new(&registry(3), &mut rng);
        let mut held = Vec::new();
        let mut last_total = conserved(&pools);

        // Deterministic interleaving of acquires and releases.
        for step in 0..60u32 {
            let created_before = pools.pool(GRUNT).unwrap().created();
            if step % 3 == 2 && !held.is_empty() {
                let id = held.remove((step as usize * 7) % held.len());
                assert!(pools.release(id));
            } else {
                let id = pools.acquire(GRUNT, &mut rng).unwrap();
                if step % 2 == 0 {
                    pools.activate(id, Vec3::ZERO, None, false);
                }
                held.push(id);
            }
            let total = conserved(&pools);
            let created_after = pools.pool(GRUNT).unwrap().created();
            assert!(total >= last_total);
            assert_eq!(total - last_total, created_after - created_before);
            assert_eq!(total, created_after);
            last_total = total;
        }
    }

    #[test]
    fn double_release_queues_once() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pools = EnemyPools::new(&registry(2), &mut rng);
        let id = pools.acquire(GRUNT, &mut rng).unwrap();
        assert!(pools.activate(id, Vec3::ONE, None, false));
        let before = pools.pool(GRUNT).unwrap().queued();

        assert!(pools.release(id));
        assert!(!pools.release(id));
        assert_eq!(pools.pool(GRUNT).unwrap().queued(), before + 1);
        assert_eq!(pools.active_count(), 0);
    }

    #[test]
    fn released_slot_waits_for_recycle() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut pools = EnemyPools::new(&registry(1), &mut rng);
        let first = pools.acquire(GRUNT, &mut rng).unwrap();
        pools.activate(first, Vec3::ZERO, None, false);
        assert!(pools.release(first));
        assert_eq!(pools.pool(GRUNT).unwrap().queued(), 1);
        assert_eq!(pools.pool(GRUNT).unwrap().ready(), 0);

        let second = pools.acquire(GRUNT, &mut rng).unwrap();
        assert_ne!(second.index, first.index);
        assert_eq!(pools.pool(GRUNT).unwrap().created(), 2);

        pools.recycle_released();
        assert_eq!(pools.pool(GRUNT).unwrap().ready(), 1);
        let third = pools.acquire(GRUNT, &mut rng).unwrap();
        assert_eq!(third.index, first.index);
        assert_eq!(third.generation, first.generation + 1);
    }

    #[test]
    fn stale_id_does_not_resolve_after_reuse() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pools = EnemyPools::new(&registry(1), &mut rng);
        let old = pools.acquire(GRUNT, &mut rng).unwrap();
        pools.activate(old, Vec3::ZERO, None, false);
        pools.release(old);
        pools.recycle_released();

        let new = pools.acquire(GRUNT, &mut rng).unwrap();
        pools.activate(new, Vec3::X, None, false);
        assert_eq!(old.index, new.index);
        assert!(pools.get(old).is_none());
        assert!(!pools.release(old));
        assert!(pools.is_active(new));
        assert_eq!(pools.active_id_at(new.index), Some(new));
    }

    #[test]
    fn unpooled_agents_retire_on_release() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pools = EnemyPools::new(&registry(0), &mut rng);
        assert!(pools.acquire(BOSS, &mut rng).is_none());

        let boss = pools.instantiate(BOSS, &mut rng).unwrap();
        assert!(pools.activate(boss, Vec3::ZERO, None, true));
        assert_eq!(pools.get(boss).unwrap().pool_slot(), None);
        assert!(pools.release(boss));
        assert!(!pools.release(boss));
        let retired = AgentId {
            index: boss.index,
            generation: boss.generation + 1,
        };
        assert_eq!(pools.state(retired), Some(SlotState::Retired));
    }

    #[test]
    fn activate_requires_outstanding() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pools = EnemyPools::new(&registry(1), &mut rng);
        let id = pools.acquire(GRUNT, &mut rng).unwrap();
        assert!(pools.activate(id, Vec3::ZERO, None, false));
        assert!(!pools.activate(id, Vec3::ZERO, None, false));
        assert_eq!(pools.active_count(), 1);
        assert_eq!(pools.active_ids().collect::<Vec<_>>(), vec![id]);
    }
}
