//! ECS side of the enemy simulation.
//!
//! Every agent slot owns one kinematic physics body. Bodies are never
//! despawned while the run lasts: inactive slots are hidden and their
//! collider disabled, mirroring how pooled instances sit in their queues.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::collections::HashMap;

use super::agent::EnemyLod;
use super::config::EnemyConfig;
use super::data::{ArchetypeDef, ArchetypeId, EnemyRegistry};
use super::pool::AgentId;
use super::query::{ColliderId, LayerMask, TargetLink, TargetRef};
use super::rapier::{collision_groups, RapierMotor, RapierSpatialQuery};
use super::simulation::EnemySimulation;
use crate::core::{DamageEvent, EnemyHitEvent, EnemyKilledEvent};
use crate::player::{Player, PLAYER_HALF_HEIGHT};

/// Physics body mirroring one agent slot.
#[derive(Component, Debug)]
pub struct EnemyBody {
    pub slot: u32,
    visual: Entity,
    /// Scenes are authored with their origin at the feet, meshes at the center.
    scene_rooted: bool,
    active: bool,
}

impl EnemyBody {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Where the visual sits relative to the capsule center. Scaling happens
    /// on the visual only, so elites grow upward from the feet.
    fn visual_offset(&self, half_height: f32, scale: f32) -> Vec3 {
        if self.scene_rooted {
            Vec3::NEG_Y * half_height
        } else {
            Vec3::Y * half_height * (scale - 1.0)
        }
    }
}

/// Rendered part of an enemy body.
#[derive(Component)]
pub struct EnemyVisual;

/// Body entity for every agent slot, indexed by slot.
#[derive(Resource, Default)]
pub struct EnemyBodies {
    entities: Vec<Entity>,
    visuals: HashMap<ArchetypeId, (Handle<Mesh>, Handle<StandardMaterial>)>,
}

impl EnemyBodies {
    pub fn get(&self, slot: u32) -> Option<Entity> {
        self.entities.get(slot as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Controller feedback going into the simulation and movement requests
/// coming out of it.
#[derive(Resource, Default)]
pub struct MotorState {
    grounded: HashMap<AgentId, bool>,
    requested: Vec<(AgentId, Vec3)>,
}

/// The player as seen by the simulation.
struct PlayerTarget {
    player: Option<(Entity, Vec3)>,
    hits: Vec<(Entity, f32)>,
}

impl PlayerTarget {
    fn new(player: Option<(Entity, Vec3)>) -> Self {
        Self {
            player,
            hits: Vec::new(),
        }
    }

    fn resolve(&self, bits: u64) -> Option<(Entity, Vec3)> {
        self.player.filter(|(entity, _)| entity.to_bits() == bits)
    }
}

impl TargetLink for PlayerTarget {
    fn find_target(&self) -> Option<TargetRef> {
        self.player.map(|(entity, _)| TargetRef(entity.to_bits()))
    }

    fn position(&self, target: TargetRef) -> Option<Vec3> {
        self.resolve(target.0).map(|(_, position)| position)
    }

    fn deal_damage(&mut self, target: TargetRef, amount: f32) {
        if let Some((entity, _)) = self.resolve(target.0) {
            self.hits.push((entity, amount));
        }
    }

    fn target_of(&self, collider: ColliderId) -> Option<TargetRef> {
        self.resolve(collider.0)
            .map(|(entity, _)| TargetRef(entity.to_bits()))
    }
}

/// Build the simulation from the loaded archetypes and config file.
pub fn setup_enemy_simulation(mut commands: Commands, registry: Res<EnemyRegistry>) {
    match EnemySimulation::new(EnemyConfig::load(), &registry) {
        Ok(simulation) => {
            commands.insert_resource(simulation);
            commands.insert_resource(EnemyBodies::default());
            commands.insert_resource(MotorState::default());
        }
        Err(e) => error!("Enemy simulation disabled: {}", e),
    }
}

/// Drop the whole population, bodies included.
pub fn teardown_enemy_simulation(
    mut commands: Commands,
    bodies: Query<Entity, With<EnemyBody>>,
) {
    for entity in bodies.iter() {
        commands.entity(entity).despawn_recursive();
    }
    commands.remove_resource::<EnemySimulation>();
    commands.remove_resource::<EnemyBodies>();
    commands.remove_resource::<MotorState>();
}

/// Read back where the character controllers actually put full-detail agents.
pub fn sync_agents_from_bodies(
    mut simulation: ResMut<EnemySimulation>,
    mut motor_state: ResMut<MotorState>,
    bodies: Query<(&EnemyBody, &Transform, Option<&KinematicCharacterControllerOutput>)>,
) {
    motor_state.grounded.clear();
    for (body, transform, output) in bodies.iter() {
        let Some(id) = simulation.pools().active_id_at(body.slot) else {
            continue;
        };
        let Some(agent) = simulation.agent_mut(id) else {
            continue;
        };
        if agent.last_lod() != Some(EnemyLod::Full) {
            continue;
        }

        let grounded = output.is_some_and(|output| output.grounded);
        let feet = transform.translation - Vec3::Y * center_height(agent.definition());
        agent.sync_body(feet, grounded);
        motor_state.grounded.insert(id, grounded);
    }
}

/// Route weapon hits on enemy bodies into the simulation.
pub fn apply_enemy_hits(
    mut simulation: ResMut<EnemySimulation>,
    mut hit_events: EventReader<EnemyHitEvent>,
    mut kill_events: EventWriter<EnemyKilledEvent>,
    bodies: Query<&EnemyBody>,
) {
    for hit in hit_events.read() {
        let Ok(body) = bodies.get(hit.entity) else {
            continue;
        };
        let Some(id) = simulation.pools().active_id_at(body.slot) else {
            continue;
        };

        simulation.apply_knockback(id, hit.knockback);
        if let Some(death) = simulation.damage(id, hit.damage) {
            debug!(
                "Enemy {:?} killed at {:?} ({} orbs)",
                death.archetype, death.position, death.xp_orbs
            );
            kill_events.send(EnemyKilledEvent {
                position: death.position,
                archetype: death.archetype,
                elite: death.elite,
                xp_orbs: death.xp_orbs,
                xp_per_orb: death.xp_per_orb,
            });
        }
    }
}

/// Advance the simulation by one frame.
pub fn run_enemy_simulation(
    time: Res<Time>,
    mut simulation: ResMut<EnemySimulation>,
    mut motor_state: ResMut<MotorState>,
    rapier_context: Query<&RapierContext>,
    player_query: Query<(Entity, &Transform), With<Player>>,
    mut damage_events: EventWriter<DamageEvent>,
) {
    let Ok(context) = rapier_context.get_single() else {
        return;
    };

    let query = RapierSpatialQuery::new(context);
    let mut motor = RapierMotor::new(std::mem::take(&mut motor_state.grounded));
    let player = player_query
        .get_single()
        .ok()
        .map(|(entity, transform)| {
            (entity, transform.translation - Vec3::Y * PLAYER_HALF_HEIGHT)
        });
    let mut targets = PlayerTarget::new(player);

    let report = simulation.update(time.delta_secs(), &query, &mut motor, &mut targets);
    motor_state.requested = motor.into_moves();

    for (target, amount) in targets.hits {
        damage_events.send(DamageEvent { target, amount });
    }
    if report.stats.despawned > 0 {
        debug!("{} enemies fell out of the world", report.stats.despawned);
    }
}

/// Spawn bodies for slots created since the last frame.
pub fn bind_enemy_bodies(
    mut commands: Commands,
    simulation: Res<EnemySimulation>,
    mut bodies: ResMut<EnemyBodies>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let pools = simulation.pools();
    let known = bodies.len();
    if known >= pools.slot_count() {
        return;
    }

    for (slot, agent, _) in pools.slots().skip(known) {
        let def = agent.definition();
        let body = def.body;
        let half = center_height(def);

        let visual = match &def.model_path {
            Some(path) => commands
                .spawn((
                    EnemyVisual,
                    SceneRoot(asset_server.load(path.clone())),
                    Transform::from_xyz(0.0, -half, 0.0),
                ))
                .id(),
            None => {
                let (mesh, material) = bodies
                    .visuals
                    .entry(agent.archetype())
                    .or_insert_with(|| {
                        (
                            meshes.add(Capsule3d::new(
                                body.radius,
                                (body.height - body.radius * 2.0).max(0.0),
                            )),
                            materials.add(StandardMaterial {
                                base_color: Color::srgb(0.55, 0.18, 0.16),
                                perceptual_roughness: 0.8,
                                ..default()
                            }),
                        )
                    })
                    .clone();
                commands
                    .spawn((EnemyVisual, Mesh3d(mesh), MeshMaterial3d(material), Transform::default()))
                    .id()
            }
        };

        let entity = commands
            .spawn((
                EnemyBody {
                    slot,
                    visual,
                    scene_rooted: def.model_path.is_some(),
                    active: false,
                },
                Transform::from_translation(agent.position() + Vec3::Y * half),
                Visibility::Hidden,
                RigidBody::KinematicPositionBased,
                Collider::capsule_y((half - body.radius).max(0.0), body.radius),
                collision_groups(LayerMask::ENEMY),
                ColliderDisabled,
                KinematicCharacterController {
                    offset: CharacterLength::Absolute(0.01),
                    autostep: Some(CharacterAutostep {
                        max_height: CharacterLength::Absolute(0.3),
                        min_width: CharacterLength::Absolute(0.2),
                        include_dynamic_bodies: false,
                    }),
                    snap_to_ground: Some(CharacterLength::Absolute(0.3)),
                    // Enemies pass through each other.
                    filter_groups: Some(CollisionGroups::new(
                        LayerMask::ENEMY.into(),
                        LayerMask::WORLD.union(LayerMask::PLAYER).into(),
                    )),
                    ..default()
                },
            ))
            .add_child(visual)
            .id();

        bodies.entities.push(entity);
    }

    debug!("Enemy bodies: {}", bodies.len());
}

/// Push agent state onto the bodies.
///
/// Agents that asked the motor to move hand the request to their character
/// controller. Everyone else is placed directly.
pub fn write_agent_bodies(
    mut commands: Commands,
    simulation: Res<EnemySimulation>,
    motor_state: Res<MotorState>,
    mut bodies: Query<(
        Entity,
        &mut EnemyBody,
        &mut Transform,
        &mut KinematicCharacterController,
        &mut Visibility,
    )>,
    mut visuals: Query<&mut Transform, (With<EnemyVisual>, Without<EnemyBody>)>,
) {
    let requested: HashMap<u32, Vec3> = motor_state
        .requested
        .iter()
        .map(|(id, delta)| (id.index, *delta))
        .collect();

    for (entity, mut body, mut transform, mut controller, mut visibility) in bodies.iter_mut() {
        let agent = simulation
            .pools()
            .active_id_at(body.slot)
            .and_then(|id| simulation.agent(id));

        let Some(agent) = agent else {
            if body.active {
                body.active = false;
                *visibility = Visibility::Hidden;
                controller.translation = None;
                commands.entity(entity).insert(ColliderDisabled);
            }
            continue;
        };

        let half = center_height(agent.definition());
        if !body.active {
            body.active = true;
            *visibility = Visibility::Inherited;
            commands.entity(entity).remove::<ColliderDisabled>();

            // Elite status is rolled per activation.
            if let Ok(mut visual) = visuals.get_mut(body.visual) {
                visual.translation = body.visual_offset(half, agent.scale());
                visual.scale = Vec3::splat(agent.scale());
            }
        }

        transform.rotation = agent.rotation();
        match requested.get(&body.slot) {
            Some(delta) => controller.translation = Some(*delta),
            None => {
                controller.translation = None;
                transform.translation = agent.position() + Vec3::Y * half;
            }
        }
    }
}

/// Height of the capsule center above the feet.
fn center_height(def: &ArchetypeDef) -> f32 {
    def.body.height * 0.5
}
