//! Combat systems - shooting, damage handling, deaths.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::components::*;
use crate::core::{DamageEvent, DeathEvent, EnemyHitEvent, EnemyKilledEvent, GameState};
use crate::enemies::{EnemyBody, LayerMask};
use crate::player::{Player, PlayerCamera};

/// System set ordering for combat.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CombatSet {
    Input,
    Damage,
}

/// Configure combat systems.
pub fn setup_combat_systems(app: &mut App) {
    app
        .init_resource::<RunStats>()

        .configure_sets(
            Update,
            (CombatSet::Input, CombatSet::Damage)
                .chain()
                .run_if(in_state(GameState::InGame)),
        )
        .add_systems(
            Update,
            (update_cooldowns, fire_weapon).chain().in_set(CombatSet::Input),
        )
        .add_systems(
            Update,
            (apply_damage, check_deaths, tally_kills)
                .chain()
                .in_set(CombatSet::Damage),
        )
        .add_systems(OnExit(GameState::GameOver), reset_run_stats);
}

fn update_cooldowns(time: Res<Time>, mut query: Query<&mut WeaponCooldown>) {
    for mut cooldown in query.iter_mut() {
        cooldown.tick(time.delta_secs());
    }
}

/// Hold left click to fire along the camera's view ray.
fn fire_weapon(
    mouse: Res<ButtonInput<MouseButton>>,
    mut player_query: Query<(Entity, &Weapon, &mut WeaponCooldown), With<Player>>,
    camera_query: Query<&GlobalTransform, With<PlayerCamera>>,
    enemy_query: Query<(), With<EnemyBody>>,
    rapier_context: Query<&RapierContext>,
    mut hit_events: EventWriter<EnemyHitEvent>,
) {
    if !mouse.pressed(MouseButton::Left) {
        return;
    }
    let Ok((player_entity, weapon, mut cooldown)) = player_query.get_single_mut() else {
        return;
    };
    let Ok(camera) = camera_query.get_single() else {
        return;
    };
    let Ok(context) = rapier_context.get_single() else {
        return;
    };
    if !cooldown.try_fire(weapon) {
        return;
    }

    let origin = camera.translation();
    let direction = camera.forward().as_vec3();
    let filter = QueryFilter::default()
        .exclude_collider(player_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            LayerMask::WORLD.union(LayerMask::ENEMY).into(),
        ));

    let Some((hit_entity, _)) = context.cast_ray(origin, direction, weapon.range, true, filter)
    else {
        return;
    };
    if enemy_query.get(hit_entity).is_err() {
        return;
    }

    let push = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero() * weapon.knockback;
    hit_events.send(EnemyHitEvent {
        entity: hit_entity,
        damage: weapon.damage,
        knockback: push,
    });
}

/// Apply damage to entities.
fn apply_damage(
    mut damage_events: EventReader<DamageEvent>,
    mut health_query: Query<&mut Health>,
    mut death_events: EventWriter<DeathEvent>,
) {
    for event in damage_events.read() {
        let Ok(mut health) = health_query.get_mut(event.target) else {
            continue;
        };
        // Already dead from an earlier hit
        if health.is_dead() {
            continue;
        }

        health.take_damage(event.amount);
        if health.is_dead() {
            death_events.send(DeathEvent {
                entity: event.target,
            });
        }
    }
}

/// End the run when the player dies.
fn check_deaths(
    mut death_events: EventReader<DeathEvent>,
    player_query: Query<Entity, With<Player>>,
    stats: Res<RunStats>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for event in death_events.read() {
        if player_query.get(event.entity).is_ok() {
            info!(
                "Player died after {} kills ({} elite, {} xp). Press R to restart.",
                stats.kills, stats.elite_kills, stats.experience
            );
            next_state.set(GameState::GameOver);
        }
    }
}

fn tally_kills(mut kill_events: EventReader<EnemyKilledEvent>, mut stats: ResMut<RunStats>) {
    for kill in kill_events.read() {
        stats.record_kill(kill.elite, kill.xp_orbs, kill.xp_per_orb);
    }
}

fn reset_run_stats(mut stats: ResMut<RunStats>) {
    *stats = RunStats::default();
}
