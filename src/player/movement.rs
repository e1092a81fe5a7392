//! Player mover: WASD through a swarm that slows and shoves back.
//!
//! The controller walks through enemy bodies instead of colliding with them.
//! The swarm is felt through an overlap query instead: enemies inside
//! `crowd_radius` drag on walk speed and push the player apart, and every hit
//! taken shoves the player away from whoever is crowding them.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::components::*;
use crate::combat::{Health, Weapon, WeaponCooldown};
use crate::core::{DamageEvent, GameState};
use crate::enemies::{collision_groups, EnemyBody, LayerMask, RapierSpatialQuery, SpatialQuery};

/// Set up player movement systems.
pub fn setup_movement_systems(app: &mut App) {
    app.init_resource::<PlayerConfig>().add_systems(
        Update,
        (sense_crowd, shove_on_hit, drive_player)
            .chain()
            .run_if(in_state(GameState::InGame)),
    );
}

/// Walk direction in the player's local frame, `-Z` forward.
fn wish_direction(forward: bool, back: bool, left: bool, right: bool) -> Vec3 {
    let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
    Vec3::new(axis(right, left), 0.0, axis(back, forward)).normalize_or_zero()
}

/// Find enemy bodies around the player and turn them into drag and push.
fn sense_crowd(
    config: Res<PlayerConfig>,
    rapier_context: Query<&RapierContext>,
    mut player_query: Query<(&Transform, &mut PlayerMotion), With<Player>>,
    enemy_query: Query<&GlobalTransform, With<EnemyBody>>,
) {
    let Ok((transform, mut motion)) = player_query.get_single_mut() else {
        return;
    };
    let Ok(context) = rapier_context.get_single() else {
        motion.crowd = Crowd::default();
        return;
    };

    let query = RapierSpatialQuery::new(context);
    let neighbours: Vec<Vec3> = query
        .overlap_sphere(transform.translation, config.crowd_radius, LayerMask::ENEMY)
        .into_iter()
        .filter_map(|collider| Entity::try_from_bits(collider.0).ok())
        .filter_map(|entity| enemy_query.get(entity).ok())
        .map(GlobalTransform::translation)
        .collect();

    motion.crowd = Crowd::around(transform.translation, &neighbours, config.crowd_radius);
}

fn shove_on_hit(
    config: Res<PlayerConfig>,
    mut damage_events: EventReader<DamageEvent>,
    mut player_query: Query<(Entity, &mut PlayerMotion), With<Player>>,
) {
    let Ok((player, mut motion)) = player_query.get_single_mut() else {
        return;
    };
    for event in damage_events.read() {
        if event.target == player && event.amount > 0.0 {
            motion.take_hit(&config);
        }
    }
}

/// Build this frame's translation and hand it to the character controller.
fn drive_player(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    config: Res<PlayerConfig>,
    mut player_query: Query<
        (
            &Transform,
            &mut PlayerMotion,
            &mut KinematicCharacterController,
            Option<&KinematicCharacterControllerOutput>,
        ),
        With<Player>,
    >,
) {
    let Ok((transform, mut motion, mut controller, output)) = player_query.get_single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    // Ground contact from the controller's last move; start of a run counts as grounded.
    motion.grounded = output.map_or(true, |output| output.grounded);
    motion.step_vertical(keyboard.just_pressed(KeyCode::Space), &config, dt);

    let local = wish_direction(
        keyboard.pressed(KeyCode::KeyW),
        keyboard.pressed(KeyCode::KeyS),
        keyboard.pressed(KeyCode::KeyA),
        keyboard.pressed(KeyCode::KeyD),
    );
    let yaw = transform.rotation.to_euler(EulerRot::YXZ).0;
    let walk = Quat::from_rotation_y(yaw) * local;
    let speed = if keyboard.pressed(KeyCode::ShiftLeft) {
        config.move_speed * config.sprint_multiplier
    } else {
        config.move_speed
    };

    controller.translation = Some(motion.velocity(walk, speed, &config) * dt);
    motion.decay_shove(&config, dt);
}

/// Spawn the player body with its camera.
pub fn spawn_player(commands: &mut Commands, position: Vec3) -> Entity {
    let player = commands
        .spawn((
            Player,
            SpawnPoint(position),
            PlayerMotion::default(),
            Health::new(100.0),
            Weapon::default(),
            WeaponCooldown::default(),
            Transform::from_translation(position),
            Visibility::default(),
            RigidBody::KinematicPositionBased,
            Collider::capsule_y(0.5, 0.3),
            collision_groups(LayerMask::PLAYER),
            KinematicCharacterController {
                offset: CharacterLength::Absolute(0.01),
                autostep: Some(CharacterAutostep {
                    max_height: CharacterLength::Absolute(0.4),
                    min_width: CharacterLength::Absolute(0.3),
                    include_dynamic_bodies: false,
                }),
                snap_to_ground: Some(CharacterLength::Absolute(0.5)),
                // Enemies are felt through `sense_crowd`, not as walls.
                filter_groups: Some(CollisionGroups::new(
                    LayerMask::PLAYER.into(),
                    LayerMask::WORLD.into(),
                )),
                ..default()
            },
        ))
        .id();

    super::camera::attach_camera(commands, player);
    player
}
