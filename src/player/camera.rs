//! First-person camera: mouse look, cursor lock, fog.

use bevy::input::mouse::MouseMotion;
use bevy::pbr::FogFalloff;
use bevy::prelude::*;
use bevy::render::camera::ClearColorConfig;
use bevy::window::{CursorGrabMode, PrimaryWindow};

use super::components::{Player, PlayerConfig};
use crate::core::GameState;

const CLEAR_COLOR: Color = Color::srgb(0.05, 0.05, 0.07);
const EYE_HEIGHT: f32 = 0.4;
/// About 80 degrees either way.
const PITCH_LIMIT: f32 = 1.4;

/// The player's camera, a child of the player body.
#[derive(Component, Default)]
pub struct PlayerCamera {
    /// Radians, positive looks up.
    pub pitch: f32,
}

pub fn setup_camera_systems(app: &mut App) {
    app.add_systems(OnEnter(GameState::InGame), lock_cursor)
        .add_systems(OnExit(GameState::InGame), unlock_cursor)
        .add_systems(Update, mouse_look.run_if(in_state(GameState::InGame)));
}

pub(super) fn attach_camera(commands: &mut Commands, player: Entity) {
    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                clear_color: ClearColorConfig::Custom(CLEAR_COLOR),
                ..default()
            },
            // The swarm fades in from the dark past the spawn ring.
            DistanceFog {
                color: CLEAR_COLOR,
                falloff: FogFalloff::Linear {
                    start: 25.0,
                    end: 70.0,
                },
                ..default()
            },
            PlayerCamera::default(),
            Transform::from_xyz(0.0, EYE_HEIGHT, 0.0),
        ))
        .id();
    commands.entity(player).add_child(camera);
}

fn set_cursor_lock(window_query: &mut Query<&mut Window, With<PrimaryWindow>>, locked: bool) {
    let Ok(mut window) = window_query.get_single_mut() else {
        return;
    };
    window.cursor_options.grab_mode = if locked {
        CursorGrabMode::Locked
    } else {
        CursorGrabMode::None
    };
    window.cursor_options.visible = !locked;
}

fn lock_cursor(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    set_cursor_lock(&mut window_query, true);
}

fn unlock_cursor(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    set_cursor_lock(&mut window_query, false);
}

/// Pitch after applying a vertical mouse delta, clamped short of straight up or down.
fn next_pitch(pitch: f32, delta_y: f32, sensitivity: f32, invert_y: bool) -> f32 {
    let sign = if invert_y { -1.0 } else { 1.0 };
    (pitch - delta_y * sensitivity * sign).clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

/// Yaw turns the body, pitch tilts only the camera.
fn mouse_look(
    mut mouse_motion: EventReader<MouseMotion>,
    config: Res<PlayerConfig>,
    mut player_query: Query<&mut Transform, With<Player>>,
    mut camera_query: Query<(&mut Transform, &mut PlayerCamera), Without<Player>>,
) {
    let delta: Vec2 = mouse_motion.read().map(|motion| motion.delta).sum();
    if delta == Vec2::ZERO {
        return;
    }
    let Ok(mut body) = player_query.get_single_mut() else {
        return;
    };
    let Ok((mut eye, mut camera)) = camera_query.get_single_mut() else {
        return;
    };

    let sensitivity = config.mouse_sensitivity * 0.001;
    body.rotate_y(-delta.x * sensitivity);
    camera.pitch = next_pitch(camera.pitch, delta.y, sensitivity, config.invert_y);
    eye.rotation = Quat::from_rotation_x(camera.pitch);
}
