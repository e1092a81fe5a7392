//! UI plugin - HUD and state overlays.

use bevy::prelude::*;

use super::hud;
use crate::core::GameState;

/// UI plugin - handles all user interface.
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        hud::setup_hud_systems(app);

        app
            .add_systems(OnEnter(GameState::Paused), setup_pause_overlay)
            .add_systems(OnExit(GameState::Paused), cleanup_overlay)
            .add_systems(OnEnter(GameState::GameOver), setup_game_over)
            .add_systems(OnExit(GameState::GameOver), cleanup_overlay);
    }
}

/// Marker for full-screen overlay entities.
#[derive(Component)]
struct Overlay;

fn setup_pause_overlay(commands: Commands) {
    spawn_overlay(
        commands,
        "PAUSED",
        "Escape to resume",
        Color::srgba(0.0, 0.0, 0.0, 0.7),
        Color::srgb(0.8, 0.8, 0.85),
    );
}

fn setup_game_over(commands: Commands) {
    spawn_overlay(
        commands,
        "OVERRUN",
        "Press R to try again",
        Color::srgba(0.1, 0.0, 0.0, 0.85),
        Color::srgb(0.8, 0.2, 0.2),
    );
}

fn spawn_overlay(
    mut commands: Commands,
    title: &str,
    hint: &str,
    background: Color,
    title_color: Color,
) {
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                position_type: PositionType::Absolute,
                ..default()
            },
            BackgroundColor(background),
            Overlay,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(title),
                TextFont {
                    font_size: 64.0,
                    ..default()
                },
                TextColor(title_color),
                Node {
                    margin: UiRect::bottom(Val::Px(30.0)),
                    ..default()
                },
            ));
            parent.spawn((
                Text::new(hint),
                TextFont {
                    font_size: 22.0,
                    ..default()
                },
                TextColor(Color::srgb(0.6, 0.6, 0.65)),
            ));
        });
}

fn cleanup_overlay(mut commands: Commands, query: Query<Entity, With<Overlay>>) {
    for entity in query.iter() {
        commands.entity(entity).despawn_recursive();
    }
}
