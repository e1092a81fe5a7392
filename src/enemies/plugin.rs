//! Enemy plugin - registers all enemy systems.

use bevy::prelude::*;

use super::data::{load_enemy_definitions, EnemyRegistry};
use super::simulation::EnemySimulation;
use super::systems::*;
use crate::core::GameState;

/// Enemy plugin - archetype loading, the population simulation, and its bodies.
pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<EnemyRegistry>()
            .add_systems(Startup, load_enemy_definitions)
            // Build once per run; coming back from pause keeps the population
            .add_systems(
                OnEnter(GameState::InGame),
                setup_enemy_simulation.run_if(not(resource_exists::<EnemySimulation>)),
            )
            .add_systems(OnExit(GameState::GameOver), teardown_enemy_simulation)
            .add_systems(
                Update,
                (
                    sync_agents_from_bodies,
                    apply_enemy_hits,
                    run_enemy_simulation,
                    bind_enemy_bodies,
                    write_agent_bodies,
                )
                    .chain()
                    .run_if(in_state(GameState::InGame))
                    .run_if(resource_exists::<EnemySimulation>),
            );
    }
}
