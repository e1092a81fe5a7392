//! Enemy archetype definitions loaded from RON files.

use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::error::DataLoadError;
use super::query::LayerMask;
use super::shooter::ShooterConfig;

const ARCHETYPES_DIR: &str = "assets/data/enemies/archetypes";

/// Index of an archetype inside the [`EnemyRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(pub u16);

/// Capsule dimensions. Agent positions are measured at the feet.
#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct BodyConfig {
    pub height: f32,
    pub radius: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            height: 2.0,
            radius: 0.5,
        }
    }
}

impl BodyConfig {
    pub fn chest_height(&self) -> f32 {
        self.height * 0.5
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct LocomotionConfig {
    pub move_speed: f32,
    /// Rotation smoothing rate (per second) toward the walking direction.
    pub turn_speed: f32,
    /// Downward acceleration, negative.
    pub gravity: f32,
    /// Constant downward bias while standing on ground.
    pub grounded_gravity: f32,
    pub terminal_fall_speed: f32,
    /// Agents below this height despawn themselves.
    pub world_floor: f32,
    pub knockback_damping: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            turn_speed: 10.0,
            gravity: -25.0,
            grounded_gravity: -2.0,
            terminal_fall_speed: 50.0,
            world_floor: -50.0,
            knockback_damping: 10.0,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct ClimbConfig {
    /// Forward probe length at chest height.
    pub check_distance: f32,
    pub climb_speed: f32,
    /// Fraction of gravity still applied while climbing.
    pub gravity_scale: f32,
    pub max_height: f32,
    /// Seconds of blocked progress before a climb is attempted.
    pub blocked_time: f32,
    /// Forward speed (units/sec) below which the agent counts as blocked.
    pub min_forward_speed: f32,
    pub obstacle_mask: LayerMask,
    pub ground_mask: LayerMask,
}

impl Default for ClimbConfig {
    fn default() -> Self {
        Self {
            check_distance: 0.6,
            climb_speed: 5.0,
            gravity_scale: 0.1,
            max_height: 8.0,
            blocked_time: 1.5,
            min_forward_speed: 0.5,
            obstacle_mask: LayerMask::WORLD,
            ground_mask: LayerMask::WORLD,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct ContactConfig {
    pub damage: f32,
    pub interval: f32,
    pub radius: f32,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            damage: 10.0,
            interval: 0.5,
            radius: 1.2,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct HealthConfig {
    pub max_health: f32,
    pub xp_orbs_min: u32,
    pub xp_orbs_max: u32,
    pub xp_per_orb: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            xp_orbs_min: 2,
            xp_orbs_max: 5,
            xp_per_orb: 2,
        }
    }
}

/// Stat multipliers applied to elite spawns.
#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct EliteConfig {
    pub health_multiplier: f32,
    pub damage_multiplier: f32,
    pub scale_multiplier: f32,
}

impl Default for EliteConfig {
    fn default() -> Self {
        Self {
            health_multiplier: 3.0,
            damage_multiplier: 1.5,
            scale_multiplier: 1.25,
        }
    }
}

/// Enemy archetype loaded from RON file.
#[derive(Deserialize, Clone, Debug)]
pub struct ArchetypeDef {
    pub name: String,
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Instances created up front. `None` means the archetype is not pooled
    /// and is only ever instantiated directly by scripted waves.
    #[serde(default)]
    pub prewarm: Option<u32>,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub locomotion: LocomotionConfig,
    #[serde(default)]
    pub climb: ClimbConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub elite: EliteConfig,
    #[serde(default)]
    pub shooter: Option<ShooterConfig>,
}

fn default_scale() -> f32 {
    1.0
}

impl ArchetypeDef {
    /// Definition with every tunable at its default, mostly for tests.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_path: None,
            scale: 1.0,
            prewarm: Some(0),
            body: BodyConfig::default(),
            locomotion: LocomotionConfig::default(),
            climb: ClimbConfig::default(),
            contact: ContactConfig::default(),
            health: HealthConfig::default(),
            elite: EliteConfig::default(),
            shooter: None,
        }
    }

    pub fn is_pooled(&self) -> bool {
        self.prewarm.is_some()
    }
}

/// Resource holding every known archetype, indexed by [`ArchetypeId`].
#[derive(Resource, Default, Clone)]
pub struct EnemyRegistry {
    definitions: Vec<Arc<ArchetypeDef>>,
    by_name: HashMap<String, ArchetypeId>,
}

impl EnemyRegistry {
    pub fn from_definitions(definitions: impl IntoIterator<Item = ArchetypeDef>) -> Self {
        let mut registry = Self::default();
        for definition in definitions {
            registry.insert(definition);
        }
        registry
    }

    /// Add a definition, replacing any previous one with the same name.
    pub fn insert(&mut self, definition: ArchetypeDef) -> ArchetypeId {
        if let Some(&id) = self.by_name.get(&definition.name) {
            self.definitions[id.0 as usize] = Arc::new(definition);
            return id;
        }
        let id = ArchetypeId(self.definitions.len() as u16);
        self.by_name.insert(definition.name.clone(), id);
        self.definitions.push(Arc::new(definition));
        id
    }

    pub fn get(&self, id: ArchetypeId) -> Option<&Arc<ArchetypeDef>> {
        self.definitions.get(id.0 as usize)
    }

    /// Get an archetype id by name.
    pub fn id_of(&self, name: &str) -> Option<ArchetypeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &Arc<ArchetypeDef>)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (ArchetypeId(i as u16), def))
    }
}

/// Parse a single archetype file.
pub fn read_archetype(path: &Path) -> Result<ArchetypeDef, DataLoadError> {
    let contents = fs::read_to_string(path).map_err(|e| DataLoadError::ReadError {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    ron::from_str::<ArchetypeDef>(&contents).map_err(|e| DataLoadError::ParseError {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}

/// Load all archetype definitions from the assets/data/enemies/archetypes/ directory.
pub fn load_enemy_definitions(mut registry: ResMut<EnemyRegistry>) {
    let dir = Path::new(ARCHETYPES_DIR);

    if !dir.exists() {
        warn!("Enemy archetype directory not found: {:?}", dir);
        return;
    }

    let Ok(entries) = fs::read_dir(dir) else {
        warn!("Failed to read enemy archetype directory");
        return;
    };

    // Ids follow file-name order so runs are reproducible.
    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    paths.sort();

    for path in paths {
        match read_archetype(&path) {
            Ok(definition) => {
                info!("Loaded enemy archetype: {}", definition.name);
                registry.insert(definition);
            }
            Err(e) => error!("{}", e),
        }
    }

    info!("Loaded {} enemy archetypes", registry.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_archetypes_parse() {
        let grunt: ArchetypeDef =
            ron::from_str(include_str!("../../assets/data/enemies/archetypes/grunt.ron"))
                .expect("grunt.ron");
        assert_eq!(grunt.name, "grunt");
        assert!(grunt.is_pooled());
        assert!(grunt.shooter.is_none());

        let gunner: ArchetypeDef =
            ron::from_str(include_str!("../../assets/data/enemies/archetypes/gunner.ron"))
                .expect("gunner.ron");
        let shooter = gunner.shooter.expect("gunner has a shooter");
        assert!(!shooter.weapons.is_empty());

        let brute: ArchetypeDef =
            ron::from_str(include_str!("../../assets/data/enemies/archetypes/brute.ron"))
                .expect("brute.ron");
        assert!(!brute.is_pooled());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let def: ArchetypeDef = ron::from_str(r#"(name: "bare", prewarm: Some(4))"#).unwrap();
        assert_eq!(def.scale, 1.0);
        assert_eq!(def.locomotion.move_speed, 3.0);
        assert_eq!(def.climb.blocked_time, 1.5);
        assert_eq!(def.contact.radius, 1.2);
    }

    #[test]
    fn registry_replaces_by_name() {
        let mut registry = EnemyRegistry::default();
        let a = registry.insert(ArchetypeDef::named("a"));
        let b = registry.insert(ArchetypeDef::named("b"));
        let mut faster = ArchetypeDef::named("a");
        faster.locomotion.move_speed = 9.0;
        let again = registry.insert(faster);

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a).unwrap().locomotion.move_speed, 9.0);
        assert_eq!(registry.id_of("b"), Some(b));
        assert_eq!(registry.id_of("c"), None);
    }
}
