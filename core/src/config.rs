//! Immutable configuration records and the keyed databases built from them.

use std::{collections::BTreeMap, fmt, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CannonKind, EnemyKind, ProjectileKind};

/// Entity categories that own a configuration database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Enemy records keyed by [`EnemyKind`].
    Enemy,
    /// Cannon records keyed by [`CannonKind`].
    Cannon,
    /// Projectile records keyed by [`ProjectileKind`].
    Projectile,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enemy => "enemy",
            Self::Cannon => "cannon",
            Self::Projectile => "projectile",
        };
        f.write_str(label)
    }
}

/// Errors raised while building or querying configuration databases.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two records declared the same kind.
    #[error("duplicate {category} config for kind `{kind}`")]
    DuplicateKind {
        /// Category of the offending database.
        category: Category,
        /// Debug rendering of the duplicated kind.
        kind: String,
    },
    /// A lookup referenced a kind that no record declares.
    #[error("no {category} config registered for kind `{kind}`")]
    UnknownKind {
        /// Category of the queried database.
        category: Category,
        /// Debug rendering of the missing kind.
        kind: String,
    },
}

/// Configuration record keyed by a kind tag.
pub trait KindConfig {
    /// Kind tag that identifies the record.
    type Kind: Copy + Ord + fmt::Debug;

    /// Category the record belongs to.
    const CATEGORY: Category;

    /// Kind declared by the record.
    fn kind(&self) -> Self::Kind;
}

/// Keyed collection of configuration records, built once and never mutated.
#[derive(Clone, Debug)]
pub struct ConfigDatabase<C: KindConfig> {
    records: BTreeMap<C::Kind, C>,
}

impl<C: KindConfig> ConfigDatabase<C> {
    /// Builds the database, rejecting records that share a kind.
    pub fn build(records: Vec<C>) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for record in records {
            let kind = record.kind();
            if map.insert(kind, record).is_some() {
                return Err(ConfigError::DuplicateKind {
                    category: C::CATEGORY,
                    kind: format!("{kind:?}"),
                });
            }
        }
        Ok(Self { records: map })
    }

    /// Retrieves the record declared for `kind`.
    pub fn get(&self, kind: C::Kind) -> Result<&C, ConfigError> {
        self.records
            .get(&kind)
            .ok_or_else(|| ConfigError::UnknownKind {
                category: C::CATEGORY,
                kind: format!("{kind:?}"),
            })
    }

    /// Reports whether a record exists for `kind`.
    #[must_use]
    pub fn contains(&self, kind: C::Kind) -> bool {
        self.records.contains_key(&kind)
    }

    /// Iterator over the records in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.records.values()
    }

    /// Number of records in the database.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Reports whether the database holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The three databases a level draws its entities from.
#[derive(Clone, Debug)]
pub struct ConfigSet {
    enemies: ConfigDatabase<EnemyConfig>,
    cannons: ConfigDatabase<CannonConfig>,
    projectiles: ConfigDatabase<ProjectileConfig>,
}

impl ConfigSet {
    /// Builds every database and checks that cannons reference known projectiles.
    pub fn build(
        enemies: Vec<EnemyConfig>,
        cannons: Vec<CannonConfig>,
        projectiles: Vec<ProjectileConfig>,
    ) -> Result<Self, ConfigError> {
        let enemies = ConfigDatabase::build(enemies)?;
        let cannons = ConfigDatabase::build(cannons)?;
        let projectiles = ConfigDatabase::build(projectiles)?;
        for cannon in cannons.iter() {
            let _ = projectiles.get(cannon.projectile)?;
        }
        Ok(Self {
            enemies,
            cannons,
            projectiles,
        })
    }

    /// Enemy records.
    #[must_use]
    pub fn enemies(&self) -> &ConfigDatabase<EnemyConfig> {
        &self.enemies
    }

    /// Cannon records.
    #[must_use]
    pub fn cannons(&self) -> &ConfigDatabase<CannonConfig> {
        &self.cannons
    }

    /// Projectile records.
    #[must_use]
    pub fn projectiles(&self) -> &ConfigDatabase<ProjectileConfig> {
        &self.projectiles
    }
}

/// Tunables of an enemy kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyConfig {
    /// Kind the record describes.
    pub kind: EnemyKind,
    /// Host instantiation template used to materialise the enemy.
    pub template: String,
    /// Hit points on spawn.
    pub hp: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Coins awarded when the enemy dies.
    pub reward: u32,
    /// Base hit points removed when the enemy arrives.
    pub hit_damage: u32,
    /// Radius used for projectile overlap tests.
    #[serde(default = "default_hit_radius")]
    pub hit_radius: f32,
    /// Seconds between reaching zero hit points and returning to the pool.
    #[serde(default = "default_death_delay_secs")]
    pub death_delay_secs: f32,
}

impl KindConfig for EnemyConfig {
    type Kind = EnemyKind;
    const CATEGORY: Category = Category::Enemy;

    fn kind(&self) -> EnemyKind {
        self.kind
    }
}

/// Tunables of a cannon kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CannonConfig {
    /// Kind the record describes.
    pub kind: CannonKind,
    /// Host instantiation template used to materialise the cannon.
    pub template: String,
    /// Projectile kind the cannon fires.
    pub projectile: ProjectileKind,
    /// Coins required to place the cannon.
    pub cost: u32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Exclusive targeting radius in world units.
    pub range: f32,
    /// Height of the muzzle above the cannon's origin.
    #[serde(default = "default_muzzle_height")]
    pub muzzle_height: f32,
}

impl CannonConfig {
    /// Seconds between consecutive shots.
    #[must_use]
    pub fn fire_interval_secs(&self) -> f32 {
        if self.fire_rate > 0.0 {
            1.0 / self.fire_rate
        } else {
            f32::INFINITY
        }
    }
}

impl KindConfig for CannonConfig {
    type Kind = CannonKind;
    const CATEGORY: Category = Category::Cannon;

    fn kind(&self) -> CannonKind {
        self.kind
    }
}

/// Tunables of a projectile kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileConfig {
    /// Kind the record describes.
    pub kind: ProjectileKind,
    /// Host instantiation template used to materialise the projectile.
    pub template: String,
    /// Hit points removed from the struck enemy.
    pub damage: f32,
    /// Flight speed in world units per second.
    pub speed: f32,
    /// Multiplier applied to enemy speed while the slow lasts.
    #[serde(default)]
    pub slow_factor: f32,
    /// Seconds the slow effect lasts.
    #[serde(default)]
    pub slow_duration_secs: f32,
    /// Seconds of flight before the projectile expires.
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: f32,
    /// Radius used for enemy overlap tests.
    #[serde(default = "default_projectile_radius")]
    pub radius: f32,
}

impl ProjectileConfig {
    /// Reports whether the projectile applies a slow on impact.
    #[must_use]
    pub fn is_freeze(&self) -> bool {
        self.slow_factor > 0.0 && self.slow_duration_secs > 0.0
    }
}

impl KindConfig for ProjectileConfig {
    type Kind = ProjectileKind;
    const CATEGORY: Category = Category::Projectile;

    fn kind(&self) -> ProjectileKind {
        self.kind
    }
}

/// Number of enemies of a kind included in a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Enemy kind to spawn.
    pub kind: EnemyKind,
    /// Number of enemies of the kind.
    pub count: u32,
}

/// Ordered content of a single wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Groups flattened into the wave's spawn bag.
    pub groups: Vec<SpawnGroup>,
    /// Seconds between consecutive spawns.
    #[serde(default = "default_spawn_interval_secs")]
    pub spawn_interval_secs: f32,
}

impl WaveDefinition {
    /// Delay between consecutive spawns.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.spawn_interval_secs).unwrap_or(Duration::ZERO)
    }

    /// Total number of enemies the wave dispatches.
    #[must_use]
    pub fn total_spawns(&self) -> u32 {
        self.groups.iter().map(|group| group.count).sum()
    }
}

/// Placement and durability of the defended base.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Hit points on level start.
    #[serde(default = "default_base_hp")]
    pub max_hp: u32,
    /// World position enemies march toward.
    pub position: Vec3,
    /// Distance at which an enemy counts as arrived.
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: f32,
}

/// Number of instances prewarmed per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSizes {
    /// Prewarmed enemies per kind.
    pub enemy: usize,
    /// Prewarmed cannons per kind.
    pub cannon: usize,
    /// Prewarmed projectiles per kind.
    pub projectile: usize,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            enemy: 10,
            cannon: 10,
            projectile: 50,
        }
    }
}

/// Complete description of a playable level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Coins held when the level starts or resets.
    pub start_coins: u32,
    /// Seed for the wave scheduler's random draws.
    #[serde(default)]
    pub rng_seed: u64,
    /// Returns every cannon to its pool after each cleared wave.
    #[serde(default)]
    pub remove_cannons_when_wave_finish: bool,
    /// Restores the starting balance after each cleared wave.
    #[serde(default)]
    pub reset_coins_when_wave_finish: bool,
    /// Seconds each countdown phase stays visible.
    #[serde(default = "default_countdown_step_secs")]
    pub countdown_step_secs: f32,
    /// Prewarm sizes of the entity pools.
    #[serde(default)]
    pub pool: PoolSizes,
    /// Defended base.
    pub base: BaseConfig,
    /// Spawner positions, indexed by spawner identifier.
    pub spawners: Vec<Vec3>,
    /// Waves in play order.
    pub waves: Vec<WaveDefinition>,
    /// Enemy records.
    pub enemies: Vec<EnemyConfig>,
    /// Cannon records.
    pub cannons: Vec<CannonConfig>,
    /// Projectile records.
    pub projectiles: Vec<ProjectileConfig>,
}

impl LevelConfig {
    /// Delay between countdown phases.
    #[must_use]
    pub fn countdown_step(&self) -> Duration {
        Duration::try_from_secs_f32(self.countdown_step_secs).unwrap_or(Duration::ZERO)
    }
}

fn default_hit_radius() -> f32 {
    0.5
}

fn default_death_delay_secs() -> f32 {
    0.9
}

fn default_muzzle_height() -> f32 {
    1.0
}

fn default_lifetime_secs() -> f32 {
    5.0
}

fn default_projectile_radius() -> f32 {
    0.25
}

fn default_spawn_interval_secs() -> f32 {
    0.5
}

fn default_base_hp() -> u32 {
    10
}

fn default_arrival_radius() -> f32 {
    1.0
}

fn default_countdown_step_secs() -> f32 {
    1.0
}
