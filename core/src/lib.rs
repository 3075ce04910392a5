#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Cannon Defence simulation.
//!
//! This crate defines the message surface that connects the host runtime, the
//! authoritative world, and the pure systems. Hosts submit [`Command`] values
//! describing desired mutations, the level executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing every
//! lifecycle transition that occurred. Systems consume immutable views such as
//! [`EnemyView`] and respond with new command batches.

use std::time::Duration;

pub use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{
    BaseConfig, CannonConfig, Category, ConfigDatabase, ConfigError, ConfigSet, EnemyConfig,
    KindConfig, LevelConfig, PoolSizes, ProjectileConfig, SpawnGroup, WaveDefinition,
};

/// Commands that express all permissible level mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a spawner emit a new enemy of the provided kind.
    SpawnEnemy {
        /// Variant of enemy to spawn.
        kind: EnemyKind,
        /// Spawner responsible for creating the enemy.
        spawner: SpawnerId,
    },
    /// Requests a placement preview for the provided cannon kind.
    SelectCannon {
        /// Variant of cannon the player wants to place.
        kind: CannonKind,
    },
    /// Moves the current placement preview to follow the pointer.
    HoverPlacement {
        /// Pointer coordinate resolved against the placement surface.
        input: PlacementInput,
    },
    /// Finalises the current placement preview at the provided location.
    ConfirmPlacement {
        /// Pointer coordinate resolved against the placement surface.
        input: PlacementInput,
    },
    /// Discards the current placement preview, if any.
    ClearPreview,
    /// Restores the level to its initial state and restarts from the first wave.
    Retry,
}

/// Events broadcast by the level after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports the coin balance after any ledger mutation.
    CoinsChanged {
        /// Balance held by the ledger after the mutation.
        balance: u32,
    },
    /// Announces that the pre-wave countdown entered a new phase.
    CountdownAdvanced {
        /// Zero-based index of the wave the countdown announces.
        wave: u32,
        /// Phase that became visible.
        phase: CountdownPhase,
    },
    /// Announces that the pre-wave countdown completed.
    CountdownFinished {
        /// Zero-based index of the wave the countdown announced.
        wave: u32,
    },
    /// Confirms that the scheduler began dispatching a wave.
    WaveStarted {
        /// Zero-based index of the wave that started.
        wave: u32,
    },
    /// Reports that the scheduler dispatched every enemy of a wave.
    WaveExhausted {
        /// Zero-based index of the exhausted wave.
        wave: u32,
    },
    /// Confirms that an enemy was activated by a spawner.
    EnemySpawned {
        /// Handle assigned to the spawned enemy.
        enemy: EnemyHandle,
        /// Spawner that emitted the enemy.
        spawner: SpawnerId,
    },
    /// Reports that an enemy finished its death sequence.
    EnemyKilled {
        /// Handle of the enemy that died.
        enemy: EnemyHandle,
        /// Coins awarded for the kill.
        reward: u32,
    },
    /// Reports that an enemy reached the base.
    EnemyReachedBase {
        /// Handle of the enemy that arrived.
        enemy: EnemyHandle,
        /// Hit points removed from the base by the arrival.
        damage: u32,
    },
    /// Reports that the enemy registry's active set became empty.
    NoActiveEnemies,
    /// Reports the base state after an accepted hit.
    BaseDamaged {
        /// Remaining base hit points.
        hp: u32,
        /// Damage tier derived from the remaining hit points.
        tier: DamageTier,
    },
    /// Reports that the base ran out of hit points.
    BaseDestroyed,
    /// Confirms that a cannon launched a projectile.
    ProjectileFired {
        /// Handle assigned to the launched projectile.
        projectile: ProjectileHandle,
        /// Cannon that fired the projectile.
        cannon: CannonHandle,
    },
    /// Reports that a projectile reached its terminal state.
    ProjectileResolved {
        /// Handle of the resolved projectile.
        projectile: ProjectileHandle,
        /// Enemy struck by the projectile, or `None` when its lifetime expired.
        impact: Option<EnemyHandle>,
    },
    /// Confirms that a placement preview was created.
    PreviewCreated {
        /// Handle of the preview cannon.
        cannon: CannonHandle,
    },
    /// Confirms that a cannon was placed and activated.
    CannonPlaced {
        /// Handle of the placed cannon.
        cannon: CannonHandle,
        /// World position the cannon was placed at.
        position: Vec3,
    },
    /// Reports that the placement preview was placed or discarded.
    PlacementReleased,
    /// Reports that a placement request was rejected.
    PlacementRejected {
        /// Cannon kind involved in the request, when known.
        kind: Option<CannonKind>,
        /// Specific reason the request failed.
        reason: PlacementRejection,
    },
    /// Announces that every wave was cleared.
    LevelWon,
    /// Announces that the base was destroyed.
    LevelLost,
    /// Confirms that the level was restored to its initial state.
    LevelReset,
}

/// Enemy variants available to wave definitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Baseline enemy.
    Normal,
    /// Slow, durable enemy.
    Big,
}

/// Cannon variants the player may place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CannonKind {
    /// Cannon firing plain damaging projectiles.
    Normal,
    /// Cannon firing projectiles that slow their target.
    Freeze,
}

/// Projectile variants launched by cannons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Projectile that only deals damage.
    Normal,
    /// Projectile that deals damage and applies a slow.
    Freeze,
}

/// Generational identifier of a pooled instance.
///
/// Slots are reused after release; the generation is bumped on every release
/// so that stale identifiers never alias the next occupant of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    slot: u32,
    generation: u32,
}

impl InstanceId {
    /// Creates a new identifier for the provided slot and generation.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Index of the pool slot holding the instance.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot when the identifier was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Typed reference to a pooled instance of a particular variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle<K> {
    kind: K,
    instance: InstanceId,
}

impl<K: Copy> Handle<K> {
    /// Creates a handle pointing at the provided instance of `kind`.
    #[must_use]
    pub const fn new(kind: K, instance: InstanceId) -> Self {
        Self { kind, instance }
    }

    /// Variant recorded for the referenced instance.
    #[must_use]
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Pool identifier of the referenced instance.
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}

/// Handle referencing a pooled enemy.
pub type EnemyHandle = Handle<EnemyKind>;
/// Handle referencing a pooled cannon.
pub type CannonHandle = Handle<CannonKind>;
/// Handle referencing a pooled projectile.
pub type ProjectileHandle = Handle<ProjectileKind>;

/// Opaque identifier of a host scene node used as an instance parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an enemy spawner, equal to its index in the level layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnerId(u32);

impl SpawnerId {
    /// Creates a new spawner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Damage tiers of the base, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DamageTier {
    /// More than half of the hit points remain.
    Intact,
    /// Between a fifth and a half of the hit points remain.
    Damaged,
    /// A fifth of the hit points or fewer remain.
    Critical,
}

impl DamageTier {
    /// Derives the tier for `hp` remaining out of `max_hp`.
    ///
    /// A ratio above 0.5 is [`DamageTier::Intact`], a ratio in (0.2, 0.5] is
    /// [`DamageTier::Damaged`] and anything at or below 0.2 is
    /// [`DamageTier::Critical`]. The comparison is carried out in integers so
    /// the boundaries are exact.
    #[must_use]
    pub fn for_hp(hp: u32, max_hp: u32) -> Self {
        let hp = u64::from(hp);
        let max_hp = u64::from(max_hp);
        if hp * 5 <= max_hp {
            Self::Critical
        } else if hp * 2 <= max_hp {
            Self::Damaged
        } else {
            Self::Intact
        }
    }
}

/// Phases of the pre-wave countdown banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CountdownPhase {
    /// Shows the number of the upcoming wave.
    Wave,
    /// Shows "READY".
    Ready,
    /// Shows "SET".
    Set,
    /// Shows "GO".
    Go,
}

/// Surface classification reported by the host for a pointer coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Walkable surface tagged as accepting cannons.
    Placeable,
    /// Obstacle that blocks placement.
    Obstacle,
    /// The pointer did not resolve to any surface.
    Missed,
}

/// Pointer coordinate resolved against the placement surface mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementInput {
    /// World position under the pointer.
    pub position: Vec3,
    /// Indicates whether the pointer currently hovers a UI element.
    pub over_ui: bool,
    /// Surface the pointer resolved to.
    pub surface: Surface,
}

impl PlacementInput {
    /// Creates an input over a placeable surface outside of any UI element.
    #[must_use]
    pub const fn placeable(position: Vec3) -> Self {
        Self {
            position,
            over_ui: false,
            surface: Surface::Placeable,
        }
    }

    /// Reports whether the input may position or place a cannon.
    #[must_use]
    pub fn accepts_placement(&self) -> bool {
        !self.over_ui && self.surface == Surface::Placeable
    }
}

/// Reasons a placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementRejection {
    /// The ledger cannot cover the cannon's cost.
    InsufficientFunds,
    /// No preview exists to confirm.
    NoPreview,
    /// The pointer hovers a UI element.
    OverUi,
    /// The pointer does not resolve to a placeable surface.
    NotPlaceable,
    /// The cannon kind is missing from the configuration database.
    UnknownKind,
    /// The cannon pool could not provide an instance.
    Unavailable,
    /// Placement is disabled in the current level phase.
    InvalidPhase,
}

/// Immutable representation of a single enemy used for targeting queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle referencing the enemy.
    pub handle: EnemyHandle,
    /// World position of the enemy.
    pub position: Vec3,
    /// Radius used for projectile overlap tests.
    pub radius: f32,
    /// Indicates whether the enemy still has hit points and is not dying.
    pub alive: bool,
}

/// Read-only snapshot of the active enemies in registry order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new view from snapshots listed in registry order.
    ///
    /// The order is preserved because nearest-target tie-breaking favours
    /// the first enemy encountered.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<EnemySnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for `handle`.
    #[must_use]
    pub fn get(&self, handle: EnemyHandle) -> Option<&EnemySnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.handle == handle)
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_tier_boundaries_match_ratio_table() {
        assert_eq!(DamageTier::for_hp(10, 10), DamageTier::Intact);
        assert_eq!(DamageTier::for_hp(6, 10), DamageTier::Intact);
        assert_eq!(DamageTier::for_hp(5, 10), DamageTier::Damaged);
        assert_eq!(DamageTier::for_hp(3, 10), DamageTier::Damaged);
        assert_eq!(DamageTier::for_hp(2, 10), DamageTier::Critical);
        assert_eq!(DamageTier::for_hp(0, 10), DamageTier::Critical);
    }

    #[test]
    fn damage_tiers_order_by_severity() {
        assert!(DamageTier::Intact < DamageTier::Damaged);
        assert!(DamageTier::Damaged < DamageTier::Critical);
    }

    #[test]
    fn handles_with_different_generations_differ() {
        let first = EnemyHandle::new(EnemyKind::Normal, InstanceId::new(3, 0));
        let reused = EnemyHandle::new(EnemyKind::Normal, InstanceId::new(3, 1));
        assert_ne!(first, reused);
        assert_eq!(first.instance().slot(), reused.instance().slot());
    }

    #[test]
    fn placement_input_requires_placeable_surface_outside_ui() {
        let position = Vec3::new(1.0, 0.0, 2.0);
        assert!(PlacementInput::placeable(position).accepts_placement());

        let over_ui = PlacementInput {
            over_ui: true,
            ..PlacementInput::placeable(position)
        };
        assert!(!over_ui.accepts_placement());

        let obstacle = PlacementInput {
            surface: Surface::Obstacle,
            ..PlacementInput::placeable(position)
        };
        assert!(!obstacle.accepts_placement());
    }

    #[test]
    fn enemy_view_preserves_registry_order() {
        let first = EnemyHandle::new(EnemyKind::Big, InstanceId::new(0, 0));
        let second = EnemyHandle::new(EnemyKind::Normal, InstanceId::new(0, 0));
        let view = EnemyView::from_snapshots(vec![
            EnemySnapshot {
                handle: first,
                position: Vec3::ZERO,
                radius: 0.5,
                alive: true,
            },
            EnemySnapshot {
                handle: second,
                position: Vec3::X,
                radius: 0.5,
                alive: false,
            },
        ]);

        let order: Vec<_> = view.iter().map(|snapshot| snapshot.handle).collect();
        assert_eq!(order, vec![first, second]);
        assert_eq!(view.get(second).map(|snapshot| snapshot.alive), Some(false));
        assert_eq!(view.len(), 2);
    }
}
