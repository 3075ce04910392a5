//! Spawners and the projectile factory: the owners of per-instance lifecycle
//! bindings.
//!
//! A binding is recorded when an instance is handed out and removed before
//! its outcome is honoured, so a second report for the same instance is
//! ignored.

use std::collections::BTreeSet;

use cannon_defence_core::{
    CannonHandle, EnemyHandle, EnemyKind, Event, ProjectileHandle, SpawnerId, Vec3,
};
use cannon_defence_system_economy::Ledger;
use tracing::debug;

use crate::{
    cannon::FireOrder,
    enemy::EnemyOutcome,
    projectile::ProjectileOutcome,
    registry::{EnemyRegistry, ProjectileRegistry},
};

/// Fixed location that emits enemies toward the base.
#[derive(Clone, Debug)]
pub struct Spawner {
    id: SpawnerId,
    position: Vec3,
    bound: BTreeSet<EnemyHandle>,
}

impl Spawner {
    /// Creates a spawner at `position`.
    #[must_use]
    pub fn new(id: SpawnerId, position: Vec3) -> Self {
        Self {
            id,
            position,
            bound: BTreeSet::new(),
        }
    }

    /// Acquires an enemy of `kind` at the spawner and sends it toward
    /// `destination`.
    pub fn spawn(
        &mut self,
        kind: EnemyKind,
        destination: Vec3,
        registry: &mut EnemyRegistry,
        out: &mut Vec<Event>,
    ) -> Option<EnemyHandle> {
        let handle = registry.acquire(kind, self.position, None)?;
        if let Some(enemy) = registry.get_mut(handle) {
            enemy.initialize(destination);
        }
        let _ = self.bound.insert(handle);
        debug!(spawner = self.id.get(), ?kind, "enemy spawned");
        out.push(Event::EnemySpawned {
            enemy: handle,
            spawner: self.id,
        });
        Some(handle)
    }

    /// Honours the terminal outcome of an enemy this spawner emitted.
    ///
    /// Deaths award the enemy's reward. Returns `false` when the handle is
    /// not bound to this spawner.
    pub fn resolve(
        &mut self,
        handle: EnemyHandle,
        outcome: EnemyOutcome,
        registry: &mut EnemyRegistry,
        ledger: &mut Ledger,
        out: &mut Vec<Event>,
    ) -> bool {
        if !self.bound.remove(&handle) {
            return false;
        }
        if let EnemyOutcome::Died { reward } = outcome {
            out.push(Event::EnemyKilled {
                enemy: handle,
                reward,
            });
            ledger.add(reward, out);
        }
        let _ = registry.release(handle, out);
        true
    }

    /// Drops every binding without touching the enemies.
    pub fn unbind_all(&mut self) {
        self.bound.clear();
    }

    /// Reports whether `handle` is bound to this spawner.
    #[must_use]
    pub fn is_bound(&self, handle: EnemyHandle) -> bool {
        self.bound.contains(&handle)
    }

    /// Identifier of the spawner.
    #[must_use]
    pub fn id(&self) -> SpawnerId {
        self.id
    }

    /// World position enemies are emitted at.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }
}

/// Launches projectiles for fire orders and retires them on resolution.
#[derive(Clone, Debug, Default)]
pub struct ProjectileFactory {
    bound: BTreeSet<ProjectileHandle>,
}

impl ProjectileFactory {
    /// Creates a factory with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires and launches the projectile requested by `order`.
    pub fn create(
        &mut self,
        order: FireOrder,
        cannon: CannonHandle,
        registry: &mut ProjectileRegistry,
        out: &mut Vec<Event>,
    ) -> Option<ProjectileHandle> {
        let handle = registry.acquire(order.projectile, order.origin, None)?;
        if let Some(projectile) = registry.get_mut(handle) {
            projectile.launch(order.origin, order.target);
        }
        let _ = self.bound.insert(handle);
        out.push(Event::ProjectileFired {
            projectile: handle,
            cannon,
        });
        Some(handle)
    }

    /// Retires a resolved projectile. Returns `false` for unbound handles.
    pub fn resolve(
        &mut self,
        handle: ProjectileHandle,
        outcome: ProjectileOutcome,
        registry: &mut ProjectileRegistry,
        out: &mut Vec<Event>,
    ) -> bool {
        if !self.bound.remove(&handle) {
            return false;
        }
        let impact = match outcome {
            ProjectileOutcome::Impact { enemy } => Some(enemy),
            ProjectileOutcome::Expired => None,
        };
        out.push(Event::ProjectileResolved {
            projectile: handle,
            impact,
        });
        let _ = registry.release(handle);
        true
    }

    /// Drops every binding without touching the projectiles.
    pub fn unbind_all(&mut self) {
        self.bound.clear();
    }

    /// Number of projectiles currently bound.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }
}

#[cfg(test)]
mod tests {
    use cannon_defence_core::{ConfigDatabase, EnemyConfig, NodeId};

    use super::*;

    fn registry() -> EnemyRegistry {
        let database = ConfigDatabase::build(vec![EnemyConfig {
            kind: EnemyKind::Big,
            template: "golem".to_owned(),
            hp: 10.0,
            speed: 1.0,
            reward: 12,
            hit_damage: 3,
            hit_radius: 0.8,
            death_delay_secs: 0.9,
        }])
        .unwrap();
        EnemyRegistry::from_database(&database, 1, NodeId::new(0))
    }

    #[test]
    fn spawn_initialises_enemy_at_spawner() {
        let mut registry = registry();
        let mut spawner = Spawner::new(SpawnerId::new(1), Vec3::new(5.0, 0.0, 0.0));
        let mut events = Vec::new();

        let handle = spawner
            .spawn(EnemyKind::Big, Vec3::ZERO, &mut registry, &mut events)
            .unwrap();

        assert!(spawner.is_bound(handle));
        assert!(registry.get(handle).unwrap().is_alive());
        assert_eq!(
            registry.placement(handle).map(|placement| placement.position),
            Some(Vec3::new(5.0, 0.0, 0.0))
        );
        assert_eq!(
            events,
            vec![Event::EnemySpawned {
                enemy: handle,
                spawner: SpawnerId::new(1),
            }]
        );
    }

    #[test]
    fn death_awards_reward_once() {
        let mut registry = registry();
        let mut ledger = Ledger::new(0);
        let mut spawner = Spawner::new(SpawnerId::new(0), Vec3::ZERO);
        let mut events = Vec::new();
        let handle = spawner
            .spawn(EnemyKind::Big, Vec3::X, &mut registry, &mut events)
            .unwrap();
        events.clear();

        let outcome = EnemyOutcome::Died { reward: 12 };
        assert!(spawner.resolve(handle, outcome, &mut registry, &mut ledger, &mut events));
        assert!(!spawner.resolve(handle, outcome, &mut registry, &mut ledger, &mut events));

        assert_eq!(ledger.balance(), 12);
        assert_eq!(
            events,
            vec![
                Event::EnemyKilled {
                    enemy: handle,
                    reward: 12,
                },
                Event::CoinsChanged { balance: 12 },
                Event::NoActiveEnemies,
            ]
        );
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn arrival_releases_without_reward() {
        let mut registry = registry();
        let mut ledger = Ledger::new(0);
        let mut spawner = Spawner::new(SpawnerId::new(0), Vec3::ZERO);
        let mut events = Vec::new();
        let handle = spawner
            .spawn(EnemyKind::Big, Vec3::X, &mut registry, &mut events)
            .unwrap();

        assert!(spawner.resolve(
            handle,
            EnemyOutcome::ReachedBase { hit_damage: 3 },
            &mut registry,
            &mut ledger,
            &mut events,
        ));

        assert_eq!(ledger.balance(), 0);
        assert!(!registry.contains(handle));
    }

    #[test]
    fn unknown_kind_spawns_nothing() {
        let mut registry = registry();
        let mut spawner = Spawner::new(SpawnerId::new(0), Vec3::ZERO);
        let mut events = Vec::new();

        assert_eq!(
            spawner.spawn(EnemyKind::Normal, Vec3::X, &mut registry, &mut events),
            None
        );
        assert!(events.is_empty());
    }
}
