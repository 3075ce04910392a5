#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Cannon Defence.
//!
//! The world owns the pooled enemies, cannons and projectiles, the spawners
//! that emit enemies, and the base they march toward. [`World::step`] advances
//! every entity by one frame in a fixed order: enemies move and resolve their
//! arrivals and deaths, cannons re-target and fire, then projectiles fly and
//! resolve their impacts.

mod base;
mod cannon;
mod enemy;
mod projectile;
mod registry;
mod spawner;

use std::{sync::Arc, time::Duration};

use cannon_defence_core::{
    BaseConfig, ConfigSet, EnemyHandle, EnemyKind, Event, NodeId, PoolSizes, SpawnerId, Vec3,
};
use cannon_defence_system_economy::Ledger;
use cannon_defence_system_targeting::TargetResolver;
use tracing::{debug, warn};

pub use base::Base;
pub use cannon::{Cannon, CannonMode, FireOrder};
pub use enemy::{Enemy, EnemyOutcome, EnemyState};
pub use projectile::{Projectile, ProjectileOutcome, ProjectilePayload, ProjectileState, SlowEffect};
pub use registry::{CannonRegistry, EnemyRegistry, KindOf, ProjectileRegistry, Registry, Release};
pub use spawner::{ProjectileFactory, Spawner};

/// Scene node dormant enemies are parked under.
pub const ENEMY_POOL_ROOT: NodeId = NodeId::new(1);
/// Scene node dormant cannons are parked under.
pub const CANNON_POOL_ROOT: NodeId = NodeId::new(2);
/// Scene node dormant projectiles are parked under.
pub const PROJECTILE_POOL_ROOT: NodeId = NodeId::new(3);

/// Represents the authoritative Cannon Defence world state.
#[derive(Debug)]
pub struct World {
    configs: Arc<ConfigSet>,
    enemies: EnemyRegistry,
    cannons: CannonRegistry,
    projectiles: ProjectileRegistry,
    spawners: Vec<Spawner>,
    factory: ProjectileFactory,
    base: Base,
    resolver: TargetResolver,
}

impl World {
    /// Builds the registries, spawners and base for a level.
    #[must_use]
    pub fn new(
        configs: Arc<ConfigSet>,
        base: &BaseConfig,
        spawners: &[Vec3],
        pool: PoolSizes,
    ) -> Self {
        let enemies = EnemyRegistry::from_database(configs.enemies(), pool.enemy, ENEMY_POOL_ROOT);
        let cannons = CannonRegistry::from_database(configs.cannons(), pool.cannon, CANNON_POOL_ROOT);
        let projectiles = ProjectileRegistry::from_database(
            configs.projectiles(),
            pool.projectile,
            PROJECTILE_POOL_ROOT,
        );
        let spawners = spawners
            .iter()
            .enumerate()
            .map(|(index, position)| {
                let id = SpawnerId::new(u32::try_from(index).unwrap_or(u32::MAX));
                Spawner::new(id, *position)
            })
            .collect();

        Self {
            configs,
            enemies,
            cannons,
            projectiles,
            spawners,
            factory: ProjectileFactory::new(),
            base: Base::new(base),
            resolver: TargetResolver::new(),
        }
    }

    /// Emits an enemy of `kind` from spawner `id`, aimed at the base.
    pub fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        id: SpawnerId,
        out: &mut Vec<Event>,
    ) -> Option<EnemyHandle> {
        let destination = self.base.position();
        let Some(spawner) = self.spawners.get_mut(id.get() as usize) else {
            warn!(spawner = id.get(), "spawn requested from unknown spawner");
            return None;
        };
        spawner.spawn(kind, destination, &mut self.enemies, out)
    }

    /// Advances every entity by `dt`.
    ///
    /// Rewards for enemies whose death sequence finished are credited to
    /// `ledger`.
    pub fn step(&mut self, dt: Duration, ledger: &mut Ledger, out: &mut Vec<Event>) {
        let dt = dt.as_secs_f32();
        self.step_enemies(dt, ledger, out);
        self.step_cannons(dt, out);
        self.step_projectiles(dt, out);
    }

    fn step_enemies(&mut self, dt: f32, ledger: &mut Ledger, out: &mut Vec<Event>) {
        let mut outcomes = Vec::new();
        for handle in self.enemies.active().to_vec() {
            let Some((enemy, placement)) = self.enemies.entity_mut(handle) else {
                continue;
            };
            let mut outcome = enemy.advance(&mut placement.position, dt);
            if outcome.is_none() && self.base.contains(placement.position) {
                outcome = enemy.arrive();
            }
            if let Some(outcome) = outcome {
                outcomes.push((handle, outcome));
            }
        }

        for (handle, outcome) in outcomes {
            if let EnemyOutcome::ReachedBase { hit_damage } = outcome {
                out.push(Event::EnemyReachedBase {
                    enemy: handle,
                    damage: hit_damage,
                });
                let _ = self.base.receive_hit(hit_damage, out);
            }

            let Some(spawner) = self
                .spawners
                .iter_mut()
                .find(|spawner| spawner.is_bound(handle))
            else {
                debug!(?handle, "ignoring outcome of unbound enemy");
                continue;
            };
            let _ = spawner.resolve(handle, outcome, &mut self.enemies, ledger, out);
        }
    }

    fn step_cannons(&mut self, dt: f32, out: &mut Vec<Event>) {
        let view = self.enemies.view();
        for handle in self.cannons.active().to_vec() {
            let Some((cannon, placement)) = self.cannons.entity_mut(handle) else {
                continue;
            };
            let Some(order) = cannon.update(placement.position, dt, &view, &self.resolver) else {
                continue;
            };
            let _ = self
                .factory
                .create(order, handle, &mut self.projectiles, out);
        }
    }

    fn step_projectiles(&mut self, dt: f32, out: &mut Vec<Event>) {
        let mut view = self.enemies.view();
        for handle in self.projectiles.active().to_vec() {
            let Some((projectile, placement)) = self.projectiles.entity_mut(handle) else {
                continue;
            };
            let Some(outcome) = projectile.advance(&mut placement.position, dt, &view) else {
                continue;
            };
            let payload = projectile.payload();

            if let ProjectileOutcome::Impact { enemy } = outcome {
                if let Some(target) = self.enemies.get_mut(enemy) {
                    if target.receive_hit(&payload) {
                        debug!(?enemy, "projectile started death sequence");
                    }
                }
                view = self.enemies.view();
            }
            let _ = self
                .factory
                .resolve(handle, outcome, &mut self.projectiles, out);
        }
    }

    /// Returns every enemy to its pool without notifications.
    pub fn release_all_enemies(&mut self) -> usize {
        for spawner in &mut self.spawners {
            spawner.unbind_all();
        }
        self.enemies.release_all()
    }

    /// Returns every cannon to its pool.
    pub fn release_all_cannons(&mut self) -> usize {
        self.cannons.release_all()
    }

    /// Returns every projectile to its pool.
    pub fn release_all_projectiles(&mut self) -> usize {
        self.factory.unbind_all();
        self.projectiles.release_all()
    }

    /// Destroys every pool. The world cannot spawn anything afterwards.
    pub fn teardown(&mut self) {
        for spawner in &mut self.spawners {
            spawner.unbind_all();
        }
        self.factory.unbind_all();
        self.enemies.teardown();
        self.cannons.teardown();
        self.projectiles.teardown();
    }

    /// Configuration databases the world was built from.
    #[must_use]
    pub fn configs(&self) -> &Arc<ConfigSet> {
        &self.configs
    }

    /// Enemy registry.
    #[must_use]
    pub fn enemies(&self) -> &EnemyRegistry {
        &self.enemies
    }

    /// Mutable enemy registry.
    pub fn enemies_mut(&mut self) -> &mut EnemyRegistry {
        &mut self.enemies
    }

    /// Cannon registry.
    #[must_use]
    pub fn cannons(&self) -> &CannonRegistry {
        &self.cannons
    }

    /// Mutable cannon registry.
    pub fn cannons_mut(&mut self) -> &mut CannonRegistry {
        &mut self.cannons
    }

    /// Projectile registry.
    #[must_use]
    pub fn projectiles(&self) -> &ProjectileRegistry {
        &self.projectiles
    }

    /// Spawners in identifier order.
    #[must_use]
    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    /// Defended base.
    #[must_use]
    pub fn base(&self) -> &Base {
        &self.base
    }

    /// Mutable defended base.
    pub fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}
