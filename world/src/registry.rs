//! Per-kind pool registries for enemies, cannons and projectiles.

use std::collections::BTreeMap;

use cannon_defence_core::{
    ConfigDatabase, EnemyConfig, EnemyHandle, EnemyKind, EnemySnapshot, EnemyView, Event, Handle, KindConfig,
    NodeId, Vec3,
};
use cannon_defence_pool::{EntityPool, Placement, Spawnable};
use tracing::error;

use crate::{cannon::Cannon, enemy::Enemy, projectile::Projectile};

/// Kind tag of the configuration record a pooled entity is built from.
pub type KindOf<T> = <<T as Spawnable>::Template as KindConfig>::Kind;

/// Result of releasing a handle back to its registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Release {
    /// The handle was active and has been returned to its pool.
    pub released: bool,
    /// The release emptied the registry's active set.
    pub now_empty: bool,
}

impl Release {
    const IGNORED: Self = Self {
        released: false,
        now_empty: false,
    };
}

/// One pool per configured kind plus the active handles in acquisition order.
#[derive(Debug)]
pub struct Registry<T>
where
    T: Spawnable,
    T::Template: KindConfig,
{
    pools: BTreeMap<KindOf<T>, EntityPool<T>>,
    active: Vec<Handle<KindOf<T>>>,
}

impl<T> Registry<T>
where
    T: Spawnable,
    T::Template: KindConfig + Clone,
{
    /// Builds one pool per record in `database`, each prewarmed with
    /// `prewarm` instances parked under `root`.
    #[must_use]
    pub fn from_database(database: &ConfigDatabase<T::Template>, prewarm: usize, root: NodeId) -> Self {
        let pools = database
            .iter()
            .map(|config| (config.kind(), EntityPool::new(config.clone(), prewarm, root)))
            .collect();
        Self {
            pools,
            active: Vec::new(),
        }
    }

    /// Acquires an instance of `kind` at `position`.
    ///
    /// An unknown kind or a torn-down pool is logged at error level and yields
    /// `None`.
    pub fn acquire(
        &mut self,
        kind: KindOf<T>,
        position: Vec3,
        parent: Option<NodeId>,
    ) -> Option<Handle<KindOf<T>>> {
        let category = <T::Template as KindConfig>::CATEGORY;
        let Some(pool) = self.pools.get_mut(&kind) else {
            error!(
                %category,
                ?kind,
                "no pool registered for kind"
            );
            return None;
        };
        match pool.acquire(position, parent) {
            Ok(instance) => {
                let handle = Handle::new(kind, instance);
                self.active.push(handle);
                Some(handle)
            }
            Err(error) => {
                error!(
                    %category,
                    ?kind,
                    %error,
                    "failed to acquire pooled instance"
                );
                None
            }
        }
    }

    /// Returns `handle` to its pool. Releasing twice is a silent no-op.
    pub fn release(&mut self, handle: Handle<KindOf<T>>) -> Release {
        if !self.detach(handle) {
            return Release::IGNORED;
        }
        let now_empty = self.active.is_empty();
        Release {
            released: self.return_to_pool(handle),
            now_empty,
        }
    }

    /// Returns every active instance to its pool and reports how many were
    /// released.
    pub fn release_all(&mut self) -> usize {
        let active = std::mem::take(&mut self.active);
        active
            .into_iter()
            .filter(|handle| self.return_to_pool(*handle))
            .count()
    }

    /// Destroys every pool. Later acquisitions fail.
    pub fn teardown(&mut self) {
        self.active.clear();
        for pool in self.pools.values_mut() {
            pool.teardown();
        }
    }

    /// Immutable access to an active instance.
    #[must_use]
    pub fn get(&self, handle: Handle<KindOf<T>>) -> Option<&T> {
        self.pools.get(&handle.kind())?.get(handle.instance())
    }

    /// Mutable access to an active instance.
    pub fn get_mut(&mut self, handle: Handle<KindOf<T>>) -> Option<&mut T> {
        self.pools
            .get_mut(&handle.kind())?
            .get_mut(handle.instance())
    }

    /// Mutable access to an active instance together with its placement.
    pub fn entity_mut(&mut self, handle: Handle<KindOf<T>>) -> Option<(&mut T, &mut Placement)> {
        self.pools
            .get_mut(&handle.kind())?
            .entity_mut(handle.instance())
    }

    /// Placement of an active instance.
    #[must_use]
    pub fn placement(&self, handle: Handle<KindOf<T>>) -> Option<Placement> {
        self.pools.get(&handle.kind())?.placement(handle.instance())
    }

    /// Moves an active instance. Returns `false` for stale handles.
    pub fn set_position(&mut self, handle: Handle<KindOf<T>>, position: Vec3) -> bool {
        self.pools
            .get_mut(&handle.kind())
            .map_or(false, |pool| pool.set_position(handle.instance(), position))
    }

    /// Record the pool for `kind` instantiates from.
    #[must_use]
    pub fn template(&self, kind: KindOf<T>) -> Option<&T::Template> {
        self.pools.get(&kind).map(EntityPool::template)
    }

    /// Pool serving `kind`.
    #[must_use]
    pub fn pool(&self, kind: KindOf<T>) -> Option<&EntityPool<T>> {
        self.pools.get(&kind)
    }

    /// Active handles in acquisition order.
    #[must_use]
    pub fn active(&self) -> &[Handle<KindOf<T>>] {
        &self.active
    }

    /// Number of active instances across every kind.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Reports whether `handle` refers to an active instance.
    #[must_use]
    pub fn contains(&self, handle: Handle<KindOf<T>>) -> bool {
        self.active.contains(&handle)
    }

    fn detach(&mut self, handle: Handle<KindOf<T>>) -> bool {
        match self.active.iter().position(|active| *active == handle) {
            Some(index) => {
                let _ = self.active.remove(index);
                true
            }
            None => false,
        }
    }

    fn return_to_pool(&mut self, handle: Handle<KindOf<T>>) -> bool {
        self.pools
            .get_mut(&handle.kind())
            .map_or(false, |pool| pool.release(handle.instance()))
    }
}

/// Registry of pooled cannons.
pub type CannonRegistry = Registry<Cannon>;

/// Registry of pooled projectiles.
pub type ProjectileRegistry = Registry<Projectile>;

/// Registry of pooled enemies that reports when its active set empties.
#[derive(Debug)]
pub struct EnemyRegistry {
    inner: Registry<Enemy>,
}

impl EnemyRegistry {
    /// Builds one enemy pool per record in `database`.
    #[must_use]
    pub fn from_database(
        database: &ConfigDatabase<EnemyConfig>,
        prewarm: usize,
        root: NodeId,
    ) -> Self {
        Self {
            inner: Registry::from_database(database, prewarm, root),
        }
    }

    /// Acquires an enemy of `kind` at `position`.
    pub fn acquire(
        &mut self,
        kind: EnemyKind,
        position: Vec3,
        parent: Option<NodeId>,
    ) -> Option<EnemyHandle> {
        self.inner.acquire(kind, position, parent)
    }

    /// Returns `handle` to its pool.
    ///
    /// When the release empties the active set, [`Event::NoActiveEnemies`] is
    /// emitted before the instance goes back to its pool.
    pub fn release(&mut self, handle: EnemyHandle, out: &mut Vec<Event>) -> Release {
        if !self.inner.detach(handle) {
            return Release::IGNORED;
        }
        let now_empty = self.inner.active.is_empty();
        if now_empty {
            out.push(Event::NoActiveEnemies);
        }
        Release {
            released: self.inner.return_to_pool(handle),
            now_empty,
        }
    }

    /// Returns every active enemy to its pool without any notification.
    pub fn release_all(&mut self) -> usize {
        self.inner.release_all()
    }

    /// Destroys every enemy pool.
    pub fn teardown(&mut self) {
        self.inner.teardown();
    }

    /// Captures a targeting snapshot of the active enemies in registry order.
    #[must_use]
    pub fn view(&self) -> EnemyView {
        let snapshots = self
            .inner
            .active
            .iter()
            .filter_map(|handle| {
                let enemy = self.inner.get(*handle)?;
                let placement = self.inner.placement(*handle)?;
                Some(EnemySnapshot {
                    handle: *handle,
                    position: placement.position,
                    radius: enemy.config().hit_radius,
                    alive: enemy.is_alive(),
                })
            })
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Immutable access to an active enemy.
    #[must_use]
    pub fn get(&self, handle: EnemyHandle) -> Option<&Enemy> {
        self.inner.get(handle)
    }

    /// Mutable access to an active enemy.
    pub fn get_mut(&mut self, handle: EnemyHandle) -> Option<&mut Enemy> {
        self.inner.get_mut(handle)
    }

    /// Mutable access to an active enemy together with its placement.
    pub fn entity_mut(&mut self, handle: EnemyHandle) -> Option<(&mut Enemy, &mut Placement)> {
        self.inner.entity_mut(handle)
    }

    /// Placement of an active enemy.
    #[must_use]
    pub fn placement(&self, handle: EnemyHandle) -> Option<Placement> {
        self.inner.placement(handle)
    }

    /// Pool serving `kind`.
    #[must_use]
    pub fn pool(&self, kind: EnemyKind) -> Option<&EntityPool<Enemy>> {
        self.inner.pool(kind)
    }

    /// Active handles in acquisition order.
    #[must_use]
    pub fn active(&self) -> &[EnemyHandle] {
        self.inner.active()
    }

    /// Number of active enemies.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.active_count()
    }

    /// Reports whether `handle` refers to an active enemy.
    #[must_use]
    pub fn contains(&self, handle: EnemyHandle) -> bool {
        self.inner.contains(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> ConfigDatabase<EnemyConfig> {
        ConfigDatabase::build(vec![EnemyConfig {
            kind: EnemyKind::Normal,
            template: "slime".to_owned(),
            hp: 2.0,
            speed: 1.0,
            reward: 3,
            hit_damage: 1,
            hit_radius: 0.5,
            death_delay_secs: 0.9,
        }])
        .unwrap()
    }

    #[test]
    fn unknown_kind_yields_none() {
        let mut registry = EnemyRegistry::from_database(&database(), 2, NodeId::new(0));
        assert_eq!(registry.acquire(EnemyKind::Big, Vec3::ZERO, None), None);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn notification_precedes_return_to_pool_and_fires_once() {
        let mut registry = EnemyRegistry::from_database(&database(), 2, NodeId::new(0));
        let mut events = Vec::new();
        let first = registry.acquire(EnemyKind::Normal, Vec3::ZERO, None).unwrap();
        let second = registry.acquire(EnemyKind::Normal, Vec3::X, None).unwrap();

        let release = registry.release(first, &mut events);
        assert_eq!(
            release,
            Release {
                released: true,
                now_empty: false,
            }
        );
        assert!(events.is_empty());

        let release = registry.release(second, &mut events);
        assert!(release.now_empty);
        assert_eq!(events, vec![Event::NoActiveEnemies]);

        assert_eq!(registry.release(second, &mut events), Release::IGNORED);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn bulk_release_is_silent() {
        let mut registry = EnemyRegistry::from_database(&database(), 0, NodeId::new(0));
        for _ in 0..3 {
            let _ = registry.acquire(EnemyKind::Normal, Vec3::ZERO, None).unwrap();
        }
        assert_eq!(registry.release_all(), 3);
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.pool(EnemyKind::Normal).map(EntityPool::dormant_count), Some(3));
    }

    #[test]
    fn view_lists_enemies_in_acquisition_order() {
        let mut registry = EnemyRegistry::from_database(&database(), 2, NodeId::new(0));
        let first = registry.acquire(EnemyKind::Normal, Vec3::X, None).unwrap();
        let second = registry.acquire(EnemyKind::Normal, Vec3::Z, None).unwrap();
        registry.get_mut(first).unwrap().initialize(Vec3::ZERO);

        let view = registry.view();
        let handles: Vec<_> = view.iter().map(|snapshot| snapshot.handle).collect();
        assert_eq!(handles, vec![first, second]);
        assert_eq!(view.get(first).map(|snapshot| snapshot.alive), Some(true));
        assert_eq!(view.get(second).map(|snapshot| snapshot.alive), Some(false));
        assert_eq!(view.get(second).map(|snapshot| snapshot.position), Some(Vec3::Z));
    }

    #[test]
    fn torn_down_registry_refuses_acquisitions() {
        let mut registry = EnemyRegistry::from_database(&database(), 2, NodeId::new(0));
        let _ = registry.acquire(EnemyKind::Normal, Vec3::ZERO, None).unwrap();
        registry.teardown();
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.acquire(EnemyKind::Normal, Vec3::ZERO, None), None);
    }
}
