#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks the nearest live enemy within a cannon's range.

use cannon_defence_core::{EnemyHandle, EnemyView, Vec3};

/// Nearest-target resolver shared by every cannon.
#[derive(Clone, Copy, Debug, Default)]
pub struct TargetResolver;

impl TargetResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the live enemy closest to `origin` that lies strictly within
    /// `max_range`.
    ///
    /// Dead or dying enemies are skipped before their distance is considered.
    /// When several enemies share the minimal distance the first one in view
    /// order wins.
    #[must_use]
    pub fn resolve(&self, origin: Vec3, max_range: f32, enemies: &EnemyView) -> Option<EnemyHandle> {
        let mut best: Option<(f32, EnemyHandle)> = None;
        for enemy in enemies.iter() {
            if !enemy.alive {
                continue;
            }
            let distance = origin.distance(enemy.position);
            if distance >= max_range {
                continue;
            }
            match best {
                Some((closest, _)) if distance >= closest => {}
                _ => best = Some((distance, enemy.handle)),
            }
        }
        best.map(|(_, handle)| handle)
    }

    /// Keeps `current` while it is still a live enemy, otherwise resolves a
    /// new target.
    ///
    /// A retained target is kept even after it leaves the firing range.
    #[must_use]
    pub fn retain_or_resolve(
        &self,
        current: Option<EnemyHandle>,
        origin: Vec3,
        max_range: f32,
        enemies: &EnemyView,
    ) -> Option<EnemyHandle> {
        let retained = current.filter(|handle| {
            enemies
                .get(*handle)
                .map_or(false, |snapshot| snapshot.alive)
        });
        retained.or_else(|| self.resolve(origin, max_range, enemies))
    }
}

#[cfg(test)]
mod tests {
    use cannon_defence_core::{EnemyKind, EnemySnapshot, InstanceId};

    use super::*;

    fn enemy(slot: u32, position: Vec3, alive: bool) -> EnemySnapshot {
        EnemySnapshot {
            handle: EnemyHandle::new(EnemyKind::Normal, InstanceId::new(slot, 0)),
            position,
            radius: 0.5,
            alive,
        }
    }

    #[test]
    fn picks_nearest_enemy_inside_range() {
        let view = EnemyView::from_snapshots(vec![
            enemy(0, Vec3::new(4.0, 0.0, 0.0), true),
            enemy(1, Vec3::new(2.0, 0.0, 0.0), true),
            enemy(2, Vec3::new(9.0, 0.0, 0.0), true),
        ]);

        let target = TargetResolver::new().resolve(Vec3::ZERO, 5.0, &view);

        assert_eq!(target, Some(view.iter().nth(1).unwrap().handle));
    }

    #[test]
    fn range_boundary_is_exclusive() {
        let view = EnemyView::from_snapshots(vec![enemy(0, Vec3::new(5.0, 0.0, 0.0), true)]);
        assert_eq!(TargetResolver::new().resolve(Vec3::ZERO, 5.0, &view), None);
    }

    #[test]
    fn dead_enemies_are_never_selected() {
        let view = EnemyView::from_snapshots(vec![
            enemy(0, Vec3::new(1.0, 0.0, 0.0), false),
            enemy(1, Vec3::new(3.0, 0.0, 0.0), true),
        ]);

        let target = TargetResolver::new().resolve(Vec3::ZERO, 5.0, &view);

        assert_eq!(target, Some(view.iter().nth(1).unwrap().handle));
    }

    #[test]
    fn ties_favour_first_in_view_order() {
        let view = EnemyView::from_snapshots(vec![
            enemy(7, Vec3::new(0.0, 0.0, 2.0), true),
            enemy(3, Vec3::new(2.0, 0.0, 0.0), true),
        ]);

        let target = TargetResolver::new().resolve(Vec3::ZERO, 5.0, &view);

        assert_eq!(target, Some(view.iter().next().unwrap().handle));
    }

    #[test]
    fn retained_target_survives_leaving_range() {
        let far = enemy(0, Vec3::new(20.0, 0.0, 0.0), true);
        let near = enemy(1, Vec3::new(1.0, 0.0, 0.0), true);
        let view = EnemyView::from_snapshots(vec![far, near]);

        let target =
            TargetResolver::new().retain_or_resolve(Some(far.handle), Vec3::ZERO, 5.0, &view);

        assert_eq!(target, Some(far.handle));
    }

    #[test]
    fn dead_or_released_target_is_replaced() {
        let dying = enemy(0, Vec3::new(1.0, 0.0, 0.0), false);
        let next = enemy(1, Vec3::new(2.0, 0.0, 0.0), true);
        let released = EnemyHandle::new(EnemyKind::Big, InstanceId::new(4, 2));
        let view = EnemyView::from_snapshots(vec![dying, next]);
        let resolver = TargetResolver::new();

        assert_eq!(
            resolver.retain_or_resolve(Some(dying.handle), Vec3::ZERO, 5.0, &view),
            Some(next.handle)
        );
        assert_eq!(
            resolver.retain_or_resolve(Some(released), Vec3::ZERO, 5.0, &view),
            Some(next.handle)
        );
    }

    #[test]
    fn empty_view_yields_no_target() {
        let view = EnemyView::default();
        assert_eq!(TargetResolver::new().resolve(Vec3::ZERO, 100.0, &view), None);
    }
}
