use cannon_defence_core::{EnemyHandle, EnemyKind, EnemySnapshot, EnemyView, InstanceId, Vec3};
use cannon_defence_system_targeting::TargetResolver;
use proptest::prelude::*;

fn snapshots() -> impl Strategy<Value = Vec<EnemySnapshot>> {
    prop::collection::vec((-20.0f32..20.0, -20.0f32..20.0, any::<bool>()), 0..24).prop_map(
        |entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(slot, (x, z, alive))| EnemySnapshot {
                    handle: EnemyHandle::new(EnemyKind::Normal, InstanceId::new(slot as u32, 0)),
                    position: Vec3::new(x, 0.0, z),
                    radius: 0.5,
                    alive,
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn resolved_target_is_live_in_range_and_minimal(
        enemies in snapshots(),
        range in 0.0f32..30.0,
    ) {
        let view = EnemyView::from_snapshots(enemies.clone());
        let resolved = TargetResolver::new().resolve(Vec3::ZERO, range, &view);

        let candidates: Vec<_> = enemies
            .iter()
            .filter(|enemy| enemy.alive && enemy.position.length() < range)
            .collect();

        match resolved {
            None => prop_assert!(candidates.is_empty()),
            Some(handle) => {
                let chosen = view.get(handle).unwrap();
                prop_assert!(chosen.alive);
                let distance = chosen.position.length();
                prop_assert!(distance < range);
                for candidate in candidates {
                    prop_assert!(distance <= candidate.position.length());
                }
            }
        }
    }
}
