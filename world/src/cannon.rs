//! Cannon runtime state: preview mode, target tracking, aiming and firing.

use cannon_defence_core::{CannonConfig, EnemyHandle, EnemyView, ProjectileKind, Vec3};
use cannon_defence_pool::Spawnable;
use cannon_defence_system_targeting::TargetResolver;
use glam::Quat;

const TURN_RATE: f32 = 10.0;

/// Operating mode of a cannon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CannonMode {
    /// Follows the pointer while the player chooses a spot. Never fires.
    Preview,
    /// Placed on the field. Tracks and fires at enemies.
    Active,
}

/// Request to launch a projectile, produced when a cannon's fire timer elapses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireOrder {
    /// Projectile kind to launch.
    pub projectile: ProjectileKind,
    /// Muzzle position the projectile starts from.
    pub origin: Vec3,
    /// Position of the targeted enemy at the moment of firing.
    pub target: Vec3,
}

/// Pooled cannon instance.
#[derive(Clone, Debug)]
pub struct Cannon {
    config: CannonConfig,
    mode: CannonMode,
    target: Option<EnemyHandle>,
    fire_timer: f32,
    rotation: Quat,
}

impl Cannon {
    /// Puts the cannon into preview mode and forgets any target.
    pub fn prepare_preview(&mut self) {
        self.mode = CannonMode::Preview;
        self.target = None;
        self.fire_timer = 0.0;
        self.rotation = Quat::IDENTITY;
    }

    /// Switches a preview into active mode. Returns `false` if already active.
    pub fn activate(&mut self) -> bool {
        if self.mode == CannonMode::Active {
            return false;
        }
        self.mode = CannonMode::Active;
        true
    }

    /// Advances the cannon by `dt` seconds while standing at `position`.
    ///
    /// The current target is kept until it dies or leaves the field; only then
    /// is a new one resolved. Returns a [`FireOrder`] when the fire interval
    /// elapsed and a target exists.
    pub fn update(
        &mut self,
        position: Vec3,
        dt: f32,
        enemies: &EnemyView,
        resolver: &TargetResolver,
    ) -> Option<FireOrder> {
        if self.mode != CannonMode::Active {
            return None;
        }

        self.fire_timer += dt;
        self.target = resolver.retain_or_resolve(self.target, position, self.config.range, enemies);
        let target = enemies.get(self.target?)?;

        let heading = Vec3::new(target.position.x - position.x, 0.0, target.position.z - position.z);
        if heading.length_squared() > f32::EPSILON {
            let desired = Quat::from_rotation_y(heading.x.atan2(heading.z));
            self.rotation = self.rotation.slerp(desired, (dt * TURN_RATE).min(1.0));
        }

        if self.fire_timer < self.config.fire_interval_secs() {
            return None;
        }
        self.fire_timer = 0.0;
        Some(FireOrder {
            projectile: self.config.projectile,
            origin: position + Vec3::Y * self.config.muzzle_height,
            target: target.position,
        })
    }

    /// Current operating mode.
    #[must_use]
    pub fn mode(&self) -> CannonMode {
        self.mode
    }

    /// Enemy currently tracked.
    #[must_use]
    pub fn target(&self) -> Option<EnemyHandle> {
        self.target
    }

    /// Current yaw of the barrel.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Record the cannon was instantiated from.
    #[must_use]
    pub fn config(&self) -> &CannonConfig {
        &self.config
    }
}

impl Spawnable for Cannon {
    type Template = CannonConfig;

    fn instantiate(template: &CannonConfig) -> Self {
        Self {
            config: template.clone(),
            mode: CannonMode::Preview,
            target: None,
            fire_timer: 0.0,
            rotation: Quat::IDENTITY,
        }
    }

    fn on_release(&mut self) {
        self.prepare_preview();
    }
}

#[cfg(test)]
mod tests {
    use cannon_defence_core::{CannonKind, EnemyKind, EnemySnapshot, InstanceId};

    use super::*;

    fn cannon() -> Cannon {
        Cannon::instantiate(&CannonConfig {
            kind: CannonKind::Normal,
            template: "cannon".to_owned(),
            projectile: ProjectileKind::Normal,
            cost: 50,
            fire_rate: 2.0,
            range: 5.0,
            muzzle_height: 1.0,
        })
    }

    fn view_with(x: f32, alive: bool) -> (EnemyHandle, EnemyView) {
        let handle = EnemyHandle::new(EnemyKind::Normal, InstanceId::new(0, 0));
        let view = EnemyView::from_snapshots(vec![EnemySnapshot {
            handle,
            position: Vec3::new(x, 0.0, 0.0),
            radius: 0.5,
            alive,
        }]);
        (handle, view)
    }

    #[test]
    fn preview_never_fires() {
        let mut cannon = cannon();
        let (_, view) = view_with(1.0, true);

        assert_eq!(cannon.update(Vec3::ZERO, 10.0, &view, &TargetResolver::new()), None);
        assert_eq!(cannon.target(), None);
    }

    #[test]
    fn activation_is_one_shot() {
        let mut cannon = cannon();
        assert!(cannon.activate());
        assert!(!cannon.activate());
        assert_eq!(cannon.mode(), CannonMode::Active);
    }

    #[test]
    fn fires_once_per_interval_at_target() {
        let mut cannon = cannon();
        assert!(cannon.activate());
        let (handle, view) = view_with(3.0, true);
        let resolver = TargetResolver::new();

        assert_eq!(cannon.update(Vec3::ZERO, 0.25, &view, &resolver), None);
        assert_eq!(cannon.target(), Some(handle));
        let order = cannon.update(Vec3::ZERO, 0.25, &view, &resolver);

        assert_eq!(
            order,
            Some(FireOrder {
                projectile: ProjectileKind::Normal,
                origin: Vec3::Y,
                target: Vec3::new(3.0, 0.0, 0.0),
            })
        );
        assert_eq!(cannon.update(Vec3::ZERO, 0.25, &view, &resolver), None);
    }

    #[test]
    fn timer_accumulates_without_target() {
        let mut cannon = cannon();
        assert!(cannon.activate());
        let resolver = TargetResolver::new();

        assert_eq!(cannon.update(Vec3::ZERO, 1.0, &EnemyView::default(), &resolver), None);

        let (_, view) = view_with(3.0, true);
        assert!(cannon.update(Vec3::ZERO, 0.0, &view, &resolver).is_some());
    }

    #[test]
    fn dead_target_is_dropped() {
        let mut cannon = cannon();
        assert!(cannon.activate());
        let resolver = TargetResolver::new();
        let (handle, view) = view_with(3.0, true);
        let _ = cannon.update(Vec3::ZERO, 0.1, &view, &resolver);
        assert_eq!(cannon.target(), Some(handle));

        let (_, dead) = view_with(3.0, false);
        assert_eq!(cannon.update(Vec3::ZERO, 1.0, &dead, &resolver), None);
        assert_eq!(cannon.target(), None);
    }

    #[test]
    fn barrel_turns_toward_target() {
        let mut cannon = cannon();
        assert!(cannon.activate());
        let (_, view) = view_with(3.0, true);

        let _ = cannon.update(Vec3::ZERO, 1.0, &view, &TargetResolver::new());

        let facing = cannon.rotation() * Vec3::Z;
        assert!((facing - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn release_restores_preview() {
        let mut cannon = cannon();
        assert!(cannon.activate());
        cannon.on_release();
        assert_eq!(cannon.mode(), CannonMode::Preview);
    }
}
