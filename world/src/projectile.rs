//! Straight-line projectiles launched by cannons.

use cannon_defence_core::{EnemyHandle, EnemyView, ProjectileConfig, Vec3};
use cannon_defence_pool::Spawnable;

/// Flight lifecycle of a pooled projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectileState {
    /// Parked in its pool.
    Dormant,
    /// Travelling along its launch direction.
    InFlight,
    /// Struck an enemy or expired; waiting to be returned to its pool.
    Resolved,
}

/// Terminal outcome of a single flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectileOutcome {
    /// The projectile overlapped a live enemy.
    Impact {
        /// Enemy that was struck.
        enemy: EnemyHandle,
    },
    /// The projectile outlived its lifetime.
    Expired,
}

/// Slow applied by freeze projectiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlowEffect {
    /// Fraction of speed removed.
    pub factor: f32,
    /// Seconds the slow lasts.
    pub duration_secs: f32,
}

/// Effect a projectile delivers on impact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectilePayload {
    /// Hit points removed from the struck enemy.
    pub damage: f32,
    /// Slow applied when the enemy survives the hit.
    pub slow: Option<SlowEffect>,
}

/// Pooled projectile instance.
#[derive(Clone, Debug)]
pub struct Projectile {
    config: ProjectileConfig,
    direction: Vec3,
    age: f32,
    state: ProjectileState,
}

impl Projectile {
    /// Starts a new flight from `origin` toward `target`.
    ///
    /// The direction is fixed for the whole flight and the lifetime restarts.
    pub fn launch(&mut self, origin: Vec3, target: Vec3) {
        self.direction = (target - origin).normalize_or_zero();
        self.age = 0.0;
        self.state = ProjectileState::InFlight;
    }

    /// Advances the flight by `dt` seconds.
    ///
    /// The first live enemy overlapping the projectile wins; otherwise the
    /// projectile expires once its lifetime has elapsed.
    pub fn advance(
        &mut self,
        position: &mut Vec3,
        dt: f32,
        enemies: &EnemyView,
    ) -> Option<ProjectileOutcome> {
        if self.state != ProjectileState::InFlight {
            return None;
        }

        self.age += dt;
        *position += self.direction * self.config.speed * dt;

        let struck = enemies.iter().find(|enemy| {
            enemy.alive && position.distance(enemy.position) <= enemy.radius + self.config.radius
        });
        if let Some(enemy) = struck {
            self.state = ProjectileState::Resolved;
            return Some(ProjectileOutcome::Impact {
                enemy: enemy.handle,
            });
        }

        if self.age >= self.config.lifetime_secs {
            self.state = ProjectileState::Resolved;
            return Some(ProjectileOutcome::Expired);
        }
        None
    }

    /// Effect delivered to the enemy the projectile strikes.
    #[must_use]
    pub fn payload(&self) -> ProjectilePayload {
        ProjectilePayload {
            damage: self.config.damage,
            slow: self.config.is_freeze().then_some(SlowEffect {
                factor: self.config.slow_factor,
                duration_secs: self.config.slow_duration_secs,
            }),
        }
    }

    /// Current flight state.
    #[must_use]
    pub fn state(&self) -> ProjectileState {
        self.state
    }

    /// Unit direction fixed at launch.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Seconds since launch.
    #[must_use]
    pub fn age(&self) -> f32 {
        self.age
    }
}

impl Spawnable for Projectile {
    type Template = ProjectileConfig;

    fn instantiate(template: &ProjectileConfig) -> Self {
        Self {
            config: template.clone(),
            direction: Vec3::ZERO,
            age: 0.0,
            state: ProjectileState::Dormant,
        }
    }

    fn on_release(&mut self) {
        self.state = ProjectileState::Dormant;
        self.age = 0.0;
    }
}
