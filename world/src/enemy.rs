//! Enemy runtime state: movement, slows, damage and the death sequence.

use cannon_defence_core::{EnemyConfig, Vec3};
use cannon_defence_pool::Spawnable;
use tracing::debug;

use crate::projectile::ProjectilePayload;

/// Lifecycle states of a pooled enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EnemyState {
    /// Parked in its pool.
    Dormant,
    /// Marching toward the base.
    Alive,
    /// Out of hit points and playing its death sequence.
    Dying {
        /// Seconds left before the enemy reports its death.
        remaining: f32,
    },
    /// Death sequence finished.
    Dead,
    /// Arrived at the base.
    ReachedBase,
}

/// Terminal outcome reported exactly once per spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyOutcome {
    /// The death sequence finished.
    Died {
        /// Coins owed to the player.
        reward: u32,
    },
    /// The enemy arrived at the base.
    ReachedBase {
        /// Base hit points the arrival removes.
        hit_damage: u32,
    },
}

/// Pooled enemy instance.
#[derive(Clone, Debug)]
pub struct Enemy {
    config: EnemyConfig,
    hp: f32,
    speed: f32,
    slow_remaining: f32,
    destination: Vec3,
    state: EnemyState,
}

impl Enemy {
    /// Restores full health and sends the enemy toward `destination`.
    pub fn initialize(&mut self, destination: Vec3) {
        self.hp = self.config.hp;
        self.speed = self.config.speed;
        self.slow_remaining = 0.0;
        self.destination = destination;
        self.state = EnemyState::Alive;
    }

    /// Reports whether the enemy still has hit points and is not dying.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0 && self.state == EnemyState::Alive
    }

    /// Removes `amount` hit points.
    ///
    /// Returns `true` when the hit started the death sequence. Damage dealt to
    /// an enemy that is not alive changes nothing.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= amount;
        if self.hp > 0.0 {
            return false;
        }
        self.state = EnemyState::Dying {
            remaining: self.config.death_delay_secs,
        };
        debug!(kind = ?self.config.kind, "enemy dying");
        true
    }

    /// Multiplies speed by `factor` for `duration_secs`, replacing any active slow.
    pub fn apply_slow(&mut self, factor: f32, duration_secs: f32) {
        if !self.is_alive() {
            return;
        }
        self.speed = self.config.speed * factor.clamp(0.0, 1.0);
        self.slow_remaining = duration_secs;
    }

    /// Applies a projectile impact. Returns `true` when the death sequence began.
    pub fn receive_hit(&mut self, payload: &ProjectilePayload) -> bool {
        let killed = self.take_damage(payload.damage);
        if let Some(slow) = payload.slow {
            if self.is_alive() {
                self.apply_slow(slow.factor, slow.duration_secs);
            }
        }
        killed
    }

    /// Advances movement or the death sequence by `dt` seconds.
    pub fn advance(&mut self, position: &mut Vec3, dt: f32) -> Option<EnemyOutcome> {
        match self.state {
            EnemyState::Alive => {
                *position = move_towards(*position, self.destination, self.speed * dt);
                if self.slow_remaining > 0.0 {
                    self.slow_remaining -= dt;
                    if self.slow_remaining <= 0.0 {
                        self.slow_remaining = 0.0;
                        self.speed = self.config.speed;
                    }
                }
                None
            }
            EnemyState::Dying { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = EnemyState::Dying { remaining };
                    return None;
                }
                self.state = EnemyState::Dead;
                Some(EnemyOutcome::Died {
                    reward: self.config.reward,
                })
            }
            EnemyState::Dormant | EnemyState::Dead | EnemyState::ReachedBase => None,
        }
    }

    /// Marks the enemy as arrived. Only a live enemy can arrive.
    pub fn arrive(&mut self) -> Option<EnemyOutcome> {
        if !self.is_alive() {
            return None;
        }
        self.state = EnemyState::ReachedBase;
        Some(EnemyOutcome::ReachedBase {
            hit_damage: self.config.hit_damage,
        })
    }

    /// Remaining hit points.
    #[must_use]
    pub fn hp(&self) -> f32 {
        self.hp
    }

    /// Current movement speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EnemyState {
        self.state
    }

    /// Record the enemy was instantiated from.
    #[must_use]
    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }
}

impl Spawnable for Enemy {
    type Template = EnemyConfig;

    fn instantiate(template: &EnemyConfig) -> Self {
        Self {
            config: template.clone(),
            hp: template.hp,
            speed: template.speed,
            slow_remaining: 0.0,
            destination: Vec3::ZERO,
            state: EnemyState::Dormant,
        }
    }

    fn on_release(&mut self) {
        self.state = EnemyState::Dormant;
        self.slow_remaining = 0.0;
        self.speed = self.config.speed;
    }
}

fn move_towards(current: Vec3, target: Vec3, max_step: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_step
    }
}
