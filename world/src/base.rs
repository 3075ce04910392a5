//! The defended base.

use cannon_defence_core::{BaseConfig, DamageTier, Event, Vec3};
use tracing::{debug, info};

/// Base enemies march toward. Loses hit points when enemies arrive.
#[derive(Clone, Debug)]
pub struct Base {
    max_hp: u32,
    hp: u32,
    tier: DamageTier,
    active: bool,
    position: Vec3,
    arrival_radius: f32,
}

impl Base {
    /// Creates a base at full health.
    #[must_use]
    pub fn new(config: &BaseConfig) -> Self {
        Self {
            max_hp: config.max_hp,
            hp: config.max_hp,
            tier: DamageTier::Intact,
            active: true,
            position: config.position,
            arrival_radius: config.arrival_radius,
        }
    }

    /// Removes `damage` hit points.
    ///
    /// The damage tier only ever worsens. Reaching zero hit points emits
    /// [`Event::BaseDestroyed`] and deactivates the base, after which hits are
    /// ignored and `false` is returned.
    pub fn receive_hit(&mut self, damage: u32, out: &mut Vec<Event>) -> bool {
        if !self.active {
            return false;
        }

        self.hp = self.hp.saturating_sub(damage);
        self.tier = self.tier.max(DamageTier::for_hp(self.hp, self.max_hp));
        debug!(hp = self.hp, tier = ?self.tier, "base damaged");
        out.push(Event::BaseDamaged {
            hp: self.hp,
            tier: self.tier,
        });

        if self.hp == 0 {
            self.active = false;
            info!("base destroyed");
            out.push(Event::BaseDestroyed);
        }
        true
    }

    /// Restores full health, the intact tier and the active flag.
    pub fn reset(&mut self) {
        self.hp = self.max_hp;
        self.tier = DamageTier::Intact;
        self.active = true;
    }

    /// Reports whether `point` lies within the arrival radius of an active base.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        self.active && self.position.distance(point) <= self.arrival_radius
    }

    /// Remaining hit points.
    #[must_use]
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Hit points on level start.
    #[must_use]
    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Worst damage tier reached since the last reset.
    #[must_use]
    pub fn tier(&self) -> DamageTier {
        self.tier
    }

    /// Reports whether the base still accepts hits.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// World position of the base.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }
}
