#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level orchestration for Cannon Defence.
//!
//! [`Level`] is the composition root: it builds the configuration databases,
//! the ledger, the world and the wave, countdown and placement systems from a
//! [`LevelConfig`]. Adapters mutate it exclusively through [`apply`] and read
//! it through the [`query`] module. Every event produced while applying a
//! command is also inspected by the level itself, which is how wave clears,
//! victory and defeat are detected.

use std::{sync::Arc, time::Duration};

use cannon_defence_core::{
    CannonKind, Command, ConfigError, ConfigSet, Event, LevelConfig, PlacementInput,
    PlacementRejection,
};
use cannon_defence_system_economy::Ledger;
use cannon_defence_system_placement::PlacementCoordinator;
use cannon_defence_system_waves::{Countdown, WaveScheduler};
use cannon_defence_world::World;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while assembling a level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// A configuration database could not be built or is missing a record.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The level has nowhere to emit enemies from.
    #[error("level defines no spawners")]
    NoSpawners,
    /// The level has nothing to play.
    #[error("level defines no waves")]
    NoWaves,
    /// The base would start destroyed.
    #[error("base must start with at least one hit point")]
    InvalidBase,
}

/// Progress of the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The banner for a wave is counting down.
    Countdown {
        /// Zero-based index of the announced wave.
        wave: u32,
    },
    /// A wave is being played.
    Playing {
        /// Zero-based index of the wave in play.
        wave: u32,
    },
    /// Every wave was cleared.
    Won,
    /// The base was destroyed.
    Lost,
}

impl Phase {
    /// Reports whether the level reached a terminal outcome.
    #[must_use]
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Composed object graph of a running level.
#[derive(Debug)]
pub struct Level {
    ledger: Ledger,
    world: World,
    scheduler: WaveScheduler,
    countdown: Countdown,
    placement: PlacementCoordinator,
    phase: Phase,
    remove_cannons_when_wave_finish: bool,
    reset_coins_when_wave_finish: bool,
}

impl Level {
    /// Assembles a level and starts the countdown for the first wave.
    pub fn new(config: LevelConfig, out: &mut Vec<Event>) -> Result<Self, LevelError> {
        if config.spawners.is_empty() {
            return Err(LevelError::NoSpawners);
        }
        if config.waves.is_empty() {
            return Err(LevelError::NoWaves);
        }
        if config.base.max_hp == 0 {
            return Err(LevelError::InvalidBase);
        }

        let countdown_step = config.countdown_step();
        let LevelConfig {
            start_coins,
            rng_seed,
            remove_cannons_when_wave_finish,
            reset_coins_when_wave_finish,
            pool,
            base,
            spawners,
            waves,
            enemies,
            cannons,
            projectiles,
            ..
        } = config;

        let configs = ConfigSet::build(enemies, cannons, projectiles)?;
        for group in waves.iter().flat_map(|wave| wave.groups.iter()) {
            let _ = configs.enemies().get(group.kind)?;
        }

        let spawner_count = u32::try_from(spawners.len()).unwrap_or(u32::MAX);
        let world = World::new(Arc::new(configs), &base, &spawners, pool);
        let mut level = Self {
            ledger: Ledger::new(start_coins),
            world,
            scheduler: WaveScheduler::new(waves, spawner_count, rng_seed),
            countdown: Countdown::new(countdown_step),
            placement: PlacementCoordinator::new(),
            phase: Phase::Countdown { wave: 0 },
            remove_cannons_when_wave_finish,
            reset_coins_when_wave_finish,
        };
        info!(
            waves = level.scheduler.wave_count(),
            spawners = spawner_count,
            coins = start_coins,
            "level assembled"
        );
        level.begin_countdown(0, out);
        Ok(level)
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        out.push(Event::TimeAdvanced { dt });
        if self.phase.is_over() {
            return;
        }

        self.countdown.handle(dt, out);
        let mut spawns = Vec::new();
        self.scheduler.handle(dt, &mut spawns, out);
        self.dispatch(spawns, out);
        self.world.step(dt, &mut self.ledger, out);
    }

    fn dispatch(&mut self, commands: Vec<Command>, out: &mut Vec<Event>) {
        for command in commands {
            if let Command::SpawnEnemy { kind, spawner } = command {
                let _ = self.world.spawn_enemy(kind, spawner, out);
            }
        }
    }

    fn placement_open(&self, kind: Option<CannonKind>, out: &mut Vec<Event>) -> bool {
        if matches!(self.phase, Phase::Playing { .. }) {
            return true;
        }
        warn!(phase = ?self.phase, "placement is only accepted while a wave is played");
        out.push(Event::PlacementRejected {
            kind,
            reason: PlacementRejection::InvalidPhase,
        });
        false
    }

    fn select(&mut self, kind: CannonKind, out: &mut Vec<Event>) {
        if !self.placement_open(Some(kind), out) {
            return;
        }
        let _ = self
            .placement
            .select(kind, self.world.cannons_mut(), &mut self.ledger, out);
    }

    fn hover(&mut self, input: PlacementInput) {
        if matches!(self.phase, Phase::Playing { .. }) {
            let _ = self.placement.hover(input, self.world.cannons_mut());
        }
    }

    fn confirm(&mut self, input: PlacementInput, out: &mut Vec<Event>) {
        let kind = self.placement.preview().map(|handle| handle.kind());
        if !self.placement_open(kind, out) {
            return;
        }
        let _ = self
            .placement
            .confirm(input, self.world.cannons_mut(), &mut self.ledger, out);
    }

    fn clear_preview(&mut self, out: &mut Vec<Event>) {
        let _ = self
            .placement
            .clear(self.world.cannons_mut(), &mut self.ledger, out);
    }

    fn begin_countdown(&mut self, wave: u32, out: &mut Vec<Event>) {
        self.phase = Phase::Countdown { wave };
        self.countdown.start(wave, out);
    }

    fn retry(&mut self, out: &mut Vec<Event>) {
        self.scheduler.reset();
        self.countdown.cancel();
        self.clear_preview(out);
        let projectiles = self.world.release_all_projectiles();
        let cannons = self.world.release_all_cannons();
        let enemies = self.world.release_all_enemies();
        self.ledger.reset(out);
        self.world.base_mut().reset();
        info!(enemies, cannons, projectiles, "level reset");
        out.push(Event::LevelReset);
        self.begin_countdown(0, out);
    }

    /// Inspects every event from `start` onwards, including the ones the
    /// reactions themselves emit.
    fn react(&mut self, start: usize, out: &mut Vec<Event>) {
        let mut index = start;
        while let Some(event) = out.get(index).cloned() {
            index += 1;
            match event {
                Event::CountdownFinished { wave } => self.start_wave(wave, out),
                Event::NoActiveEnemies | Event::WaveExhausted { .. } => {
                    self.check_wave_cleared(out);
                }
                Event::BaseDestroyed => self.lose(out),
                _ => {}
            }
        }
    }

    fn start_wave(&mut self, wave: u32, out: &mut Vec<Event>) {
        if self.phase != (Phase::Countdown { wave }) {
            debug!(wave, phase = ?self.phase, "ignoring stale countdown");
            return;
        }
        self.phase = Phase::Playing { wave };
        let mut spawns = Vec::new();
        if !self.scheduler.start_next_wave(&mut spawns, out) {
            warn!(wave, "scheduler refused to start wave");
        }
        self.dispatch(spawns, out);
    }

    fn check_wave_cleared(&mut self, out: &mut Vec<Event>) {
        let Phase::Playing { wave } = self.phase else {
            return;
        };
        if !self.scheduler.is_current_wave_finished() || self.world.enemies().active_count() > 0 {
            return;
        }

        let _ = self.world.release_all_projectiles();
        self.clear_preview(out);
        if !self.scheduler.has_more_waves() {
            info!(wave, "final wave cleared");
            self.phase = Phase::Won;
            out.push(Event::LevelWon);
            return;
        }

        info!(wave, "wave cleared");
        if self.remove_cannons_when_wave_finish {
            let removed = self.world.release_all_cannons();
            debug!(removed, "cannons returned after wave");
        }
        if self.reset_coins_when_wave_finish {
            self.ledger.reset(out);
        }
        let next = self.scheduler.current_wave();
        self.begin_countdown(next, out);
    }

    fn lose(&mut self, out: &mut Vec<Event>) {
        if self.phase.is_over() {
            return;
        }
        self.scheduler.stop();
        self.countdown.cancel();
        self.clear_preview(out);
        let _ = self.world.release_all_enemies();
        let _ = self.world.release_all_cannons();
        let _ = self.world.release_all_projectiles();
        info!(wave = self.scheduler.current_wave(), "level lost");
        self.phase = Phase::Lost;
        out.push(Event::LevelLost);
    }
}

/// Applies the provided command to the level, mutating it deterministically.
///
/// Events are appended to `out` in the order they happened, followed by the
/// events of the lifecycle reactions they triggered.
pub fn apply(level: &mut Level, command: Command, out: &mut Vec<Event>) {
    let start = out.len();
    match command {
        Command::Tick { dt } => level.tick(dt, out),
        Command::SpawnEnemy { kind, spawner } => {
            let _ = level.world.spawn_enemy(kind, spawner, out);
        }
        Command::SelectCannon { kind } => level.select(kind, out),
        Command::HoverPlacement { input } => level.hover(input),
        Command::ConfirmPlacement { input } => level.confirm(input, out),
        Command::ClearPreview => level.clear_preview(out),
        Command::Retry => level.retry(out),
    }
    level.react(start, out);
}

/// Query functions that provide read-only access to the level state.
pub mod query {
    use cannon_defence_core::{CannonHandle, CountdownPhase, DamageTier, EnemyView};
    use cannon_defence_world::World;

    use super::{Level, Phase};

    /// Current progress of the level.
    #[must_use]
    pub fn phase(level: &Level) -> Phase {
        level.phase
    }

    /// Coins owned by the player.
    #[must_use]
    pub fn balance(level: &Level) -> u32 {
        level.ledger.balance()
    }

    /// Coins not reserved by the placement preview.
    #[must_use]
    pub fn available_coins(level: &Level) -> u32 {
        level.ledger.available()
    }

    /// Number of waves started since the level began or was retried.
    #[must_use]
    pub fn current_wave(level: &Level) -> u32 {
        level.scheduler.current_wave()
    }

    /// Total number of waves in the level.
    #[must_use]
    pub fn wave_count(level: &Level) -> usize {
        level.scheduler.wave_count()
    }

    /// Reports whether the latest wave dispatched all of its enemies.
    #[must_use]
    pub fn is_current_wave_finished(level: &Level) -> bool {
        level.scheduler.is_current_wave_finished()
    }

    /// Countdown banner currently on display.
    #[must_use]
    pub fn countdown_phase(level: &Level) -> Option<CountdownPhase> {
        level.countdown.phase()
    }

    /// Remaining base hit points.
    #[must_use]
    pub fn base_hp(level: &Level) -> u32 {
        level.world.base().hp()
    }

    /// Damage tier of the base.
    #[must_use]
    pub fn base_tier(level: &Level) -> DamageTier {
        level.world.base().tier()
    }

    /// Number of live enemies.
    #[must_use]
    pub fn active_enemies(level: &Level) -> usize {
        level.world.enemies().active_count()
    }

    /// Number of cannons out of their pools, the preview included.
    #[must_use]
    pub fn active_cannons(level: &Level) -> usize {
        level.world.cannons().active_count()
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn active_projectiles(level: &Level) -> usize {
        level.world.projectiles().active_count()
    }

    /// Handle of the pending placement preview.
    #[must_use]
    pub fn preview(level: &Level) -> Option<CannonHandle> {
        level.placement.preview()
    }

    /// Snapshot of the live enemies.
    #[must_use]
    pub fn enemy_view(level: &Level) -> EnemyView {
        level.world.enemies().view()
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(level: &Level) -> &World {
        &level.world
    }
}

#[cfg(test)]
mod tests {
    use cannon_defence_core::{
        BaseConfig, CannonConfig, CountdownPhase, EnemyConfig, EnemyKind, PoolSizes,
        ProjectileConfig, ProjectileKind, SpawnGroup, Vec3, WaveDefinition,
    };

    use super::*;

    fn config() -> LevelConfig {
        LevelConfig {
            start_coins: 50,
            rng_seed: 3,
            remove_cannons_when_wave_finish: false,
            reset_coins_when_wave_finish: false,
            countdown_step_secs: 1.0,
            pool: PoolSizes::default(),
            base: BaseConfig {
                max_hp: 10,
                position: Vec3::ZERO,
                arrival_radius: 1.0,
            },
            spawners: vec![Vec3::new(30.0, 0.0, 0.0)],
            waves: vec![WaveDefinition {
                groups: vec![SpawnGroup {
                    kind: EnemyKind::Normal,
                    count: 1,
                }],
                spawn_interval_secs: 0.5,
            }],
            enemies: vec![EnemyConfig {
                kind: EnemyKind::Normal,
                template: "slime".to_owned(),
                hp: 2.0,
                speed: 1.0,
                reward: 5,
                hit_damage: 1,
                hit_radius: 0.5,
                death_delay_secs: 0.9,
            }],
            cannons: vec![CannonConfig {
                kind: CannonKind::Normal,
                template: "cannon".to_owned(),
                projectile: ProjectileKind::Normal,
                cost: 20,
                fire_rate: 1.0,
                range: 5.0,
                muzzle_height: 1.0,
            }],
            projectiles: vec![ProjectileConfig {
                kind: ProjectileKind::Normal,
                template: "ball".to_owned(),
                damage: 1.0,
                speed: 20.0,
                slow_factor: 0.0,
                slow_duration_secs: 0.0,
                lifetime_secs: 5.0,
                radius: 0.25,
            }],
        }
    }

    #[test]
    fn new_level_announces_first_wave() {
        let mut events = Vec::new();
        let level = Level::new(config(), &mut events).unwrap();

        assert_eq!(query::phase(&level), Phase::Countdown { wave: 0 });
        assert_eq!(query::countdown_phase(&level), Some(CountdownPhase::Wave));
        assert_eq!(query::balance(&level), 50);
        assert_eq!(
            events,
            vec![Event::CountdownAdvanced {
                wave: 0,
                phase: CountdownPhase::Wave,
            }]
        );
    }

    #[test]
    fn construction_rejects_missing_collaborators() {
        let mut events = Vec::new();

        let mut no_spawners = config();
        no_spawners.spawners.clear();
        assert!(matches!(
            Level::new(no_spawners, &mut events),
            Err(LevelError::NoSpawners)
        ));

        let mut no_waves = config();
        no_waves.waves.clear();
        assert!(matches!(
            Level::new(no_waves, &mut events),
            Err(LevelError::NoWaves)
        ));

        let mut dead_base = config();
        dead_base.base.max_hp = 0;
        assert!(matches!(
            Level::new(dead_base, &mut events),
            Err(LevelError::InvalidBase)
        ));
    }

    #[test]
    fn wave_referencing_unknown_enemy_is_rejected() {
        let mut config = config();
        config.waves[0].groups[0].kind = EnemyKind::Big;
        let mut events = Vec::new();

        let error = Level::new(config, &mut events).unwrap_err();
        assert!(matches!(
            error,
            LevelError::Config(ConfigError::UnknownKind { .. })
        ));
    }

    #[test]
    fn placement_is_refused_during_countdown() {
        let mut events = Vec::new();
        let mut level = Level::new(config(), &mut events).unwrap();
        events.clear();

        apply(
            &mut level,
            Command::SelectCannon {
                kind: CannonKind::Normal,
            },
            &mut events,
        );

        assert_eq!(query::preview(&level), None);
        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                kind: Some(CannonKind::Normal),
                reason: PlacementRejection::InvalidPhase,
            }]
        );
    }

    #[test]
    fn finished_countdown_starts_wave_and_spawns_first_enemy() {
        let mut events = Vec::new();
        let mut level = Level::new(config(), &mut events).unwrap();

        for _ in 0..4 {
            apply(
                &mut level,
                Command::Tick {
                    dt: Duration::from_secs(1),
                },
                &mut events,
            );
        }

        assert_eq!(query::phase(&level), Phase::Playing { wave: 0 });
        assert_eq!(query::current_wave(&level), 1);
        assert_eq!(query::active_enemies(&level), 1);
        assert!(query::is_current_wave_finished(&level));
        assert!(events.contains(&Event::WaveStarted { wave: 0 }));
        assert!(events.contains(&Event::WaveExhausted { wave: 0 }));
    }
}
