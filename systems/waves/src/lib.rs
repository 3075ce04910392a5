#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduling system that turns wave definitions into spawn commands.
//!
//! A started wave flattens its groups into a bag of draws. The first draw is
//! dispatched immediately and one more follows per elapsed spawn interval.
//! Each draw removes a uniformly random entry from the bag and pairs it with a
//! uniformly random spawner, so per-kind counts are never exceeded. All
//! randomness comes from a seeded [`ChaCha8Rng`], which makes runs and retries
//! reproducible.

mod countdown;

use std::time::Duration;

use cannon_defence_core::{Command, EnemyKind, Event, SpawnerId, WaveDefinition};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

pub use countdown::Countdown;

/// Lifecycle of the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No wave is running.
    Idle,
    /// A wave is dispatching spawns.
    Running {
        /// Zero-based index of the running wave.
        wave: u32,
    },
    /// The wave dispatched every draw and more waves remain.
    WaveComplete {
        /// Zero-based index of the completed wave.
        wave: u32,
    },
    /// The final wave dispatched every draw.
    AllWavesComplete,
}

/// Seeded scheduler that dispatches wave spawns over time.
#[derive(Debug)]
pub struct WaveScheduler {
    waves: Vec<WaveDefinition>,
    spawner_count: u32,
    seed: u64,
    rng: ChaCha8Rng,
    started: u32,
    state: SchedulerState,
    bag: Vec<EnemyKind>,
    interval: Duration,
    elapsed: Duration,
}

impl WaveScheduler {
    /// Creates a scheduler over `waves` that spreads spawns across
    /// `spawner_count` spawners.
    #[must_use]
    pub fn new(waves: Vec<WaveDefinition>, spawner_count: u32, seed: u64) -> Self {
        Self {
            waves,
            spawner_count,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            started: 0,
            state: SchedulerState::Idle,
            bag: Vec::new(),
            interval: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    /// Starts the next wave and dispatches its first draw.
    ///
    /// Returns `false` without side effects when no waves remain or a wave is
    /// still dispatching.
    pub fn start_next_wave(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) -> bool {
        if matches!(self.state, SchedulerState::Running { .. }) {
            warn!(state = ?self.state, "ignoring wave start while a wave is running");
            return false;
        }
        let Some(definition) = self.waves.get(self.started as usize) else {
            return false;
        };

        let wave = self.started;
        self.started += 1;
        self.bag = definition
            .groups
            .iter()
            .flat_map(|group| std::iter::repeat(group.kind).take(group.count as usize))
            .collect();
        self.interval = definition.spawn_interval();
        self.elapsed = Duration::ZERO;
        self.state = SchedulerState::Running { wave };
        info!(wave, spawns = self.bag.len(), "wave started");
        events.push(Event::WaveStarted { wave });

        if !self.bag.is_empty() {
            self.dispatch(commands);
        }
        self.finish_if_exhausted(wave, events);
        true
    }

    /// Advances the running wave by `dt`, dispatching every draw that came due.
    pub fn handle(&mut self, dt: Duration, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        let SchedulerState::Running { wave } = self.state else {
            return;
        };

        self.elapsed += dt;
        while !self.bag.is_empty() && self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            self.dispatch(commands);
        }
        self.finish_if_exhausted(wave, events);
    }

    /// Abandons the pending draws of the running wave.
    pub fn stop(&mut self) {
        if !self.bag.is_empty() {
            debug!(abandoned = self.bag.len(), "wave stopped");
        }
        self.bag.clear();
        self.elapsed = Duration::ZERO;
        self.state = SchedulerState::Idle;
    }

    /// Stops the scheduler, rewinds to the first wave and reseeds the RNG.
    pub fn reset(&mut self) {
        self.stop();
        self.started = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }

    /// Number of waves started since the last reset.
    ///
    /// While a wave runs this is its one-based number.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.started
    }

    /// Reports whether the most recently started wave dispatched every draw.
    #[must_use]
    pub fn is_current_wave_finished(&self) -> bool {
        matches!(
            self.state,
            SchedulerState::WaveComplete { .. } | SchedulerState::AllWavesComplete
        )
    }

    /// Reports whether waves remain to be started.
    #[must_use]
    pub fn has_more_waves(&self) -> bool {
        (self.started as usize) < self.waves.len()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Total number of configured waves.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Draws still waiting in the running wave's bag.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.bag.len()
    }

    fn dispatch(&mut self, commands: &mut Vec<Command>) {
        let index = self.rng.gen_range(0..self.bag.len());
        let kind = self.bag.swap_remove(index);
        if self.spawner_count == 0 {
            warn!(?kind, "dropping spawn draw without spawners");
            return;
        }
        let spawner = SpawnerId::new(self.rng.gen_range(0..self.spawner_count));
        debug!(?kind, spawner = spawner.get(), "spawn dispatched");
        commands.push(Command::SpawnEnemy { kind, spawner });
    }

    fn finish_if_exhausted(&mut self, wave: u32, events: &mut Vec<Event>) {
        if !self.bag.is_empty() {
            return;
        }
        self.elapsed = Duration::ZERO;
        self.state = if self.has_more_waves() {
            SchedulerState::WaveComplete { wave }
        } else {
            SchedulerState::AllWavesComplete
        };
        info!(wave, "wave exhausted");
        events.push(Event::WaveExhausted { wave });
    }
}
