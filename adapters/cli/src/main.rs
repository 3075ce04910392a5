#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Cannon Defence level headlessly.
//!
//! The level is read from TOML (or the bundled default), driven frame by
//! frame with a fixed time step, and an optional autopilot places cannons on
//! predefined build spots. Level events are reported through `tracing`.

mod autopilot;
mod level_file;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use cannon_defence_core::{Command, Event};
use cannon_defence_level::{apply, query, Level, Phase};
use clap::Parser;
use tracing::{debug, info, Level as LogLevel};

use crate::{autopilot::Autopilot, level_file::LevelFile};

/// Command-line arguments accepted by the runner.
#[derive(Debug, Parser)]
#[command(name = "cannon-defence", about = "Plays a Cannon Defence level headlessly")]
struct Args {
    /// Level file to play instead of the bundled level.
    #[arg(long)]
    level: Option<PathBuf>,
    /// Overrides the seed used for wave draws.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated milliseconds per frame.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    dt_ms: u64,
    /// Simulated seconds after which the run is abandoned.
    #[arg(long, default_value_t = 600)]
    max_seconds: u64,
    /// Raises log verbosity; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Final state of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Report {
    phase: Phase,
    elapsed: Duration,
    waves_started: u32,
    wave_count: usize,
    base_hp: u32,
    balance: u32,
    kills: usize,
}

impl Report {
    fn outcome(&self) -> &'static str {
        match self.phase {
            Phase::Won => "won",
            Phase::Lost => "lost",
            Phase::Countdown { .. } | Phase::Playing { .. } => "unfinished",
        }
    }
}

/// Entry point for the Cannon Defence command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut file = LevelFile::load(args.level.as_deref())?;
    if let Some(seed) = args.seed {
        file.level.rng_seed = seed;
    }

    let report = run(
        file,
        Duration::from_millis(args.dt_ms),
        Duration::from_secs(args.max_seconds),
    )?;
    println!(
        "outcome: {} after {:.1}s, waves {}/{}, base hp {}, coins {}, kills {}",
        report.outcome(),
        report.elapsed.as_secs_f32(),
        report.waves_started,
        report.wave_count,
        report.base_hp,
        report.balance,
        report.kills,
    );
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LogLevel::WARN,
        1 => LogLevel::INFO,
        2 => LogLevel::DEBUG,
        _ => LogLevel::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(file: LevelFile, dt: Duration, limit: Duration) -> Result<Report> {
    let mut events = Vec::new();
    let mut level = Level::new(file.level, &mut events).context("failed to assemble level")?;
    let autopilot = Autopilot::new(file.autopilot, &level)?;

    let mut elapsed = Duration::ZERO;
    let mut kills = 0;
    while elapsed < limit && !query::phase(&level).is_over() {
        for command in autopilot.plan(&level) {
            apply(&mut level, command, &mut events);
        }
        apply(&mut level, Command::Tick { dt }, &mut events);
        elapsed += dt;

        for event in events.drain(..) {
            if matches!(event, Event::EnemyKilled { .. }) {
                kills += 1;
            }
            log_event(&event);
        }
    }

    Ok(Report {
        phase: query::phase(&level),
        elapsed,
        waves_started: query::current_wave(&level),
        wave_count: query::wave_count(&level),
        base_hp: query::base_hp(&level),
        balance: query::balance(&level),
        kills,
    })
}

fn log_event(event: &Event) {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::WaveStarted { .. }
        | Event::BaseDamaged { .. }
        | Event::CannonPlaced { .. }
        | Event::LevelWon
        | Event::LevelLost
        | Event::LevelReset => info!(?event, "level event"),
        _ => debug!(?event, "level event"),
    }
}
