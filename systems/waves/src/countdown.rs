use std::time::Duration;

use cannon_defence_core::{CountdownPhase, Event};
use tracing::debug;

const PHASES: [CountdownPhase; 4] = [
    CountdownPhase::Wave,
    CountdownPhase::Ready,
    CountdownPhase::Set,
    CountdownPhase::Go,
];

#[derive(Clone, Copy, Debug)]
struct Run {
    wave: u32,
    stage: usize,
    elapsed: Duration,
}

/// Banner timer that announces a wave before it starts.
///
/// Each phase stays visible for one step; once "GO" has been shown for a full
/// step the countdown reports [`Event::CountdownFinished`].
#[derive(Clone, Debug)]
pub struct Countdown {
    step: Duration,
    run: Option<Run>,
}

impl Countdown {
    /// Creates an idle countdown whose phases last `step` each.
    #[must_use]
    pub const fn new(step: Duration) -> Self {
        Self { step, run: None }
    }

    /// Starts announcing `wave`, replacing any countdown already running.
    pub fn start(&mut self, wave: u32, out: &mut Vec<Event>) {
        self.run = Some(Run {
            wave,
            stage: 0,
            elapsed: Duration::ZERO,
        });
        debug!(wave, "countdown started");
        out.push(Event::CountdownAdvanced {
            wave,
            phase: PHASES[0],
        });
    }

    /// Advances the countdown by `dt`.
    pub fn handle(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let Some(mut run) = self.run else {
            return;
        };

        run.elapsed += dt;
        while run.elapsed >= self.step {
            run.elapsed -= self.step;
            run.stage += 1;
            match PHASES.get(run.stage) {
                Some(&phase) => out.push(Event::CountdownAdvanced {
                    wave: run.wave,
                    phase,
                }),
                None => {
                    self.run = None;
                    out.push(Event::CountdownFinished { wave: run.wave });
                    return;
                }
            }
        }
        self.run = Some(run);
    }

    /// Abandons the running countdown without announcing its end.
    pub fn cancel(&mut self) {
        self.run = None;
    }

    /// Reports whether a countdown is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Phase currently on display.
    #[must_use]
    pub fn phase(&self) -> Option<CountdownPhase> {
        self.run.and_then(|run| PHASES.get(run.stage).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announces_each_phase_then_finishes() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        let mut events = Vec::new();

        countdown.start(2, &mut events);
        for _ in 0..4 {
            countdown.handle(Duration::from_millis(500), &mut events);
            countdown.handle(Duration::from_millis(500), &mut events);
        }

        assert_eq!(
            events,
            vec![
                Event::CountdownAdvanced {
                    wave: 2,
                    phase: CountdownPhase::Wave,
                },
                Event::CountdownAdvanced {
                    wave: 2,
                    phase: CountdownPhase::Ready,
                },
                Event::CountdownAdvanced {
                    wave: 2,
                    phase: CountdownPhase::Set,
                },
                Event::CountdownAdvanced {
                    wave: 2,
                    phase: CountdownPhase::Go,
                },
                Event::CountdownFinished { wave: 2 },
            ]
        );
        assert!(!countdown.is_running());
    }

    #[test]
    fn zero_step_finishes_on_first_tick() {
        let mut countdown = Countdown::new(Duration::ZERO);
        let mut events = Vec::new();

        countdown.start(0, &mut events);
        countdown.handle(Duration::ZERO, &mut events);

        assert_eq!(events.last(), Some(&Event::CountdownFinished { wave: 0 }));
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn cancel_suppresses_completion() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        let mut events = Vec::new();

        countdown.start(0, &mut events);
        assert_eq!(countdown.phase(), Some(CountdownPhase::Wave));
        countdown.cancel();
        countdown.handle(Duration::from_secs(10), &mut events);

        assert_eq!(events.len(), 1);
        assert_eq!(countdown.phase(), None);
    }
}
