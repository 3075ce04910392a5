use anyhow::{Context, Result};
use cannon_defence_core::{CannonKind, Command, PlacementInput, Vec3};
use cannon_defence_level::{query, Level, Phase};
use serde::Deserialize;

/// Build plan followed by the headless player.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct AutopilotConfig {
    #[serde(default = "default_cannon")]
    pub(crate) cannon: CannonKind,
    #[serde(default)]
    pub(crate) build_spots: Vec<Vec3>,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            cannon: default_cannon(),
            build_spots: Vec::new(),
        }
    }
}

fn default_cannon() -> CannonKind {
    CannonKind::Normal
}

/// Places cannons on the configured spots, in order, whenever coins allow.
///
/// The next spot is the one indexed by the number of cannons standing, so
/// cannons returned between waves or by a retry are rebuilt.
#[derive(Debug)]
pub(crate) struct Autopilot {
    config: AutopilotConfig,
    cost: u32,
}

impl Autopilot {
    pub(crate) fn new(config: AutopilotConfig, level: &Level) -> Result<Self> {
        let cost = query::world(level)
            .configs()
            .cannons()
            .get(config.cannon)
            .context("autopilot cannon is not part of the level")?
            .cost;
        Ok(Self { config, cost })
    }

    /// Commands to issue before the next frame.
    pub(crate) fn plan(&self, level: &Level) -> Vec<Command> {
        if !matches!(query::phase(level), Phase::Playing { .. }) || query::preview(level).is_some() {
            return Vec::new();
        }
        let Some(&spot) = self.config.build_spots.get(query::active_cannons(level)) else {
            return Vec::new();
        };
        if query::available_coins(level) < self.cost {
            return Vec::new();
        }

        let input = PlacementInput::placeable(spot);
        vec![
            Command::SelectCannon {
                kind: self.config.cannon,
            },
            Command::HoverPlacement { input },
            Command::ConfirmPlacement { input },
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cannon_defence_level::apply;

    use super::*;
    use crate::level_file::{LevelFile, BUNDLED_LEVEL};

    fn bundled() -> (Level, Autopilot) {
        let file = LevelFile::parse(BUNDLED_LEVEL).unwrap();
        let mut events = Vec::new();
        let level = Level::new(file.level, &mut events).unwrap();
        let autopilot = Autopilot::new(file.autopilot, &level).unwrap();
        (level, autopilot)
    }

    #[test]
    fn waits_for_the_wave_to_start() {
        let (level, autopilot) = bundled();
        assert!(autopilot.plan(&level).is_empty());
    }

    #[test]
    fn builds_spots_in_order_while_affordable() {
        let (mut level, autopilot) = bundled();
        let mut events = Vec::new();
        for _ in 0..4 {
            apply(
                &mut level,
                Command::Tick {
                    dt: Duration::from_secs(1),
                },
                &mut events,
            );
        }
        assert!(matches!(query::phase(&level), Phase::Playing { wave: 0 }));

        for command in autopilot.plan(&level) {
            apply(&mut level, command, &mut events);
        }
        for command in autopilot.plan(&level) {
            apply(&mut level, command, &mut events);
        }

        assert_eq!(query::active_cannons(&level), 2);
        assert_eq!(query::balance(&level), 20);
        assert!(autopilot.plan(&level).is_empty());
    }

    #[test]
    fn unknown_cannon_kind_is_rejected() {
        let mut file = LevelFile::parse(BUNDLED_LEVEL).unwrap();
        file.level.cannons.retain(|cannon| cannon.kind != CannonKind::Freeze);
        let mut events = Vec::new();
        let level = Level::new(file.level, &mut events).unwrap();
        let config = AutopilotConfig {
            cannon: CannonKind::Freeze,
            build_spots: vec![Vec3::ZERO],
        };

        assert!(Autopilot::new(config, &level).is_err());
    }
}
