use std::{fs, path::Path};

use anyhow::{Context, Result};
use cannon_defence_core::LevelConfig;
use serde::Deserialize;

use crate::autopilot::AutopilotConfig;

/// Level bundled with the binary, used when no `--level` is given.
pub(crate) const BUNDLED_LEVEL: &str = include_str!("../levels/default.toml");

/// Contents of a level file: the level itself plus the optional autopilot table.
#[derive(Debug, Deserialize)]
pub(crate) struct LevelFile {
    #[serde(flatten)]
    pub(crate) level: LevelConfig,
    #[serde(default)]
    pub(crate) autopilot: AutopilotConfig,
}

impl LevelFile {
    /// Loads the level at `path`, or the bundled level when `path` is `None`.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::parse(BUNDLED_LEVEL).context("failed to parse bundled level");
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read level at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse level at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file = toml::from_str(contents).context("level is not valid toml")?;
        Ok(file)
    }
}
