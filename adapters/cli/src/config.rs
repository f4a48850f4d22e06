//! Host configuration loaded from TOML.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use castle_siege_core::{Bounds, EnemyKind};
use castle_siege_system_spawning::{Wave, WaveEntry};
use serde::{Deserialize, Serialize};

/// Everything the host needs to drive a headless simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    /// Simulated milliseconds per tick.
    pub(crate) tick_millis: u64,
    /// Number of ticks to run.
    pub(crate) ticks: u32,
    /// Seed for spawn placement.
    pub(crate) seed: u64,
    /// Simulated milliseconds between two waves.
    pub(crate) wave_interval_millis: u64,
    /// Waves released from each level before the next level starts.
    pub(crate) waves_per_level: u32,
    /// Where the player stands for the whole run.
    pub(crate) player: PlayerPlacement,
    /// Waves released in order.
    pub(crate) waves: Vec<Wave>,
}

/// Player hitbox in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayerPlacement {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl PlayerPlacement {
    pub(crate) fn bounds(&self) -> Bounds {
        Bounds::from_xywh(self.x, self.y, self.width, self.height)
    }
}

impl Default for PlayerPlacement {
    fn default() -> Self {
        Self {
            x: 384.0,
            y: 284.0,
            width: 16.0,
            height: 22.0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_millis: 16,
            ticks: 1_200,
            seed: 0x4d59_5df4_d0f3_3173,
            wave_interval_millis: 10_000,
            waves_per_level: 8,
            player: PlayerPlacement::default(),
            waves: default_waves(),
        }
    }
}

impl SimulationConfig {
    /// Reads and parses a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parses a configuration from TOML text; omitted keys keep their defaults.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid simulation config")?;
        Ok(config)
    }

    pub(crate) fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub(crate) fn wave_interval(&self) -> Duration {
        Duration::from_millis(self.wave_interval_millis)
    }
}

fn default_waves() -> Vec<Wave> {
    let entry = |column, kind, count| WaveEntry {
        column,
        kind,
        count,
    };
    vec![
        Wave {
            entries: vec![
                entry(22, EnemyKind::Mouthy, 25),
                entry(22, EnemyKind::Eyelet, 25),
            ],
        },
        Wave {
            entries: vec![
                entry(22, EnemyKind::Eyelet, 15),
                entry(24, EnemyKind::Eyelet, 15),
            ],
        },
        Wave {
            entries: vec![
                entry(22, EnemyKind::Eyeleen, 15),
                entry(24, EnemyKind::Eyeleen, 15),
            ],
        },
        Wave {
            entries: vec![
                entry(22, EnemyKind::Robey, 15),
                entry(24, EnemyKind::Robey, 15),
            ],
        },
    ]
}
