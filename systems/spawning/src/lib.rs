#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawner that emits agent registration commands.

use std::time::Duration;

use castle_siege_core::{Bounds, Command, EnemyKind, Event};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Group of identical enemies entering from one map column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Grid column whose left edge the enemies spawn on.
    pub column: u32,
    /// Enemy archetype to spawn.
    pub kind: EnemyKind,
    /// Number of enemies to spawn.
    pub count: u32,
}

/// Enemies released together when a wave starts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    /// Entries spawned by the wave, in order.
    #[serde(default)]
    pub entries: Vec<WaveEntry>,
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug)]
pub struct Config {
    wave_interval: Duration,
    rng_seed: u64,
    waves: Vec<Wave>,
    waves_per_level: u32,
}

impl Config {
    /// Creates a new configuration using the provided wave cadence, seed and wave table.
    ///
    /// Each configured wave is a level that is released once.
    #[must_use]
    pub fn new(wave_interval: Duration, rng_seed: u64, waves: Vec<Wave>) -> Self {
        Self {
            wave_interval,
            rng_seed,
            waves,
            waves_per_level: 1,
        }
    }

    /// Releases every level `waves_per_level` times before moving to the next.
    ///
    /// Zero is treated as one.
    #[must_use]
    pub fn with_waves_per_level(mut self, waves_per_level: u32) -> Self {
        self.waves_per_level = waves_per_level.max(1);
        self
    }
}

/// Pure system that releases one wave per interval of simulated time.
///
/// The first wave starts on the first tick that advances time. Each level of
/// the wave table is repeated `waves_per_level` times; once the last level is
/// spent the spawner is exhausted.
#[derive(Debug)]
pub struct Spawning {
    wave_interval: Duration,
    countdown: Duration,
    waves: Vec<Wave>,
    waves_per_level: u32,
    level: usize,
    released_in_level: u32,
    released: usize,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            wave_interval: config.wave_interval,
            countdown: Duration::ZERO,
            waves: config.waves,
            waves_per_level: config.waves_per_level.max(1),
            level: 0,
            released_in_level: 0,
            released: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Reports whether every level has been released as often as configured.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.level >= self.waves.len()
    }

    /// Index of the level the next wave is drawn from.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Number of waves released so far.
    #[must_use]
    pub fn waves_released(&self) -> usize {
        self.released
    }

    /// Consumes events to emit registration commands for the next wave when it is due.
    ///
    /// `map` is the map rectangle in world coordinates and `cell_size` the
    /// size of one grid cell; enemies enter at `column * cell width` with a
    /// random height that keeps one cell of clearance at the bottom edge.
    pub fn handle(
        &mut self,
        events: &[Event],
        map: &Bounds,
        cell_size: Vec2,
        out: &mut Vec<Command>,
    ) {
        if self.is_exhausted() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        if self.countdown > accumulated {
            self.countdown -= accumulated;
            return;
        }

        self.countdown = self.wave_interval;
        self.release_wave(map, cell_size, out);
    }

    fn release_wave(&mut self, map: &Bounds, cell_size: Vec2, out: &mut Vec<Command>) {
        let Some(wave) = self.waves.get(self.level) else {
            return;
        };
        let level = self.level;
        self.released += 1;
        self.released_in_level += 1;
        if self.released_in_level >= self.waves_per_level {
            self.level += 1;
            self.released_in_level = 0;
        }

        let max_offset = map.size().y - cell_size.y;
        let mut spawned = 0_u32;
        for entry in &wave.entries {
            let x = map.origin().x + entry.column as f32 * cell_size.x;
            for _ in 0..entry.count {
                let offset = if max_offset > 0.0 {
                    self.rng.gen_range(0.0..max_offset)
                } else {
                    0.0
                };
                out.push(Command::RegisterAgent {
                    profile: entry.kind.profile(),
                    position: Vec2::new(x, map.origin().y + offset),
                });
                spawned = spawned.saturating_add(1);
            }
        }

        debug!(level, wave = self.released, spawned, "released wave");
    }
}
