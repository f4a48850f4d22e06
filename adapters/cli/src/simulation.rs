//! Headless driver that wires the world to its systems.

use std::fmt;

use castle_siege_core::{Command, Event, FieldKind};
use castle_siege_system_navigation::{Navigation, TargetBounds};
use castle_siege_system_spawning::{Config, Spawning};
use castle_siege_world::{self as world, query, Field, Grid, World, WorldError};
use tracing::{debug, info};

use crate::config::SimulationConfig;

/// Owns the world and the systems that drive it, one tick at a time.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    navigation: Navigation,
    spawning: Spawning,
    tick: std::time::Duration,
    summary: Summary,
}

impl Simulation {
    /// Builds a simulation on the fortress map with the configured player and waves.
    pub(crate) fn new(config: &SimulationConfig) -> Result<Self, WorldError> {
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::PlacePlayer {
                bounds: config.player.bounds(),
            },
            &mut events,
        )?;

        let spawning = Spawning::new(
            Config::new(config.wave_interval(), config.seed, config.waves.clone())
                .with_waves_per_level(config.waves_per_level),
        );

        Ok(Self {
            world,
            navigation: Navigation::default(),
            spawning,
            tick: config.tick(),
            summary: Summary::default(),
        })
    }

    /// Advances the world by one tick and applies every command the systems emit.
    pub(crate) fn step(&mut self) -> Result<(), WorldError> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt: self.tick }, &mut events)?;
        self.summary.record(&events);

        let mut commands = Vec::new();
        let agent_view = query::agent_view(&self.world);
        let targets = TargetBounds {
            player: query::player_bounds(&self.world),
            castle: query::castle_bounds(&self.world),
        };
        let grid = query::grid(&self.world);
        self.navigation.handle(
            &events,
            &agent_view,
            grid,
            query::fields(&self.world),
            &targets,
            &mut commands,
        );
        self.spawning
            .handle(&events, &grid.bounds(), grid.cell_size(), &mut commands);

        let mut generated = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut generated)?;
        }
        self.summary.record(&generated);

        self.summary.ticks += 1;
        self.summary.alive = query::agent_view(&self.world).len();
        self.summary.waves_released = self.spawning.waves_released();
        self.summary.exhausted = self.spawning.is_exhausted();

        debug!(
            tick = query::tick_index(&self.world),
            alive = self.summary.alive,
            "tick complete"
        );
        Ok(())
    }

    /// Runs `ticks` steps, stopping at the first failure.
    pub(crate) fn run(&mut self, ticks: u32) -> Result<(), WorldError> {
        for _ in 0..ticks {
            self.step()?;
        }
        info!(ticks, alive = self.summary.alive, "simulation finished");
        Ok(())
    }

    pub(crate) fn summary(&self) -> &Summary {
        &self.summary
    }

    pub(crate) fn grid(&self) -> &Grid {
        query::grid(&self.world)
    }

    pub(crate) fn field(&self, kind: FieldKind) -> &Field {
        query::field(&self.world, kind)
    }
}

/// Running tally of what happened during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) ticks: u32,
    pub(crate) registered: usize,
    pub(crate) rejected: usize,
    pub(crate) despawned: usize,
    pub(crate) moves: usize,
    pub(crate) attacks: usize,
    pub(crate) stalls: usize,
    pub(crate) alive: usize,
    pub(crate) waves_released: usize,
    pub(crate) exhausted: bool,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentRegistered { .. } => self.registered += 1,
                Event::RegistrationRejected { .. } => self.rejected += 1,
                Event::AgentDespawned { .. } => self.despawned += 1,
                Event::AgentMoved { .. } => self.moves += 1,
                Event::AgentAttacked { .. } => self.attacks += 1,
                Event::AgentStalled { .. } => self.stalls += 1,
                Event::TimeAdvanced { .. }
                | Event::MapScrolled { .. }
                | Event::AgentUnregistered { .. }
                | Event::UnregistrationRejected { .. } => {}
            }
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks: {}", self.ticks)?;
        writeln!(f, "registered: {}", self.registered)?;
        writeln!(f, "rejected: {}", self.rejected)?;
        writeln!(f, "despawned: {}", self.despawned)?;
        writeln!(f, "moves: {}", self.moves)?;
        writeln!(f, "attacks: {}", self.attacks)?;
        writeln!(f, "stalls: {}", self.stalls)?;
        writeln!(f, "alive: {}", self.alive)?;
        writeln!(f, "waves released: {}", self.waves_released)?;
        write!(f, "waves exhausted: {}", self.exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_siege_core::EnemyKind;
    use castle_siege_system_spawning::{Wave, WaveEntry};

    fn config(waves: Vec<Wave>) -> SimulationConfig {
        SimulationConfig {
            ticks: 0,
            wave_interval_millis: 1_000,
            waves_per_level: 1,
            waves,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn first_tick_releases_the_first_wave() {
        let mut simulation = Simulation::new(&config(vec![Wave {
            entries: vec![WaveEntry {
                column: 22,
                kind: EnemyKind::Mouthy,
                count: 4,
            }],
        }]))
        .expect("fortress is valid");

        simulation.step().expect("tick succeeds");

        let summary = simulation.summary();
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.registered, 4);
        assert_eq!(summary.alive, 4);
        assert_eq!(summary.waves_released, 1);
        assert!(summary.exhausted);
        assert_eq!(summary.moves, 0, "spawned agents move from the next tick");
    }

    #[test]
    fn spawned_agents_start_moving() {
        let mut simulation = Simulation::new(&config(vec![Wave {
            entries: vec![WaveEntry {
                column: 22,
                kind: EnemyKind::Eyelet,
                count: 2,
            }],
        }]))
        .expect("fortress is valid");

        simulation.run(10).expect("run succeeds");

        let summary = simulation.summary();
        assert_eq!(summary.ticks, 10);
        assert_eq!(summary.registered, 2);
        assert!(summary.moves > 0);
        assert_eq!(summary.despawned, 0);
    }

    #[test]
    fn runs_are_reproducible() {
        let run = || {
            let mut simulation =
                Simulation::new(&SimulationConfig::default()).expect("fortress is valid");
            simulation.run(300).expect("run succeeds");
            simulation.summary().clone()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn levels_repeat_at_the_configured_cadence() {
        let mut simulation = Simulation::new(&SimulationConfig {
            waves_per_level: 3,
            ..config(vec![Wave {
                entries: vec![WaveEntry {
                    column: 22,
                    kind: EnemyKind::Eyelet,
                    count: 1,
                }],
            }])
        })
        .expect("fortress is valid");

        // 16 ms ticks: waves at ticks 1, 64 and 127.
        simulation.run(130).expect("run succeeds");

        let summary = simulation.summary();
        assert_eq!(summary.waves_released, 3);
        assert_eq!(summary.registered, 3);
        assert!(summary.exhausted);
    }

    #[test]
    fn player_field_is_built_after_a_tick() {
        let mut simulation = Simulation::new(&config(Vec::new())).expect("fortress is valid");
        assert_eq!(simulation.field(FieldKind::FlowToPlayer).forced_count(), 0);

        simulation.step().expect("tick succeeds");
        assert!(simulation.field(FieldKind::FlowToPlayer).forced_count() > 0);
        assert_eq!(simulation.field(FieldKind::Raw).forced_count(), 0);
    }

    #[test]
    fn summary_lists_every_counter() {
        let rendered = Summary::default().to_string();
        for label in [
            "ticks",
            "registered",
            "rejected",
            "despawned",
            "moves",
            "attacks",
            "stalls",
            "alive",
            "waves released",
            "waves exhausted",
        ] {
            assert!(rendered.contains(label), "missing {label}");
        }
    }
}
