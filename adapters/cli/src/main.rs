#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Castle Siege simulation.

mod config;
mod field_dump;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use castle_siege_core::FieldKind;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::SimulationConfig, simulation::Simulation};

/// Runs the siege without a window and prints what happened.
#[derive(Debug, Parser)]
#[command(name = "castle-siege", version, about)]
struct Args {
    /// TOML file overriding the default simulation settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate.
    #[arg(long)]
    ticks: Option<u32>,

    /// Simulated milliseconds per tick.
    #[arg(long)]
    tick_millis: Option<u64>,

    /// Seed for spawn placement.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final directions of a flow field after the run.
    #[arg(long, value_enum)]
    dump_field: Option<DumpField>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DumpField {
    Player,
    Castle,
}

impl From<DumpField> for FieldKind {
    fn from(value: DumpField) -> Self {
        match value {
            DumpField::Player => FieldKind::FlowToPlayer,
            DumpField::Castle => FieldKind::FlowToCastle,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("castle_siege=info"))?,
        )
        .init();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }
    if let Some(tick_millis) = args.tick_millis {
        config.tick_millis = tick_millis;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    info!(ticks = config.ticks, seed = config.seed, "starting simulation");
    let mut simulation = Simulation::new(&config).context("Failed to set up the world")?;
    simulation.run(config.ticks).context("Simulation aborted")?;

    println!("{}", simulation.summary());
    if let Some(field) = args.dump_field {
        println!();
        println!(
            "{}",
            field_dump::render(simulation.grid(), simulation.field(field.into()))
        );
    }
    Ok(())
}
