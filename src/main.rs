//! Colony Mind - headless demo
//!
//! Generates a seeded sandbox settlement, drives the scheduler for a number
//! of cycles and prints the final statistics as JSON.

use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use colony_mind::core::{Result, SchedulerConfig};
use colony_mind::sandbox::Sandbox;
use colony_mind::simulation::{SchedulerStats, TaskOrchestrator};

/// Run the task scheduler over a generated settlement
#[derive(Parser, Debug)]
#[command(name = "colony-mind")]
#[command(about = "Drive the per-agent task scheduler over a sandbox settlement")]
struct Args {
    /// Number of agents to spawn
    #[arg(long, default_value_t = 24)]
    agents: usize,

    /// Scheduler passes to run
    #[arg(long, default_value_t = 200)]
    cycles: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated milliseconds per cycle
    #[arg(long, default_value_t = 250)]
    dt_ms: u64,

    /// Scheduler config (TOML); defaults when absent
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    agents_spawned: usize,
    agents_alive: usize,
    cycles: u64,
    simulated_ms: u64,
    stats: SchedulerStats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("colony_mind=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SchedulerConfig::load(path)?,
        None => SchedulerConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    tracing::info!("Generating settlement: {} agents, seed {}", args.agents, seed);
    let mut world = Sandbox::generate(args.agents, &mut rng);

    let mut scheduler = TaskOrchestrator::new(config)?;
    for agent in world.agents().to_vec() {
        scheduler.register_agent(agent);
    }

    for cycle in 0..args.cycles {
        let report = scheduler.update(&mut world, args.dt_ms)?;
        for fallen in world.advance(args.dt_ms) {
            tracing::info!("{} fell, clearing its tasks", fallen);
            scheduler.clear_agent(fallen);
        }

        if cycle % 50 == 0 {
            tracing::info!(
                "Cycle {}: {} ran, {} promoted, {} completed, {} failed",
                cycle,
                report.ran,
                report.promoted,
                report.completed,
                report.failed
            );
        }
    }

    let summary = RunSummary {
        seed,
        agents_spawned: args.agents,
        agents_alive: world.agents().len(),
        cycles: args.cycles,
        simulated_ms: world.now(),
        stats: scheduler.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
