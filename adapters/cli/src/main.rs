#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line adapter that plays a Lanebound match to its end.

mod autoplay;
mod simulation;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use lanebound_world::config::MatchConfig;
use tracing_subscriber::EnvFilter;

use crate::simulation::Simulation;

/// Plays a scripted Lanebound match without rendering.
#[derive(Debug, Parser)]
#[command(name = "lanebound", version, about)]
struct Args {
    /// TOML match configuration. Built-in defaults are used when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Seed for augment offers and the scripted player.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,
    /// Number of ticks after which an undecided match is abandoned.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
}

/// Entry point for the Lanebound command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let mut simulation = Simulation::new(config, args.seed);
    println!("{}", simulation.welcome_banner());

    let report = simulation.run(Duration::from_millis(args.tick_ms), args.max_ticks);
    let Some(outcome) = report.outcome else {
        bail!("match undecided after {} ticks", report.ticks);
    };

    println!("outcome: {outcome:?}");
    println!("ticks: {}", report.ticks);
    println!("waves cleared: {}", report.waves_cleared);
    println!("gold: {}", report.gold);
    println!(
        "enemies defeated: {}, units lost: {}",
        report.enemies_defeated, report.units_lost
    );
    for (title, stacks) in &report.augments {
        println!("augment {title} x{stacks}");
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    let Some(path) = path else {
        return Ok(MatchConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read match configuration {}", path.display()))?;
    MatchConfig::from_toml_str(&text)
        .with_context(|| format!("invalid match configuration in {}", path.display()))
}
