#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Rampart level without a renderer.

mod logging;
mod orders;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rampart_core::config::SessionConfig;

use crate::orders::TowerOrder;

/// Plays a Rampart tower-defense level headlessly and prints a summary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog of enemy, tower and unit definitions (TOML)
    #[arg(long)]
    catalog: PathBuf,

    /// Level definition (TOML)
    #[arg(long)]
    level: PathBuf,

    /// Playback multiplier, clamped to 0.5..=4
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Multiplier applied to every enemy's hit points
    #[arg(long, default_value_t = 1.0)]
    difficulty: f32,

    /// Seed for the enemy speed spread
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds before the first wave starts
    #[arg(long)]
    first_wave_delay: Option<f32>,

    /// Tower to build before play starts, repeatable
    #[arg(long = "tower", value_name = "SPOT:KIND")]
    towers: Vec<TowerOrder>,

    /// Stop after this many simulated seconds
    #[arg(long, default_value_t = 900.0)]
    max_seconds: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn session(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            difficulty: self.difficulty,
            rng_seed: self.seed.unwrap_or(defaults.rng_seed),
            speed: self.speed,
            first_wave_delay: self.first_wave_delay.unwrap_or(defaults.first_wave_delay),
        }
    }
}

/// Entry point for the Rampart command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let catalog = session::load_catalog(&args.catalog)?;
    let level = session::load_level(&args.level)?;
    let report = session::play(
        catalog,
        level,
        args.session(),
        &args.towers,
        args.max_seconds,
    )?;
    println!("{report}");
    Ok(())
}
