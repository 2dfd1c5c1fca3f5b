//! Headless play-through of a single level.

use std::{fmt, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rampart_core::{
    config::{Catalog, LevelDefinition, SessionConfig},
    Command, Event,
};
use rampart_world::{apply, query, LevelOutcome, World};

use crate::orders::TowerOrder;

/// Wall-clock length of one simulation step (60 Hz).
pub(crate) const TICK: Duration = Duration::from_micros(16_667);

/// Reads and parses the definition catalog.
pub(crate) fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog at {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse catalog at {}", path.display()))
}

/// Reads and parses a level definition.
pub(crate) fn load_level(path: &Path) -> Result<LevelDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read level at {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse level at {}", path.display()))
}

/// Running counts of what happened during play.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) killed: u32,
    pub(crate) escaped: u32,
    pub(crate) bounty: u32,
    pub(crate) towers_built: u32,
    pub(crate) towers_rejected: u32,
    pub(crate) units_fallen: u32,
    pub(crate) waves_cleared: usize,
}

impl Tally {
    fn record(&mut self, event: &Event) {
        match event {
            Event::EnemyKilled { gold, .. } => {
                self.killed += 1;
                self.bounty = self.bounty.saturating_add(*gold);
            }
            Event::EnemyEscaped { .. } => self.escaped += 1,
            Event::TowerPlaced { tower, kind, spot } => {
                info!("built `{kind}` on spot {spot} as {tower:?}");
                self.towers_built += 1;
            }
            Event::TowerRejected { spot, reason } => {
                warn!("tower on spot {spot} rejected: {reason:?}");
                self.towers_rejected += 1;
            }
            Event::UnitFell { .. } => self.units_fallen += 1,
            Event::WaveStarted { wave } => info!("wave {} begins", wave + 1),
            Event::WaveCompleted { wave } => {
                info!("wave {} cleared", wave + 1);
                self.waves_cleared += 1;
            }
            _ => {}
        }
    }
}

/// Final state of a play-through.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Report {
    pub(crate) level: String,
    pub(crate) outcome: LevelOutcome,
    pub(crate) elapsed: f32,
    pub(crate) wave_count: usize,
    pub(crate) lives: u32,
    pub(crate) starting_lives: u32,
    pub(crate) gold: u32,
    pub(crate) tally: Tally,
}

impl Report {
    fn capture(world: &World, tally: Tally) -> Self {
        let level = query::level(world);
        Self {
            level: level.name.clone(),
            outcome: query::outcome(world),
            elapsed: query::elapsed(world),
            wave_count: query::wave_progress(world).total,
            lives: query::lives(world),
            starting_lives: level.starting_lives,
            gold: query::gold(world),
            tally,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            LevelOutcome::InProgress => String::from("still in progress"),
            LevelOutcome::Victory { stars } => format!("victory ({stars} stars)"),
            LevelOutcome::Defeat => String::from("defeat"),
        };
        writeln!(
            f,
            "level `{}`: {outcome} after {:.1}s",
            self.level, self.elapsed
        )?;
        writeln!(
            f,
            "waves cleared {}/{}, lives {}/{}, gold {}",
            self.tally.waves_cleared, self.wave_count, self.lives, self.starting_lives, self.gold
        )?;
        writeln!(
            f,
            "enemies killed {} (bounty {}), escaped {}",
            self.tally.killed, self.tally.bounty, self.tally.escaped
        )?;
        write!(
            f,
            "towers built {} (rejected {}), units fallen {}",
            self.tally.towers_built, self.tally.towers_rejected, self.tally.units_fallen
        )
    }
}

/// Plays `level` at a fixed step until it ends or `max_seconds` of simulated
/// time have passed.
pub(crate) fn play(
    catalog: Catalog,
    level: LevelDefinition,
    session: SessionConfig,
    orders: &[TowerOrder],
    max_seconds: f32,
) -> Result<Report> {
    let name = level.name.clone();
    let mut world =
        World::new(catalog, level, session).with_context(|| format!("level `{name}` cannot start"))?;
    let mut events = Vec::new();
    let mut tally = Tally::default();

    for order in orders {
        debug!("placing {order}");
        apply(
            &mut world,
            Command::PlaceTower {
                spot: order.spot,
                kind: order.kind.clone(),
            },
            &mut events,
        );
    }
    drain(&mut events, &mut tally);

    while query::outcome(&world) == LevelOutcome::InProgress && query::elapsed(&world) < max_seconds
    {
        apply(&mut world, Command::Tick { dt: TICK }, &mut events);
        drain(&mut events, &mut tally);
    }

    Ok(Report::capture(&world, tally))
}

fn drain(events: &mut Vec<Event>, tally: &mut Tally) {
    for event in events.drain(..) {
        if !matches!(event, Event::TimeAdvanced { .. }) {
            debug!("{event:?}");
        }
        tally.record(&event);
    }
}
