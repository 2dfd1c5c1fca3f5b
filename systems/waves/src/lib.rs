#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director that paces grouped enemy spawns and detects wave completion.

use std::collections::BTreeSet;

use log::{error, info, warn};
use rampart_core::{
    config::{Lenient, SpawnGroupDefinition, WaveDefinition},
    EnemySpawner, Event, SpawnError, SpawnRequest,
};

/// Count used when a group's count is missing or malformed.
pub const DEFAULT_GROUP_COUNT: u32 = 1;

/// Spawn interval in seconds used when a group's interval is missing or malformed.
pub const DEFAULT_SPAWN_INTERVAL: f32 = 1.0;

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    first_wave_delay: f32,
    default_enemy: Option<String>,
    known_enemies: BTreeSet<String>,
}

impl Config {
    /// Creates a configuration that waits `first_wave_delay` seconds before
    /// the first wave.
    #[must_use]
    pub fn new(first_wave_delay: f32) -> Self {
        Self {
            first_wave_delay: if first_wave_delay.is_finite() {
                first_wave_delay.max(0.0)
            } else {
                0.0
            },
            ..Self::default()
        }
    }

    /// Names the enemy type substituted for missing or unknown group types.
    #[must_use]
    pub fn with_default_enemy(mut self, enemy: &str) -> Self {
        self.default_enemy = Some(enemy.to_owned());
        self
    }

    /// Declares the enemy types the catalog can spawn.
    ///
    /// Without this list every named type is accepted as-is.
    #[must_use]
    pub fn with_known_enemies<I, S>(mut self, enemies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_enemies = enemies.into_iter().map(Into::into).collect();
        self
    }
}

/// Normalised group with its mutable spawn progress.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnGroup {
    /// Enemy type spawned by the group.
    pub enemy: String,
    /// Number of enemies the group releases.
    pub count: u32,
    /// Seconds between consecutive spawns.
    pub interval: f32,
    /// Path the enemies follow.
    pub path: usize,
    /// Hit point multiplier of the group.
    pub hp_multiplier: f32,
    spawned: u32,
    next_spawn: f32,
}

impl SpawnGroup {
    /// Number of spawn requests issued since the wave started.
    #[must_use]
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Reports whether every enemy of the group has been requested.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.spawned >= self.count
    }

    fn rewind(&mut self) {
        self.spawned = 0;
        self.next_spawn = 0.0;
    }
}

/// Phase of the director's state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// Waiting for the countdown before the current wave.
    Idle {
        /// Seconds left before the wave starts.
        countdown: f32,
    },
    /// Spawning and tracking the current wave.
    Active,
    /// Every wave has been cleared.
    Victory,
}

/// Per-level sequencer of enemy waves.
#[derive(Debug)]
pub struct WaveDirector {
    waves: Vec<Vec<SpawnGroup>>,
    current: usize,
    phase: Phase,
    first_wave_delay: f32,
}

impl WaveDirector {
    /// Builds the director from authored waves, defaulting malformed groups.
    #[must_use]
    pub fn new(definitions: &[WaveDefinition], config: &Config) -> Self {
        let waves = definitions
            .iter()
            .enumerate()
            .map(|(wave, definition)| {
                definition
                    .groups
                    .iter()
                    .enumerate()
                    .filter_map(|(group, raw)| normalise(raw, wave, group, config))
                    .collect()
            })
            .collect();

        Self {
            waves,
            current: 0,
            phase: Phase::Idle {
                countdown: config.first_wave_delay,
            },
            first_wave_delay: config.first_wave_delay,
        }
    }

    /// Advances the state machine by `dt` seconds.
    ///
    /// Spawn requests go to `spawner`; wave start, spawn and completion
    /// events are appended to `out`.
    pub fn tick<S>(&mut self, dt: f32, spawner: &mut S, out: &mut Vec<Event>)
    where
        S: EnemySpawner + ?Sized,
    {
        if let Phase::Idle { countdown } = self.phase {
            if self.current >= self.waves.len() {
                self.phase = Phase::Victory;
                info!("all {} waves cleared", self.waves.len());
                return;
            }
            let remaining = countdown - dt;
            if remaining > 0.0 {
                self.phase = Phase::Idle {
                    countdown: remaining,
                };
                return;
            }
            self.activate(out);
        }

        if self.phase != Phase::Active {
            return;
        }

        self.spawn_due(dt, spawner, out);
        self.check_completion(spawner, out);
    }

    fn activate(&mut self, out: &mut Vec<Event>) {
        let wave = self.current;
        if let Some(groups) = self.waves.get_mut(wave) {
            groups.iter_mut().for_each(SpawnGroup::rewind);
        }
        self.phase = Phase::Active;
        info!("wave {} started", wave + 1);
        out.push(Event::WaveStarted { wave });
    }

    fn spawn_due<S>(&mut self, dt: f32, spawner: &mut S, out: &mut Vec<Event>)
    where
        S: EnemySpawner + ?Sized,
    {
        let wave = self.current;
        let Some(groups) = self.waves.get_mut(wave) else {
            return;
        };
        for group in groups.iter_mut().filter(|group| !group.is_exhausted()) {
            group.next_spawn -= dt;
            if group.next_spawn > 0.0 {
                continue;
            }
            group.spawned += 1;
            group.next_spawn = group.interval;

            let request = SpawnRequest {
                enemy: group.enemy.clone(),
                hp_multiplier: group.hp_multiplier,
                path: group.path,
                wave,
            };
            match spawner.spawn(&request) {
                Ok(enemy) => out.push(Event::EnemySpawned { enemy, wave }),
                Err(SpawnError::NoPaths) => {
                    warn!("wave {}: spawn of `{}` aborted", wave + 1, group.enemy);
                }
                Err(SpawnError::Config(reason)) => {
                    error!("wave {}: cannot spawn `{}`: {reason}", wave + 1, group.enemy);
                }
            }
        }
    }

    fn check_completion<S>(&mut self, spawner: &S, out: &mut Vec<Event>)
    where
        S: EnemySpawner + ?Sized,
    {
        let wave = self.current;
        let exhausted = self
            .waves
            .get(wave)
            .map_or(true, |groups| groups.iter().all(SpawnGroup::is_exhausted));
        if !exhausted || spawner.live_in_wave(wave) > 0 {
            return;
        }

        info!("wave {} completed", wave + 1);
        out.push(Event::WaveCompleted { wave });
        self.current += 1;
        self.phase = if self.current < self.waves.len() {
            Phase::Idle { countdown: 0.0 }
        } else {
            info!("all {} waves cleared", self.waves.len());
            Phase::Victory
        };
    }

    /// Skips the remaining countdown so the next wave starts on the next tick.
    ///
    /// Returns `false` when no wave is waiting.
    pub fn call_early(&mut self) -> bool {
        match self.phase {
            Phase::Idle { .. } if self.current < self.waves.len() => {
                self.phase = Phase::Idle { countdown: 0.0 };
                true
            }
            _ => false,
        }
    }

    /// Rewinds to the first wave and restarts the initial countdown.
    pub fn reset(&mut self) {
        self.current = 0;
        self.phase = Phase::Idle {
            countdown: self.first_wave_delay,
        };
        self.waves
            .iter_mut()
            .flatten()
            .for_each(SpawnGroup::rewind);
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Zero-based index of the current (or next) wave.
    #[must_use]
    pub fn current_wave(&self) -> usize {
        self.current
    }

    /// Number of waves in the level.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Normalised groups of a wave.
    #[must_use]
    pub fn groups(&self, wave: usize) -> &[SpawnGroup] {
        self.waves.get(wave).map_or(&[][..], Vec::as_slice)
    }

    /// Reports whether every wave has been cleared.
    #[must_use]
    pub fn is_victorious(&self) -> bool {
        self.phase == Phase::Victory
    }
}

fn normalise(
    raw: &SpawnGroupDefinition,
    wave: usize,
    group: usize,
    config: &Config,
) -> Option<SpawnGroup> {
    let label = format!("wave {} group {}", wave + 1, group + 1);

    let named = valid(&raw.enemy).filter(|enemy| !enemy.is_empty());
    let enemy = match (named, &config.default_enemy) {
        (Some(enemy), Some(fallback))
            if !config.known_enemies.is_empty() && !config.known_enemies.contains(enemy) =>
        {
            warn!("{label}: unknown enemy `{enemy}`, using `{fallback}`");
            fallback.clone()
        }
        (Some(enemy), _) => enemy.clone(),
        (None, Some(fallback)) => {
            warn!("{label}: missing enemy type, using `{fallback}`");
            fallback.clone()
        }
        (None, None) => {
            warn!("{label}: missing enemy type and no default enemy; group skipped");
            return None;
        }
    };

    let count = valid(&raw.count).copied().unwrap_or_else(|| {
        warn!("{label}: invalid count, defaulting to {DEFAULT_GROUP_COUNT}");
        DEFAULT_GROUP_COUNT
    });
    let interval = valid(&raw.spawn_interval)
        .copied()
        .filter(|interval| interval.is_finite() && *interval >= 0.0)
        .unwrap_or_else(|| {
            warn!("{label}: invalid spawn interval, defaulting to {DEFAULT_SPAWN_INTERVAL}s");
            DEFAULT_SPAWN_INTERVAL
        });
    let path = match &raw.path {
        None => 0,
        Some(path) => path.valid().copied().unwrap_or_else(|| {
            warn!("{label}: invalid path index, defaulting to 0");
            0
        }),
    };
    let hp_multiplier = match &raw.hp_multiplier {
        None => 1.0,
        Some(multiplier) => multiplier
            .valid()
            .copied()
            .filter(|multiplier| multiplier.is_finite() && *multiplier > 0.0)
            .unwrap_or_else(|| {
                warn!("{label}: invalid hp multiplier, defaulting to 1");
                1.0
            }),
    };

    Some(SpawnGroup {
        enemy,
        count,
        interval,
        path,
        hp_multiplier,
        spawned: 0,
        next_spawn: 0.0,
    })
}

fn valid<T>(value: &Option<Lenient<T>>) -> Option<&T> {
    value.as_ref().and_then(Lenient::valid)
}
