#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rampart simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the simulation systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point and runs the fixed tick pipeline, and
//! then broadcasts [`Event`] values for presentation and progression layers.
//! Systems only ever see the capability traits declared here ([`Mobile`],
//! [`Targetable`], [`MobileStore`], [`EnemySpawner`]) so that each of them can
//! be exercised in isolation.

pub mod config;
pub mod geometry;

use std::time::Duration;

pub use glam::Vec2;
use thiserror::Error;

use crate::config::ConfigError;

/// Slowest playback multiplier accepted by the simulation.
pub const MIN_GAME_SPEED: f32 = 0.5;

/// Fastest playback multiplier accepted by the simulation.
pub const MAX_GAME_SPEED: f32 = 4.0;

/// Clamps a requested playback multiplier into the supported range.
///
/// Non-finite requests fall back to normal speed.
#[must_use]
pub fn clamp_game_speed(multiplier: f32) -> f32 {
    if multiplier.is_finite() {
        multiplier.clamp(MIN_GAME_SPEED, MAX_GAME_SPEED)
    } else {
        1.0
    }
}

/// Unique identifier assigned to an enemy. Allocation order equals spawn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a melee unit (hero or soldier).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle used by the motion resolver to address any mobile entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MobileId {
    /// A hero or soldier owned by the unit roster.
    Unit(UnitId),
    /// An enemy owned by the enemy roster.
    Enemy(EnemyId),
}

impl From<UnitId> for MobileId {
    fn from(value: UnitId) -> Self {
        Self::Unit(value)
    }
}

impl From<EnemyId> for MobileId {
    fn from(value: EnemyId) -> Self {
        Self::Enemy(value)
    }
}

/// Movement-intent priority. Higher values win arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(u8);

impl Priority {
    /// Lowest tier. Completed or stopped records fall back to it.
    pub const IDLE: Self = Self(0);
    /// Returning to a gather point; any engagement pre-empts it.
    pub const GATHER: Self = Self(1);
    /// Explicit player orders such as "walk here".
    pub const ORDER: Self = Self(2);
    /// Closing distance to an engaged opponent.
    pub const COMBAT: Self = Self(3);

    /// Creates a priority from a raw tier value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the raw tier value.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Tag describing why a movement request was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveCategory {
    /// Returning to the unit's gather point.
    Gather,
    /// Closing in on an engaged opponent.
    Combat,
    /// Free roaming between points.
    Patrol,
    /// Direct player instruction.
    Order,
}

/// Countdown clock gating periodic attacks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cooldown {
    remaining: f32,
}

impl Cooldown {
    /// Creates a clock that fires on its next advance.
    #[must_use]
    pub const fn ready() -> Self {
        Self { remaining: 0.0 }
    }

    /// Seconds left before the clock fires.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Reports whether the clock has run out.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Counts down by `dt` and fires once the clock reaches zero.
    ///
    /// Firing re-arms the clock with `interval`.
    pub fn advance(&mut self, dt: f32, interval: f32) -> bool {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = interval;
            true
        } else {
            false
        }
    }

    /// Counts down by `dt` without firing, stopping at zero.
    pub fn cool(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Re-arms the clock with `interval`.
    pub fn trigger(&mut self, interval: f32) {
        self.remaining = interval;
    }
}

/// Capability shared by every actor that occupies a position in the world.
pub trait Mobile {
    /// Current position in world units.
    fn position(&self) -> Vec2;

    /// Overwrites the current position.
    fn set_position(&mut self, position: Vec2);

    /// Reports whether the actor is still alive.
    fn is_alive(&self) -> bool;

    /// Reports whether an engagement holds the actor in place.
    ///
    /// Pinned actors are skipped by every movement pass until released.
    fn is_pinned(&self) -> bool;
}

/// Capability of actors that can receive damage.
pub trait Targetable: Mobile {
    /// Remaining hit points.
    fn health(&self) -> f32;

    /// Subtracts `amount` from the remaining hit points.
    ///
    /// Returns `true` when this hit reduced a living actor to zero or below.
    fn apply_damage(&mut self, amount: f32) -> bool;
}

/// Lookup that resolves motion handles to live actors.
pub trait MobileStore {
    /// Returns the actor addressed by `id`, if it still exists.
    fn mobile_mut(&mut self, id: MobileId) -> Option<&mut dyn Mobile>;
}

/// Request for a single enemy spawn issued by the wave director.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Catalog identifier of the enemy type.
    pub enemy: String,
    /// Multiplier applied on top of the type's base hit points.
    pub hp_multiplier: f32,
    /// Index of the level path the enemy should follow.
    pub path: usize,
    /// Zero-based index of the wave that issued the request.
    pub wave: usize,
}

/// Reasons an enemy spawn can be refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SpawnError {
    /// The enemy definition is unknown or incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The level does not define any path to place the enemy on.
    #[error("level defines no paths to spawn enemies on")]
    NoPaths,
}

/// Seam between the wave director and the enemy lifecycle controller.
pub trait EnemySpawner {
    /// Spawns a single enemy according to the request.
    fn spawn(&mut self, request: &SpawnRequest) -> Result<EnemyId, SpawnError>;

    /// Number of live enemies that were spawned by the given wave.
    fn live_in_wave(&self, wave: usize) -> usize;
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided wall-clock delta.
    Tick {
        /// Real time elapsed since the previous frame, before speed scaling.
        dt: Duration,
    },
    /// Changes the playback multiplier applied to subsequent ticks.
    SetSpeed {
        /// Requested multiplier; clamped to the supported range.
        multiplier: f32,
    },
    /// Requests construction of a tower on one of the level's tower spots.
    PlaceTower {
        /// Index of the tower spot within the level definition.
        spot: usize,
        /// Catalog identifier of the tower type.
        kind: String,
    },
    /// Requests that a tower be sold for a partial refund.
    SellTower {
        /// Identifier of the tower to sell.
        tower: TowerId,
    },
    /// Orders the hero to walk to a location and hold it.
    MoveHero {
        /// Destination in world units.
        to: Vec2,
    },
    /// Moves the rally point of a barracks squad.
    SetRallyPoint {
        /// Barracks whose soldiers should regroup.
        tower: TowerId,
        /// New rally point in world units.
        to: Vec2,
    },
    /// Skips whatever countdown remains before the next wave.
    CallWaveEarly,
    /// Resets the level to its initial state.
    RestartLevel,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementError {
    /// The level has no tower spot with the requested index.
    UnknownSpot,
    /// Another tower already stands on the spot.
    SpotOccupied,
    /// The tower type is unknown or its definition is incomplete.
    InvalidDefinition,
    /// The player cannot afford the tower.
    InsufficientGold,
    /// The level is already won or lost.
    LevelOver,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Scaled simulated seconds that elapsed in the tick.
        dt: f32,
    },
    /// Announces that the playback multiplier changed.
    SpeedChanged {
        /// Multiplier applied from the next tick onwards.
        multiplier: f32,
    },
    /// Announces that the level (re)started.
    LevelStarted {
        /// Number of waves the level contains.
        waves: usize,
    },
    /// The wave director began spawning a wave.
    WaveStarted {
        /// Zero-based wave index.
        wave: usize,
    },
    /// Every enemy of the wave has spawned and left the field.
    WaveCompleted {
        /// Zero-based wave index.
        wave: usize,
    },
    /// An enemy entered the field.
    EnemySpawned {
        /// Identifier of the new enemy.
        enemy: EnemyId,
        /// Wave that spawned it.
        wave: usize,
    },
    /// An enemy was killed before escaping.
    EnemyKilled {
        /// Identifier of the killed enemy.
        enemy: EnemyId,
        /// Gold awarded for the kill.
        gold: u32,
    },
    /// An enemy crossed the map boundary.
    EnemyEscaped {
        /// Identifier of the escaped enemy.
        enemy: EnemyId,
    },
    /// The player's gold balance changed.
    GoldChanged {
        /// New gold balance.
        gold: u32,
    },
    /// The player's remaining lives changed.
    LivesChanged {
        /// Remaining lives.
        lives: u32,
    },
    /// A tower was placed on a spot.
    TowerPlaced {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Catalog identifier of the tower type.
        kind: String,
        /// Spot the tower occupies.
        spot: usize,
    },
    /// A tower placement request was rejected.
    TowerRejected {
        /// Spot named in the request.
        spot: usize,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// A tower was sold.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Gold refunded to the player.
        refund: u32,
    },
    /// A hero or soldier was killed.
    UnitFell {
        /// Identifier of the fallen unit.
        unit: UnitId,
    },
    /// A fallen unit returned to duty.
    UnitRevived {
        /// Identifier of the revived unit.
        unit: UnitId,
    },
    /// All waves were cleared.
    Victory {
        /// Star rating derived from the remaining lives (1 to 3).
        stars: u8,
    },
    /// The player ran out of lives.
    Defeat,
}
