#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for a Rampart level.
//!
//! The world owns every subsystem and runs them in a fixed order on each
//! tick: waves, enemy movement, engagement, motion, projectiles, tower fire,
//! removal, unit recovery and finally the victory and defeat checks. All
//! mutations go through [`apply`]; adapters read state through [`query`].

mod towers;

use std::time::Duration;

use log::{debug, error, info, warn};
use rampart_core::{
    clamp_game_speed,
    config::{Catalog, ConfigError, LevelDefinition, SessionConfig, TowerBehaviour, UnitStats},
    geometry::{closest_on_paths, is_finite_point},
    Command, Event, Mobile, MobileId, MobileStore, PlacementError, TowerId, UnitId, Vec2,
};
use rampart_system_enemies::{EnemyRoster, Removal, RosterSettings};
use rampart_system_engagement::{Engagement, Outcome as Clash, Unit, UnitRole, UnitRoster};
use rampart_system_motion::{Arrival, MotionError, MotionResolver, MoveRequest};
use rampart_system_projectiles::{Hit, Launch, ProjectileResolver};
use rampart_system_tower_combat::{Battery, TowerCombat};
use rampart_system_waves::{Config as WaveConfig, WaveDirector};
use thiserror::Error;

use towers::{formation_slot, TowerRegistry, TowerState};

/// Errors raised when a level cannot be started.
#[derive(Debug, Error)]
pub enum LevelError {
    /// A definition referenced by the level is unknown or incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The level does not contain a single usable path.
    #[error("level `{0}` defines no enemy paths")]
    NoPaths(String),
    /// The hero could not be registered for movement.
    #[error("hero cannot be placed: {0}")]
    Hero(#[from] MotionError),
}

/// Result of the level so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelOutcome {
    /// Waves are still coming.
    InProgress,
    /// Every wave was cleared.
    Victory {
        /// Star rating between 1 and 3.
        stars: u8,
    },
    /// The player ran out of lives.
    Defeat,
}

/// Star rating for finishing with `lives` out of `starting_lives`.
///
/// Keeping at least 90% of the lives earns three stars, at least half earns
/// two, anything else one.
#[must_use]
pub fn star_rating(lives: u32, starting_lives: u32) -> u8 {
    if starting_lives == 0 {
        return 3;
    }
    let kept = lives as f32 / starting_lives as f32;
    if kept >= 0.9 {
        3
    } else if kept >= 0.5 {
        2
    } else {
        1
    }
}

#[derive(Debug, Default)]
struct Scratch {
    clashes: Vec<Clash>,
    arrivals: Vec<Arrival>,
    hits: Vec<Hit>,
    launches: Vec<Launch>,
    removals: Vec<Removal>,
    revived: Vec<UnitId>,
}

/// Mobile lookup spanning both unit and enemy collections.
struct Bodies<'a> {
    units: &'a mut UnitRoster,
    enemies: &'a mut EnemyRoster,
}

impl MobileStore for Bodies<'_> {
    fn mobile_mut(&mut self, id: MobileId) -> Option<&mut dyn Mobile> {
        match id {
            MobileId::Unit(_) => self.units.mobile_mut(id),
            MobileId::Enemy(enemy) => self
                .enemies
                .get_mut(enemy)
                .map(|enemy| enemy as &mut dyn Mobile),
        }
    }
}

/// Represents the authoritative state of one level session.
#[derive(Debug)]
pub struct World {
    catalog: Catalog,
    level: LevelDefinition,
    paths: Vec<Vec<Vec2>>,
    speed: f32,
    gold: u32,
    lives: u32,
    outcome: LevelOutcome,
    elapsed: f32,
    hero: Option<UnitId>,
    motion: MotionResolver,
    enemies: EnemyRoster,
    units: UnitRoster,
    engagement: Engagement,
    waves: WaveDirector,
    projectiles: ProjectileResolver,
    combat: TowerCombat,
    batteries: Vec<Battery>,
    towers: TowerRegistry,
    scratch: Scratch,
}

impl World {
    /// Creates a session for `level`, validating what it references.
    ///
    /// Fails when the level has no path or names a hero the catalog cannot
    /// provide.
    pub fn new(
        catalog: Catalog,
        level: LevelDefinition,
        session: SessionConfig,
    ) -> Result<Self, LevelError> {
        let paths = level.polylines();
        if paths.iter().all(Vec::is_empty) {
            return Err(LevelError::NoPaths(level.name.clone()));
        }

        let difficulty = if session.difficulty.is_finite() && session.difficulty > 0.0 {
            session.difficulty
        } else {
            warn!(
                "difficulty {} is not a positive number; using 1",
                session.difficulty
            );
            1.0
        };
        let enemies = EnemyRoster::new(
            catalog.enemies.clone(),
            paths.clone(),
            RosterSettings {
                difficulty,
                rng_seed: session.rng_seed,
            },
        );

        let mut wave_config = WaveConfig::new(session.first_wave_delay)
            .with_known_enemies(catalog.enemies.keys().cloned());
        let default_enemy = level
            .default_enemy
            .as_deref()
            .or_else(|| catalog.enemies.keys().next().map(String::as_str));
        if let Some(enemy) = default_enemy {
            wave_config = wave_config.with_default_enemy(enemy);
        }
        let waves = WaveDirector::new(&level.waves, &wave_config);

        let mut world = Self {
            speed: clamp_game_speed(session.speed),
            gold: level.starting_gold,
            lives: level.starting_lives,
            outcome: LevelOutcome::InProgress,
            elapsed: 0.0,
            hero: None,
            motion: MotionResolver::new(),
            enemies,
            units: UnitRoster::new(),
            engagement: Engagement::new(),
            waves,
            projectiles: ProjectileResolver::new(),
            combat: TowerCombat::new(),
            batteries: Vec::new(),
            towers: TowerRegistry::new(),
            scratch: Scratch::default(),
            catalog,
            level,
            paths,
        };
        world.enlist_hero()?;
        info!(
            "level `{}` ready with {} waves",
            world.level.name,
            world.waves.wave_count()
        );
        Ok(world)
    }

    fn enlist_hero(&mut self) -> Result<(), LevelError> {
        let Some(kind) = self.level.hero.clone() else {
            return Ok(());
        };
        let stats = self.catalog.unit(&kind)?;
        let start = self.level.hero_start.map_or_else(
            || Vec2::new(self.level.width * 0.5, self.level.height * 0.5),
            Vec2::from,
        );
        let id = self
            .units
            .enlist(&kind, UnitRole::Hero, stats, start, start, &mut self.motion)?;
        self.hero = Some(id);
        Ok(())
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        if self.outcome != LevelOutcome::InProgress {
            return;
        }
        let dt = dt.as_secs_f32() * self.speed;
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.elapsed += dt;
        out.push(Event::TimeAdvanced { dt });

        self.waves.tick(dt, &mut self.enemies, out);
        self.enemies.tick(dt);

        let scratch = &mut self.scratch;
        scratch.clashes.clear();
        self.engagement.tick(
            dt,
            &mut self.units,
            &mut self.enemies,
            &mut self.motion,
            &mut scratch.clashes,
        );
        for clash in &scratch.clashes {
            match *clash {
                Clash::UnitFell { unit, enemy } => {
                    info!("unit {unit:?} fell to enemy {enemy:?}");
                    out.push(Event::UnitFell { unit });
                }
                Clash::EnemySlain { unit, enemy } => {
                    debug!("unit {unit:?} slew enemy {enemy:?}");
                }
                Clash::Linked { .. } | Clash::Unlinked { .. } => {}
            }
        }

        scratch.arrivals.clear();
        let mut bodies = Bodies {
            units: &mut self.units,
            enemies: &mut self.enemies,
        };
        self.motion.tick(dt, &mut bodies, &mut scratch.arrivals);
        for arrival in &scratch.arrivals {
            debug!("{:?} reached {}", arrival.id, arrival.position);
        }

        scratch.hits.clear();
        self.projectiles
            .tick(dt, &mut self.enemies, &mut scratch.hits);
        for hit in scratch.hits.iter().filter(|hit| hit.lethal) {
            debug!("projectile {:?} killed {:?}", hit.projectile, hit.enemy);
        }

        scratch.launches.clear();
        self.combat
            .handle(dt, &mut self.batteries, &self.enemies, &mut scratch.launches);
        for launch in scratch.launches.drain(..) {
            let _ = self.projectiles.spawn(launch);
        }

        scratch.removals.clear();
        self.enemies.sweep(self.level.width, &mut scratch.removals);
        for removal in scratch.removals.drain(..) {
            match removal {
                Removal::Killed { enemy, gold } => {
                    out.push(Event::EnemyKilled { enemy, gold });
                    if gold > 0 {
                        self.gold = self.gold.saturating_add(gold);
                        out.push(Event::GoldChanged { gold: self.gold });
                    }
                }
                Removal::Escaped { enemy } => {
                    self.lives = self.lives.saturating_sub(1);
                    info!("enemy {enemy:?} escaped; {} lives left", self.lives);
                    out.push(Event::EnemyEscaped { enemy });
                    out.push(Event::LivesChanged { lives: self.lives });
                }
            }
        }

        scratch.revived.clear();
        self.units
            .recover(dt, &mut self.motion, &mut scratch.revived);
        for &unit in &scratch.revived {
            out.push(Event::UnitRevived { unit });
        }

        self.resolve_outcome(out);
    }

    fn resolve_outcome(&mut self, out: &mut Vec<Event>) {
        if self.lives == 0 {
            self.outcome = LevelOutcome::Defeat;
            info!("defeat after {:.1}s", self.elapsed);
            out.push(Event::Defeat);
        } else if self.waves.is_victorious() {
            let stars = star_rating(self.lives, self.level.starting_lives);
            self.outcome = LevelOutcome::Victory { stars };
            info!("victory with {stars} stars after {:.1}s", self.elapsed);
            out.push(Event::Victory { stars });
        }
    }

    fn place_tower(
        &mut self,
        spot: usize,
        kind: &str,
        out: &mut Vec<Event>,
    ) -> Result<TowerId, PlacementError> {
        if self.outcome != LevelOutcome::InProgress {
            return Err(PlacementError::LevelOver);
        }
        let position = query::tower_spot(self, spot).ok_or(PlacementError::UnknownSpot)?;
        if self.towers.occupant(spot).is_some() {
            return Err(PlacementError::SpotOccupied);
        }
        let stats = self.catalog.tower(kind).map_err(|reason| {
            error!("cannot build `{kind}`: {reason}");
            PlacementError::InvalidDefinition
        })?;
        let squad = match &stats.behaviour {
            TowerBehaviour::Barracks(barracks) => {
                let soldier = self.catalog.unit(&barracks.soldier).map_err(|reason| {
                    error!("cannot train soldiers for `{kind}`: {reason}");
                    PlacementError::InvalidDefinition
                })?;
                Some(soldier)
            }
            TowerBehaviour::Ranged(_) => None,
        };
        if self.gold < stats.cost {
            return Err(PlacementError::InsufficientGold);
        }

        self.gold -= stats.cost;
        let id = self.towers.allocate();
        let rally = match (&stats.behaviour, squad) {
            (TowerBehaviour::Ranged(ranged), _) => {
                self.batteries.push(Battery::new(id, position, *ranged));
                None
            }
            (TowerBehaviour::Barracks(barracks), Some(soldier)) => {
                let rally = closest_on_paths(position, self.paths.iter().map(Vec::as_slice))
                    .unwrap_or(position);
                self.train_squad(id, position, rally, &barracks.soldier, soldier, barracks.squad_size);
                Some(rally)
            }
            (TowerBehaviour::Barracks(_), None) => None,
        };
        self.towers.insert(TowerState {
            id,
            kind: kind.to_owned(),
            role: stats.role,
            spot,
            position,
            cost: stats.cost,
            rally,
        });

        info!("built `{kind}` as {id:?} on spot {spot}");
        out.push(Event::TowerPlaced {
            tower: id,
            kind: kind.to_owned(),
            spot,
        });
        out.push(Event::GoldChanged { gold: self.gold });
        Ok(id)
    }

    fn train_squad(
        &mut self,
        barracks: TowerId,
        home: Vec2,
        rally: Vec2,
        kind: &str,
        stats: UnitStats,
        size: u32,
    ) {
        for index in 0..size {
            let post = formation_slot(rally, index, size);
            let role = UnitRole::Soldier { barracks };
            if let Err(reason) = self
                .units
                .enlist(kind, role, stats, home, post, &mut self.motion)
            {
                warn!("barracks {barracks:?} could not train a soldier: {reason}");
            }
        }
    }

    fn sell_tower(&mut self, tower: TowerId, out: &mut Vec<Event>) {
        if self.outcome != LevelOutcome::InProgress {
            debug!("ignoring sale of {tower:?}: level is over");
            return;
        }
        let Some(state) = self.towers.remove(tower) else {
            debug!("ignoring sale of unknown tower {tower:?}");
            return;
        };
        if let Ok(index) = self
            .batteries
            .binary_search_by_key(&tower, Battery::tower)
        {
            let _ = self.batteries.remove(index);
        }
        let squad: Vec<UnitId> = self.units.squad(tower).map(Unit::id).collect();
        for unit in squad {
            let _ = self
                .units
                .discharge(unit, &mut self.motion, &mut self.enemies);
        }

        let refund = state.refund();
        self.gold = self.gold.saturating_add(refund);
        info!("sold {tower:?} on spot {} for {refund} gold", state.spot);
        out.push(Event::TowerSold { tower, refund });
        out.push(Event::GoldChanged { gold: self.gold });
    }

    fn move_hero(&mut self, to: Vec2) {
        if !is_finite_point(to) {
            debug!("ignoring non-finite hero destination {to}");
            return;
        }
        let Some(hero) = self.hero else {
            debug!("ignoring hero order: level has no hero");
            return;
        };
        self.units.set_gather_point(hero, to);
        self.motion
            .set_target(MobileId::Unit(hero), to, MoveRequest::order());
    }

    fn set_rally_point(&mut self, tower: TowerId, to: Vec2) {
        if !is_finite_point(to) {
            debug!("ignoring non-finite rally point {to}");
            return;
        }
        match self.towers.get_mut(tower) {
            Some(state) if state.rally.is_some() => state.rally = Some(to),
            Some(_) => {
                debug!("ignoring rally point for {tower:?}: not a barracks");
                return;
            }
            None => {
                debug!("ignoring rally point for unknown tower {tower:?}");
                return;
            }
        }

        let squad: Vec<UnitId> = self.units.squad(tower).map(Unit::id).collect();
        let size = u32::try_from(squad.len()).unwrap_or(u32::MAX);
        for (index, unit) in (0..size).zip(squad) {
            self.units
                .set_gather_point(unit, formation_slot(to, index, size));
        }
    }

    fn restart(&mut self, out: &mut Vec<Event>) {
        self.projectiles.clear();
        self.enemies.reset();
        self.units.clear(&mut self.motion);
        self.batteries.clear();
        self.towers.clear();
        self.waves.reset();
        self.gold = self.level.starting_gold;
        self.lives = self.level.starting_lives;
        self.outcome = LevelOutcome::InProgress;
        self.elapsed = 0.0;
        self.hero = None;
        if let Err(reason) = self.enlist_hero() {
            error!("hero could not rejoin the level: {reason}");
        }

        info!("level `{}` restarted", self.level.name);
        out.push(Event::LevelStarted {
            waves: self.waves.wave_count(),
        });
        out.push(Event::GoldChanged { gold: self.gold });
        out.push(Event::LivesChanged { lives: self.lives });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SetSpeed { multiplier } => {
            world.speed = clamp_game_speed(multiplier);
            out_events.push(Event::SpeedChanged {
                multiplier: world.speed,
            });
        }
        Command::PlaceTower { spot, kind } => {
            if let Err(reason) = world.place_tower(spot, &kind, out_events) {
                warn!("rejected `{kind}` on spot {spot}: {reason:?}");
                out_events.push(Event::TowerRejected { spot, reason });
            }
        }
        Command::SellTower { tower } => world.sell_tower(tower, out_events),
        Command::MoveHero { to } => world.move_hero(to),
        Command::SetRallyPoint { tower, to } => world.set_rally_point(tower, to),
        Command::CallWaveEarly => {
            if !world.waves.call_early() {
                debug!("no wave is waiting to be called");
            }
        }
        Command::RestartLevel => world.restart(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use rampart_core::{
        config::{LevelDefinition, TowerRole},
        EnemyId, Mobile, MobileId, Targetable, TowerId, UnitId, Vec2,
    };
    use rampart_system_engagement::{EngagementState, UnitRole};
    use rampart_system_motion::MovementRecord;
    use rampart_system_projectiles::ProjectileId;
    use rampart_system_tower_combat::Battery;
    use rampart_system_waves::Phase;

    use super::{LevelOutcome, World};

    /// Gold available to the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Lives left before defeat.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Result of the level so far.
    #[must_use]
    pub fn outcome(world: &World) -> LevelOutcome {
        world.outcome
    }

    /// Playback multiplier applied to ticks.
    #[must_use]
    pub fn speed(world: &World) -> f32 {
        world.speed
    }

    /// Simulated seconds since the level (re)started.
    #[must_use]
    pub fn elapsed(world: &World) -> f32 {
        world.elapsed
    }

    /// Level being played.
    #[must_use]
    pub fn level(world: &World) -> &LevelDefinition {
        &world.level
    }

    /// World position of a tower spot.
    #[must_use]
    pub fn tower_spot(world: &World, spot: usize) -> Option<Vec2> {
        world.level.tower_spots.get(spot).copied().map(Vec2::from)
    }

    /// Progress through the level's waves.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct WaveProgress {
        /// Zero-based index of the current or next wave.
        pub current: usize,
        /// Number of waves in the level.
        pub total: usize,
        /// Phase of the wave director.
        pub phase: Phase,
    }

    /// Reports how far the level has progressed through its waves.
    #[must_use]
    pub fn wave_progress(world: &World) -> WaveProgress {
        WaveProgress {
            current: world.waves.current_wave(),
            total: world.waves.wave_count(),
            phase: world.waves.phase(),
        }
    }

    /// Read-only snapshot of an enemy.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Identifier of the enemy.
        pub id: EnemyId,
        /// Catalog identifier of the enemy type.
        pub kind: String,
        /// Wave that spawned the enemy.
        pub wave: usize,
        /// Current position.
        pub position: Vec2,
        /// Remaining hit points.
        pub health: f32,
        /// Hit points at spawn.
        pub max_hp: f32,
        /// Unit holding the enemy in melee.
        pub engaged_by: Option<UnitId>,
    }

    /// Captures every enemy on the field in spawn order.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<EnemySnapshot> {
        world
            .enemies
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id(),
                kind: enemy.kind().to_owned(),
                wave: enemy.wave(),
                position: enemy.position(),
                health: enemy.health(),
                max_hp: enemy.max_hp(),
                engaged_by: enemy.engaged_by(),
            })
            .collect()
    }

    /// Read-only snapshot of a hero or soldier.
    #[derive(Clone, Debug, PartialEq)]
    pub struct UnitSnapshot {
        /// Identifier of the unit.
        pub id: UnitId,
        /// Catalog identifier of the unit type.
        pub kind: String,
        /// Who the unit answers to.
        pub role: UnitRole,
        /// Current position.
        pub position: Vec2,
        /// Remaining hit points.
        pub health: f32,
        /// Melee state after the last engagement pass.
        pub state: EngagementState,
        /// Enemy the unit is linked to.
        pub opponent: Option<EnemyId>,
        /// Point the unit returns to when idle.
        pub gather_point: Vec2,
        /// Seconds until a fallen unit revives.
        pub respawn_in: Option<f32>,
    }

    /// Captures every hero and soldier in registration order.
    #[must_use]
    pub fn units(world: &World) -> Vec<UnitSnapshot> {
        world.units.iter().map(snapshot_unit).collect()
    }

    /// Captures the hero, if the level fields one.
    #[must_use]
    pub fn hero(world: &World) -> Option<UnitSnapshot> {
        world.units.hero().map(snapshot_unit)
    }

    fn snapshot_unit(unit: &rampart_system_engagement::Unit) -> UnitSnapshot {
        UnitSnapshot {
            id: unit.id(),
            kind: unit.kind().to_owned(),
            role: unit.role(),
            position: unit.position(),
            health: unit.health(),
            state: unit.state(),
            opponent: unit.opponent(),
            gather_point: unit.gather_point(),
            respawn_in: unit.respawn_in(),
        }
    }

    /// Read-only snapshot of a tower.
    #[derive(Clone, Debug, PartialEq)]
    pub struct TowerSnapshot {
        /// Identifier of the tower.
        pub id: TowerId,
        /// Catalog identifier of the tower type.
        pub kind: String,
        /// Role of the tower type.
        pub role: TowerRole,
        /// Tower spot the tower occupies.
        pub spot: usize,
        /// Position of the tower.
        pub position: Vec2,
        /// Rally point of a barracks squad.
        pub rally: Option<Vec2>,
        /// Seconds until a ranged tower may fire again.
        pub ready_in: Option<f32>,
    }

    /// Captures every tower ordered by identifier.
    #[must_use]
    pub fn towers(world: &World) -> Vec<TowerSnapshot> {
        world
            .towers
            .iter()
            .map(|state| TowerSnapshot {
                id: state.id,
                kind: state.kind.clone(),
                role: state.role,
                spot: state.spot,
                position: state.position,
                rally: state.rally,
                ready_in: world
                    .batteries
                    .binary_search_by_key(&state.id, Battery::tower)
                    .ok()
                    .and_then(|index| world.batteries.get(index))
                    .map(Battery::ready_in),
            })
            .collect()
    }

    /// Read-only snapshot of a projectile in flight.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ProjectileSnapshot {
        /// Identifier of the projectile.
        pub id: ProjectileId,
        /// Current position.
        pub position: Vec2,
        /// Point the projectile will land on.
        pub target_point: Vec2,
        /// Enemy the projectile was aimed at.
        pub target: EnemyId,
        /// Splash radius, if any.
        pub splash_radius: Option<f32>,
    }

    /// Captures every projectile in flight, oldest first.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| ProjectileSnapshot {
                id: projectile.id,
                position: projectile.position,
                target_point: projectile.launch.target_point,
                target: projectile.launch.target,
                splash_radius: projectile.launch.splash_radius,
            })
            .collect()
    }

    /// Movement record of a unit, as arbitrated by the motion resolver.
    #[must_use]
    pub fn movement(world: &World, unit: UnitId) -> Option<MovementRecord> {
        world.motion.record(MobileId::Unit(unit)).copied()
    }
}
