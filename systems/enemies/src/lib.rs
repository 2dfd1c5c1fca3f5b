#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy lifecycle controller: spawning, path following and removal.

use std::collections::BTreeMap;

use log::warn;
use rampart_core::{
    config::{EnemyDefinition, EnemyStats},
    Cooldown, EnemyId, EnemySpawner, Mobile, SpawnError, SpawnRequest, Targetable, UnitId, Vec2,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Balancing factor applied to every enemy's base hit points.
pub const HP_BALANCE: f32 = 1.25;

/// Lower bound of the random factor applied to base speed.
pub const SPEED_SPREAD_MIN: f32 = 0.9;

/// Upper bound of the random factor applied to base speed.
pub const SPEED_SPREAD_MAX: f32 = 1.1;

/// Distance below which a waypoint counts as reached.
pub const WAYPOINT_TOLERANCE: f32 = 1.0;

/// Session-wide parameters of the roster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RosterSettings {
    /// Global multiplier applied to every enemy's hit points.
    pub difficulty: f32,
    /// Seed for the speed spread.
    pub rng_seed: u64,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            difficulty: 1.0,
            rng_seed: 0,
        }
    }
}

/// Reason an enemy left the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The enemy's hit points reached zero.
    Killed {
        /// Identifier of the killed enemy.
        enemy: EnemyId,
        /// Gold awarded for the kill.
        gold: u32,
    },
    /// The enemy crossed the map boundary.
    Escaped {
        /// Identifier of the escaped enemy.
        enemy: EnemyId,
    },
}

/// Single enemy walking a level path.
#[derive(Clone, Debug)]
pub struct Enemy {
    id: EnemyId,
    kind: String,
    wave: usize,
    position: Vec2,
    heading: Vec2,
    speed: f32,
    max_hp: f32,
    hp: f32,
    damage: f32,
    attack_interval: f32,
    cooldown: Cooldown,
    gold: u32,
    path: usize,
    waypoint: usize,
    engaged_by: Option<UnitId>,
}

impl Enemy {
    /// Identifier of the enemy.
    #[must_use]
    pub fn id(&self) -> EnemyId {
        self.id
    }

    /// Catalog identifier of the enemy type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Wave that spawned the enemy.
    #[must_use]
    pub fn wave(&self) -> usize {
        self.wave
    }

    /// Walking speed after spread.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Hit points at spawn.
    #[must_use]
    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    /// Melee damage dealt when retaliating.
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.damage
    }

    /// Gold awarded on kill.
    #[must_use]
    pub fn gold(&self) -> u32 {
        self.gold
    }

    /// Index of the path being followed.
    #[must_use]
    pub fn path(&self) -> usize {
        self.path
    }

    /// Index of the next waypoint on the path.
    #[must_use]
    pub fn waypoint(&self) -> usize {
        self.waypoint
    }

    /// Unit currently holding the enemy in melee.
    #[must_use]
    pub fn engaged_by(&self) -> Option<UnitId> {
        self.engaged_by
    }

    /// Records the enemy's side of an engagement link.
    ///
    /// The attack clock restarts so the first retaliation lands on contact.
    pub fn engage(&mut self, unit: UnitId) {
        self.engaged_by = Some(unit);
        self.cooldown = Cooldown::ready();
    }

    /// Clears the enemy's side of an engagement link.
    pub fn release(&mut self) {
        self.engaged_by = None;
    }

    /// Advances the retaliation clock, returning the damage dealt if it fired.
    pub fn retaliate(&mut self, dt: f32) -> Option<f32> {
        if !self.is_alive() || self.damage <= 0.0 {
            return None;
        }
        self.cooldown
            .advance(dt, self.attack_interval)
            .then_some(self.damage)
    }

    /// Spends `speed * dt` along the path, carrying leftover distance past
    /// each waypoint reached within the tick.
    fn advance(&mut self, dt: f32, path: &[Vec2]) {
        let mut step = self.speed * dt;
        while step > 0.0 {
            let Some(&waypoint) = path.get(self.waypoint) else {
                self.position += self.heading * step;
                return;
            };
            let offset = waypoint - self.position;
            let distance = offset.length();
            if distance > f32::EPSILON {
                self.heading = offset / distance;
            }
            if distance <= step {
                self.position = waypoint;
                self.waypoint += 1;
                step -= distance;
            } else if distance <= WAYPOINT_TOLERANCE {
                self.waypoint += 1;
            } else {
                self.position += self.heading * step;
                return;
            }
        }
    }
}

impl Mobile for Enemy {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    fn is_pinned(&self) -> bool {
        self.engaged_by.is_some()
    }
}

impl Targetable for Enemy {
    fn health(&self) -> f32 {
        self.hp
    }

    fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= amount;
        !self.is_alive()
    }
}

/// Owns every enemy on the field in spawn order.
#[derive(Debug)]
pub struct EnemyRoster {
    definitions: BTreeMap<String, EnemyDefinition>,
    paths: Vec<Vec<Vec2>>,
    settings: RosterSettings,
    rng: ChaCha8Rng,
    enemies: Vec<Enemy>,
    next_id: u32,
}

impl EnemyRoster {
    /// Creates an empty roster for the provided definitions and paths.
    #[must_use]
    pub fn new(
        definitions: BTreeMap<String, EnemyDefinition>,
        paths: Vec<Vec<Vec2>>,
        settings: RosterSettings,
    ) -> Self {
        Self {
            definitions,
            paths,
            settings,
            rng: ChaCha8Rng::seed_from_u64(settings.rng_seed),
            enemies: Vec::new(),
            next_id: 0,
        }
    }

    /// Removes every enemy and rewinds identifiers and randomness.
    pub fn reset(&mut self) {
        self.enemies.clear();
        self.next_id = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.settings.rng_seed);
    }

    /// Spawns a single enemy at the start of its path.
    ///
    /// Fails with a configuration error when the type is unknown or
    /// incomplete, and with [`SpawnError::NoPaths`] when the level has no path.
    pub fn spawn(&mut self, request: &SpawnRequest) -> Result<EnemyId, SpawnError> {
        let stats = self.stats(&request.enemy)?;
        if self.paths.iter().all(Vec::is_empty) {
            warn!("aborting spawn of `{}`: level has no paths", request.enemy);
            return Err(SpawnError::NoPaths);
        }

        let path = match self.paths.get(request.path) {
            Some(points) if !points.is_empty() => request.path,
            _ => {
                warn!(
                    "path {} does not exist; `{}` falls back to path 0",
                    request.path, request.enemy
                );
                0
            }
        };
        let Some(points) = self.paths.get(path).filter(|points| !points.is_empty()) else {
            warn!("aborting spawn of `{}`: path 0 is empty", request.enemy);
            return Err(SpawnError::NoPaths);
        };

        let start = points[0];
        let heading = points
            .get(1)
            .map(|next| (*next - start).normalize_or_zero())
            .filter(|heading| *heading != Vec2::ZERO)
            .unwrap_or(Vec2::X);
        let multiplier = positive_or_one(request.hp_multiplier, "hp multiplier", &request.enemy);
        let difficulty = positive_or_one(self.settings.difficulty, "difficulty", &request.enemy);
        let hp = stats.base_hp * HP_BALANCE * multiplier * difficulty;
        let spread = self.rng.gen_range(SPEED_SPREAD_MIN..=SPEED_SPREAD_MAX);

        let id = EnemyId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.enemies.push(Enemy {
            id,
            kind: request.enemy.clone(),
            wave: request.wave,
            position: start,
            heading,
            speed: stats.base_speed * spread,
            max_hp: hp,
            hp,
            damage: stats.damage,
            attack_interval: stats.attack_interval,
            cooldown: Cooldown::ready(),
            gold: stats.gold,
            path,
            waypoint: 1,
            engaged_by: None,
        });
        Ok(id)
    }

    fn stats(&self, kind: &str) -> Result<EnemyStats, SpawnError> {
        let definition = self
            .definitions
            .get(kind)
            .ok_or_else(|| rampart_core::config::ConfigError::UnknownEnemy(kind.to_owned()))?;
        Ok(definition.validate(kind)?)
    }

    /// Walks every living, unpinned enemy along its path.
    ///
    /// Enemies past their final waypoint keep drifting along their last
    /// heading until they leave the map.
    pub fn tick(&mut self, dt: f32) {
        for enemy in &mut self.enemies {
            if !enemy.is_alive() || enemy.is_pinned() {
                continue;
            }
            let path = self.paths.get(enemy.path).map_or(&[][..], Vec::as_slice);
            enemy.advance(dt, path);
        }
    }

    /// Removes dead and escaped enemies, reporting each removal once.
    ///
    /// Death is checked first, so an enemy killed before crossing
    /// `map_width` never counts as an escape.
    pub fn sweep(&mut self, map_width: f32, out: &mut Vec<Removal>) {
        self.enemies.retain(|enemy| {
            if !enemy.is_alive() {
                out.push(Removal::Killed {
                    enemy: enemy.id,
                    gold: enemy.gold,
                });
                false
            } else if enemy.position.x > map_width {
                out.push(Removal::Escaped { enemy: enemy.id });
                false
            } else {
                true
            }
        });
    }

    /// Enemies in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter()
    }

    /// Mutable enemies in spawn order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.enemies.iter_mut()
    }

    /// Looks up an enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.index(id).map(|index| &self.enemies[index])
    }

    /// Looks up an enemy mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.index(id).map(|index| &mut self.enemies[index])
    }

    fn index(&self, id: EnemyId) -> Option<usize> {
        self.enemies
            .binary_search_by_key(&id, |enemy| enemy.id)
            .ok()
    }

    /// Number of enemies on the field, dead or alive, awaiting the sweep.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Reports whether the field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Number of living enemies.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.enemies.iter().filter(|enemy| enemy.is_alive()).count()
    }

    /// Level paths enemies follow.
    #[must_use]
    pub fn paths(&self) -> &[Vec<Vec2>] {
        &self.paths
    }
}

impl EnemySpawner for EnemyRoster {
    fn spawn(&mut self, request: &SpawnRequest) -> Result<EnemyId, SpawnError> {
        EnemyRoster::spawn(self, request)
    }

    fn live_in_wave(&self, wave: usize) -> usize {
        self.enemies
            .iter()
            .filter(|enemy| enemy.wave == wave && enemy.is_alive())
            .count()
    }
}

fn positive_or_one(value: f32, what: &str, enemy: &str) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("{what} {value} for `{enemy}` is not a positive number; using 1");
        1.0
    }
}
