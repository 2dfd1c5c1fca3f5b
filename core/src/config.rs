//! Static content records consumed by the simulation.
//!
//! Definitions keep every stat optional at parse time. Required stats are
//! enforced when a definition is used, so a broken enemy or tower surfaces as
//! a [`ConfigError`] at the exact spawn or placement that needed it rather
//! than as a physically meaningless entity.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{de::IgnoredAny, Deserialize};
use thiserror::Error;

use crate::geometry::Point;

/// Engagement radius applied when a unit definition does not specify one.
pub const DEFAULT_ENGAGEMENT_RADIUS: f32 = 60.0;

/// Strike range applied when a unit definition does not specify one.
pub const DEFAULT_STRIKE_RANGE: f32 = 12.0;

/// Seconds a fallen unit waits before reviving when unspecified.
pub const DEFAULT_RESPAWN_SECONDS: f32 = 10.0;

/// Soldiers trained by a barracks when unspecified.
pub const DEFAULT_SQUAD_SIZE: u32 = 3;

/// Errors raised when a definition lacks data the simulation requires.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// No enemy definition exists with the requested identifier.
    #[error("unknown enemy type `{0}`")]
    UnknownEnemy(String),
    /// No tower definition exists with the requested identifier.
    #[error("unknown tower type `{0}`")]
    UnknownTower(String),
    /// No unit definition exists with the requested identifier.
    #[error("unknown unit type `{0}`")]
    UnknownUnit(String),
    /// A required field is absent from a definition.
    #[error("{kind} `{name}` is missing required field `{field}`")]
    MissingField {
        /// Category of the definition (enemy, tower, unit).
        kind: &'static str,
        /// Catalog identifier of the definition.
        name: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field holds a value the simulation cannot use.
    #[error("{kind} `{name}` has invalid `{field}` value {value}")]
    InvalidField {
        /// Category of the definition (enemy, tower, unit).
        kind: &'static str,
        /// Catalog identifier of the definition.
        name: String,
        /// Name of the offending field.
        field: &'static str,
        /// Offending value.
        value: f32,
    },
}

/// Every static definition the simulation may look up by identifier.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Catalog {
    /// Enemy definitions keyed by type identifier.
    #[serde(default)]
    pub enemies: BTreeMap<String, EnemyDefinition>,
    /// Tower definitions keyed by type identifier.
    #[serde(default)]
    pub towers: BTreeMap<String, TowerDefinition>,
    /// Hero and soldier definitions keyed by type identifier.
    #[serde(default)]
    pub units: BTreeMap<String, UnitDefinition>,
}

impl Catalog {
    /// Resolves and validates an enemy definition.
    pub fn enemy(&self, id: &str) -> Result<EnemyStats, ConfigError> {
        self.enemies
            .get(id)
            .ok_or_else(|| ConfigError::UnknownEnemy(id.to_owned()))?
            .validate(id)
    }

    /// Resolves and validates a tower definition.
    pub fn tower(&self, id: &str) -> Result<TowerStats, ConfigError> {
        self.towers
            .get(id)
            .ok_or_else(|| ConfigError::UnknownTower(id.to_owned()))?
            .validate(id)
    }

    /// Resolves and validates a hero or soldier definition.
    pub fn unit(&self, id: &str) -> Result<UnitStats, ConfigError> {
        self.units
            .get(id)
            .ok_or_else(|| ConfigError::UnknownUnit(id.to_owned()))?
            .validate(id)
    }
}

/// Raw enemy record as authored in content files.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnemyDefinition {
    /// Hit points before balancing and wave multipliers.
    #[serde(alias = "baseHp")]
    pub base_hp: Option<f32>,
    /// Melee damage dealt when retaliating.
    pub damage: Option<f32>,
    /// Seconds between melee strikes.
    #[serde(alias = "attackInterval")]
    pub attack_interval: Option<f32>,
    /// Walking speed in world units per second before spread.
    #[serde(alias = "baseSpeed")]
    pub base_speed: Option<f32>,
    /// Gold awarded on kill.
    pub gold: Option<u32>,
}

impl EnemyDefinition {
    /// Creates a complete definition.
    #[must_use]
    pub fn new(base_hp: f32, damage: f32, attack_interval: f32, base_speed: f32) -> Self {
        Self {
            base_hp: Some(base_hp),
            damage: Some(damage),
            attack_interval: Some(attack_interval),
            base_speed: Some(base_speed),
            gold: None,
        }
    }

    /// Sets the gold reward.
    #[must_use]
    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = Some(gold);
        self
    }

    /// Checks that every required stat is present and usable.
    pub fn validate(&self, name: &str) -> Result<EnemyStats, ConfigError> {
        let field = Field::new("enemy", name);
        Ok(EnemyStats {
            base_hp: field.positive("base_hp", self.base_hp)?,
            damage: field.non_negative("damage", self.damage)?,
            attack_interval: field.positive("attack_interval", self.attack_interval)?,
            base_speed: field.positive("base_speed", self.base_speed)?,
            gold: self.gold.unwrap_or(0),
        })
    }
}

/// Validated enemy stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Hit points before balancing and wave multipliers.
    pub base_hp: f32,
    /// Melee damage dealt when retaliating.
    pub damage: f32,
    /// Seconds between melee strikes.
    pub attack_interval: f32,
    /// Walking speed before spread.
    pub base_speed: f32,
    /// Gold awarded on kill.
    pub gold: u32,
}

/// Raw hero or soldier record.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnitDefinition {
    /// Display name.
    pub name: Option<String>,
    /// Maximum hit points.
    #[serde(alias = "hp", alias = "maxHp")]
    pub max_hp: Option<f32>,
    /// Melee damage per strike.
    pub damage: Option<f32>,
    /// Walking speed in world units per second.
    pub speed: Option<f32>,
    /// Seconds between melee strikes.
    #[serde(alias = "attackInterval")]
    pub attack_interval: Option<f32>,
    /// Distance within which an idle unit picks a fight.
    #[serde(alias = "engagementRadius")]
    pub engagement_radius: Option<f32>,
    /// Distance within which an engaged unit stops closing and strikes.
    #[serde(alias = "strikeRange")]
    pub strike_range: Option<f32>,
    /// Seconds before a fallen unit revives.
    pub respawn: Option<f32>,
}

impl UnitDefinition {
    /// Creates a complete definition with default reach and respawn values.
    #[must_use]
    pub fn new(max_hp: f32, damage: f32, speed: f32, attack_interval: f32) -> Self {
        Self {
            max_hp: Some(max_hp),
            damage: Some(damage),
            speed: Some(speed),
            attack_interval: Some(attack_interval),
            ..Self::default()
        }
    }

    /// Overrides engagement radius and strike range.
    #[must_use]
    pub fn with_reach(mut self, engagement_radius: f32, strike_range: f32) -> Self {
        self.engagement_radius = Some(engagement_radius);
        self.strike_range = Some(strike_range);
        self
    }

    /// Checks that every required stat is present and usable.
    pub fn validate(&self, name: &str) -> Result<UnitStats, ConfigError> {
        let field = Field::new("unit", name);
        Ok(UnitStats {
            max_hp: field.positive("max_hp", self.max_hp)?,
            damage: field.non_negative("damage", self.damage)?,
            speed: field.positive("speed", self.speed)?,
            attack_interval: field.positive("attack_interval", self.attack_interval)?,
            engagement_radius: field.positive(
                "engagement_radius",
                Some(self.engagement_radius.unwrap_or(DEFAULT_ENGAGEMENT_RADIUS)),
            )?,
            strike_range: field.positive(
                "strike_range",
                Some(self.strike_range.unwrap_or(DEFAULT_STRIKE_RANGE)),
            )?,
            respawn: field.non_negative(
                "respawn",
                Some(self.respawn.unwrap_or(DEFAULT_RESPAWN_SECONDS)),
            )?,
        })
    }
}

/// Validated hero or soldier stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitStats {
    /// Maximum hit points.
    pub max_hp: f32,
    /// Melee damage per strike.
    pub damage: f32,
    /// Walking speed.
    pub speed: f32,
    /// Seconds between melee strikes.
    pub attack_interval: f32,
    /// Distance within which an idle unit picks a fight.
    pub engagement_radius: f32,
    /// Distance within which an engaged unit strikes.
    pub strike_range: f32,
    /// Seconds before a fallen unit revives.
    pub respawn: f32,
}

/// Broad behaviour of a tower type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerRole {
    /// Fires single-target projectiles.
    Archer,
    /// Lobs splash projectiles.
    Artillery,
    /// Trains a squad of melee soldiers.
    Barracks,
}

/// Raw tower record.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TowerDefinition {
    /// Display name.
    pub name: Option<String>,
    /// Behaviour of the tower.
    pub role: Option<TowerRole>,
    /// Gold required to build the tower.
    pub cost: Option<u32>,
    /// Targeting radius for firing towers.
    pub range: Option<f32>,
    /// Damage carried by each projectile.
    pub damage: Option<f32>,
    /// Seconds between shots.
    #[serde(alias = "attackInterval")]
    pub attack_interval: Option<f32>,
    /// Projectile travel speed.
    #[serde(alias = "projectileSpeed")]
    pub projectile_speed: Option<f32>,
    /// Splash radius for artillery.
    #[serde(alias = "splashRadius")]
    pub splash_radius: Option<f32>,
    /// Unit identifier trained by barracks.
    pub soldier: Option<String>,
    /// Number of soldiers trained by barracks.
    #[serde(alias = "squadSize")]
    pub squad_size: Option<u32>,
}

impl TowerDefinition {
    /// Creates a firing tower definition.
    #[must_use]
    pub fn ranged(
        role: TowerRole,
        cost: u32,
        range: f32,
        damage: f32,
        attack_interval: f32,
        projectile_speed: f32,
    ) -> Self {
        Self {
            role: Some(role),
            cost: Some(cost),
            range: Some(range),
            damage: Some(damage),
            attack_interval: Some(attack_interval),
            projectile_speed: Some(projectile_speed),
            ..Self::default()
        }
    }

    /// Creates a barracks definition training `squad_size` soldiers of `soldier`.
    #[must_use]
    pub fn barracks(cost: u32, soldier: &str, squad_size: u32) -> Self {
        Self {
            role: Some(TowerRole::Barracks),
            cost: Some(cost),
            soldier: Some(soldier.to_owned()),
            squad_size: Some(squad_size),
            ..Self::default()
        }
    }

    /// Sets the splash radius.
    #[must_use]
    pub fn with_splash(mut self, radius: f32) -> Self {
        self.splash_radius = Some(radius);
        self
    }

    /// Checks that every stat required by the tower's role is present.
    pub fn validate(&self, name: &str) -> Result<TowerStats, ConfigError> {
        let field = Field::new("tower", name);
        let role = self.role.ok_or_else(|| field.missing("role"))?;
        let cost = self.cost.ok_or_else(|| field.missing("cost"))?;

        let behaviour = match role {
            TowerRole::Archer | TowerRole::Artillery => {
                let splash_radius = match role {
                    TowerRole::Artillery => {
                        Some(field.positive("splash_radius", self.splash_radius)?)
                    }
                    _ => None,
                };
                TowerBehaviour::Ranged(RangedStats {
                    range: field.positive("range", self.range)?,
                    damage: field.non_negative("damage", self.damage)?,
                    attack_interval: field.positive("attack_interval", self.attack_interval)?,
                    projectile_speed: field.positive("projectile_speed", self.projectile_speed)?,
                    splash_radius,
                })
            }
            TowerRole::Barracks => TowerBehaviour::Barracks(BarracksStats {
                soldier: self.soldier.clone().ok_or_else(|| field.missing("soldier"))?,
                squad_size: self.squad_size.unwrap_or(DEFAULT_SQUAD_SIZE),
            }),
        };

        Ok(TowerStats {
            role,
            cost,
            behaviour,
        })
    }
}

/// Validated tower stats.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerStats {
    /// Behaviour of the tower.
    pub role: TowerRole,
    /// Gold required to build the tower.
    pub cost: u32,
    /// Role-specific parameters.
    pub behaviour: TowerBehaviour,
}

/// Role-specific tower parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum TowerBehaviour {
    /// Parameters of towers that fire projectiles.
    Ranged(RangedStats),
    /// Parameters of towers that train soldiers.
    Barracks(BarracksStats),
}

/// Parameters of towers that fire projectiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangedStats {
    /// Targeting radius.
    pub range: f32,
    /// Damage carried by each projectile.
    pub damage: f32,
    /// Seconds between shots.
    pub attack_interval: f32,
    /// Projectile travel speed.
    pub projectile_speed: f32,
    /// Splash radius, if the tower deals area damage.
    pub splash_radius: Option<f32>,
}

/// Parameters of towers that train soldiers.
#[derive(Clone, Debug, PartialEq)]
pub struct BarracksStats {
    /// Unit identifier of the soldiers.
    pub soldier: String,
    /// Number of soldiers in the squad.
    pub squad_size: u32,
}

/// Value that tolerates malformed input instead of failing the whole file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    /// The value parsed as the expected type.
    Valid(T),
    /// The value was present but could not be interpreted.
    Malformed(IgnoredAny),
}

impl<T> Lenient<T> {
    /// Returns the parsed value, if any.
    #[must_use]
    pub fn valid(&self) -> Option<&T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Malformed(_) => None,
        }
    }
}

/// One group of identical enemies inside a wave.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnGroupDefinition {
    /// Enemy type identifier.
    #[serde(alias = "type")]
    pub enemy: Option<Lenient<String>>,
    /// Number of enemies to spawn.
    pub count: Option<Lenient<u32>>,
    /// Seconds between consecutive spawns.
    #[serde(alias = "spawnInterval")]
    pub spawn_interval: Option<Lenient<f32>>,
    /// Index of the level path to follow.
    #[serde(alias = "pathIndex", alias = "path_index")]
    pub path: Option<Lenient<usize>>,
    /// Multiplier applied to the enemy's hit points.
    #[serde(alias = "hpMultiplier")]
    pub hp_multiplier: Option<Lenient<f32>>,
}

impl SpawnGroupDefinition {
    /// Creates a group of `count` enemies spaced `spawn_interval` seconds apart.
    #[must_use]
    pub fn new(enemy: &str, count: u32, spawn_interval: f32) -> Self {
        Self {
            enemy: Some(Lenient::Valid(enemy.to_owned())),
            count: Some(Lenient::Valid(count)),
            spawn_interval: Some(Lenient::Valid(spawn_interval)),
            path: None,
            hp_multiplier: None,
        }
    }

    /// Routes the group along the path with the given index.
    #[must_use]
    pub fn on_path(mut self, path: usize) -> Self {
        self.path = Some(Lenient::Valid(path));
        self
    }

    /// Scales the hit points of every enemy in the group.
    #[must_use]
    pub fn with_hp_multiplier(mut self, multiplier: f32) -> Self {
        self.hp_multiplier = Some(Lenient::Valid(multiplier));
        self
    }
}

/// Ordered set of enemy groups released together.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveDefinition {
    /// Groups spawning concurrently during the wave.
    #[serde(alias = "enemyGroups")]
    pub groups: Vec<SpawnGroupDefinition>,
}

/// Static description of a playable level.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelDefinition {
    /// Display name.
    pub name: String,
    /// Width of the map; enemies beyond it have escaped.
    pub width: f32,
    /// Height of the map.
    pub height: f32,
    /// Gold available at the start of the level.
    #[serde(alias = "startingGold")]
    pub starting_gold: u32,
    /// Lives available at the start of the level.
    #[serde(alias = "startingLives")]
    pub starting_lives: u32,
    /// Enemy type substituted for malformed wave groups.
    #[serde(alias = "defaultEnemy")]
    pub default_enemy: Option<String>,
    /// Unit identifier of the hero, if the level fields one.
    pub hero: Option<String>,
    /// Position where the hero starts and respawns.
    #[serde(alias = "heroStart")]
    pub hero_start: Option<Point>,
    /// Enemy routes as ordered waypoints.
    pub paths: Vec<Vec<Point>>,
    /// Positions where towers may be built.
    #[serde(alias = "towerSpots")]
    pub tower_spots: Vec<Point>,
    /// Waves in play order.
    pub waves: Vec<WaveDefinition>,
}

impl Default for LevelDefinition {
    fn default() -> Self {
        Self {
            name: String::from("untitled"),
            width: 1_280.0,
            height: 720.0,
            starting_gold: 200,
            starting_lives: 20,
            default_enemy: None,
            hero: None,
            hero_start: None,
            paths: Vec::new(),
            tower_spots: Vec::new(),
            waves: Vec::new(),
        }
    }
}

impl LevelDefinition {
    /// Converts the authored paths into world-space polylines.
    #[must_use]
    pub fn polylines(&self) -> Vec<Vec<Vec2>> {
        self.paths
            .iter()
            .map(|path| path.iter().copied().map(Vec2::from).collect())
            .collect()
    }
}

/// Per-session tunables chosen by the player or the driver.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Global multiplier applied to every enemy's hit points.
    pub difficulty: f32,
    /// Seed for the enemy speed spread.
    pub rng_seed: u64,
    /// Initial playback multiplier.
    pub speed: f32,
    /// Seconds before the first wave starts.
    pub first_wave_delay: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: 1.0,
            rng_seed: 0x5eed_cafe_d00d_f00d,
            speed: 1.0,
            first_wave_delay: 5.0,
        }
    }
}

struct Field<'a> {
    kind: &'static str,
    name: &'a str,
}

impl<'a> Field<'a> {
    fn new(kind: &'static str, name: &'a str) -> Self {
        Self { kind, name }
    }

    fn missing(&self, field: &'static str) -> ConfigError {
        ConfigError::MissingField {
            kind: self.kind,
            name: self.name.to_owned(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, value: f32) -> ConfigError {
        ConfigError::InvalidField {
            kind: self.kind,
            name: self.name.to_owned(),
            field,
            value,
        }
    }

    fn non_negative(&self, field: &'static str, value: Option<f32>) -> Result<f32, ConfigError> {
        let value = value.ok_or_else(|| self.missing(field))?;
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(field, value))
        }
    }

    fn positive(&self, field: &'static str, value: Option<f32>) -> Result<f32, ConfigError> {
        let value = self.non_negative(field, value)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(field, value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [enemies.grunt]
        base_hp = 50
        damage = 4
        attack_interval = 1.0
        base_speed = 40
        gold = 5

        [enemies.broken]
        base_hp = 10
        damage = 1

        [towers.archer]
        role = "archer"
        cost = 70
        range = 140
        damage = 6
        attack_interval = 0.8
        projectile_speed = 300

        [towers.mortar]
        role = "artillery"
        cost = 120
        range = 160
        damage = 20
        attack_interval = 3
        projectile_speed = 150

        [towers.barracks]
        role = "barracks"
        cost = 90
        soldier = "footman"

        [units.footman]
        hp = 40
        damage = 3
        speed = 60
        attackInterval = 1.0
    "#;

    fn catalog() -> Catalog {
        toml::from_str(CATALOG).expect("catalog parses")
    }

    #[test]
    fn complete_enemy_validates() {
        let stats = catalog().enemy("grunt").expect("grunt is complete");
        assert_eq!(stats.base_hp, 50.0);
        assert_eq!(stats.gold, 5);
    }

    #[test]
    fn missing_enemy_fields_are_reported() {
        let error = catalog().enemy("broken").expect_err("broken is incomplete");
        assert_eq!(
            error,
            ConfigError::MissingField {
                kind: "enemy",
                name: String::from("broken"),
                field: "attack_interval",
            }
        );
    }

    #[test]
    fn unknown_enemy_is_reported() {
        assert_eq!(
            catalog().enemy("dragon"),
            Err(ConfigError::UnknownEnemy(String::from("dragon")))
        );
    }

    #[test]
    fn artillery_requires_splash_radius() {
        let error = catalog().tower("mortar").expect_err("mortar lacks splash");
        assert!(matches!(
            error,
            ConfigError::MissingField {
                field: "splash_radius",
                ..
            }
        ));
    }

    #[test]
    fn barracks_defaults_squad_size() {
        let stats = catalog().tower("barracks").expect("barracks is complete");
        match stats.behaviour {
            TowerBehaviour::Barracks(barracks) => {
                assert_eq!(barracks.soldier, "footman");
                assert_eq!(barracks.squad_size, DEFAULT_SQUAD_SIZE);
            }
            other => panic!("unexpected behaviour: {other:?}"),
        }
    }

    #[test]
    fn unit_aliases_and_defaults_apply() {
        let stats = catalog().unit("footman").expect("footman is complete");
        assert_eq!(stats.max_hp, 40.0);
        assert_eq!(stats.engagement_radius, DEFAULT_ENGAGEMENT_RADIUS);
        assert_eq!(stats.strike_range, DEFAULT_STRIKE_RANGE);
    }

    #[test]
    fn non_positive_speed_is_invalid() {
        let definition = UnitDefinition::new(10.0, 1.0, 0.0, 1.0);
        assert!(matches!(
            definition.validate("statue"),
            Err(ConfigError::InvalidField { field: "speed", .. })
        ));
    }

    #[test]
    fn malformed_group_fields_parse_leniently() {
        let level: LevelDefinition = toml::from_str(
            r#"
            paths = [[{ x = 0, y = 0 }, { x = 100, y = 0 }]]

            [[waves]]
            [[waves.groups]]
            type = "grunt"
            count = "lots"
            spawnInterval = 1.5
            "#,
        )
        .expect("level parses");

        let group = &level.waves[0].groups[0];
        assert_eq!(
            group.enemy.as_ref().and_then(Lenient::valid),
            Some(&String::from("grunt"))
        );
        assert!(group.count.as_ref().and_then(Lenient::valid).is_none());
        assert!(group.count.is_some(), "malformed count is still recorded");
        assert_eq!(
            group.spawn_interval.as_ref().and_then(Lenient::valid),
            Some(&1.5)
        );
        assert!(group.path.is_none());
        assert_eq!(level.polylines()[0][1], Vec2::new(100.0, 0.0));
    }
}
