#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Melee engagement between heroes, soldiers and enemies.
//!
//! Every tick each living unit is either unengaged (idle at or walking back to
//! its gather point), engaging (closing in on its opponent) or fighting
//! (trading blows within strike range). A link between a unit and an enemy is
//! recorded on both sides and always created or broken for both at once, so an
//! enemy is never held by two units.

mod unit;

pub use unit::{EngagementState, Unit, UnitRole, UnitRoster};

use log::debug;
use rampart_core::{Cooldown, EnemyId, Mobile, MobileId, Targetable, UnitId};
use rampart_system_enemies::{Enemy, EnemyRoster};
use rampart_system_motion::{MotionResolver, MoveRequest};

/// Distance from the gather point below which idle units stay put.
pub const GATHER_EPSILON: f32 = 2.0;

/// Observable result of an engagement pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A unit locked onto an enemy.
    Linked {
        /// Unit that initiated the link.
        unit: UnitId,
        /// Enemy now held by the unit.
        enemy: EnemyId,
    },
    /// A link was broken because the enemy vanished or was released elsewhere.
    Unlinked {
        /// Unit whose link was broken.
        unit: UnitId,
        /// Former opponent.
        enemy: EnemyId,
    },
    /// A unit landed the killing blow.
    EnemySlain {
        /// Unit that struck the blow.
        unit: UnitId,
        /// Enemy that died.
        enemy: EnemyId,
    },
    /// A unit was killed by its opponent's retaliation.
    UnitFell {
        /// Unit that died.
        unit: UnitId,
        /// Enemy that struck the blow.
        enemy: EnemyId,
    },
}

/// Engagement state machine driving units through the motion resolver.
#[derive(Debug, Default)]
pub struct Engagement;

impl Engagement {
    /// Creates the state machine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs one engagement pass over every living unit in registration order.
    pub fn tick(
        &mut self,
        dt: f32,
        units: &mut UnitRoster,
        enemies: &mut EnemyRoster,
        motion: &mut MotionResolver,
        out: &mut Vec<Outcome>,
    ) {
        for unit in &mut units.units {
            if !unit.is_alive() {
                continue;
            }

            if let Some(opponent) = unit.opponent {
                let held = enemies
                    .get_mut(opponent)
                    .filter(|enemy| enemy.is_alive() && enemy.engaged_by() == Some(unit.id));
                if let Some(enemy) = held {
                    press(dt, unit, enemy, motion, out);
                    continue;
                }
                if let Some(enemy) = unlink(unit, enemies) {
                    debug!("unit {:?} lost opponent {enemy:?}", unit.id);
                    out.push(Outcome::Unlinked {
                        unit: unit.id,
                        enemy,
                    });
                }
            }

            seek(unit, enemies, motion, out);
        }
    }
}

/// Looks for a new opponent, or walks back to the gather point when none is
/// within reach.
fn seek(
    unit: &mut Unit,
    enemies: &mut EnemyRoster,
    motion: &mut MotionResolver,
    out: &mut Vec<Outcome>,
) {
    let position = unit.position();
    let radius = unit.stats.engagement_radius;
    let mut nearest: Option<(EnemyId, f32)> = None;
    for enemy in enemies.iter() {
        if !enemy.is_alive() || enemy.engaged_by().is_some() {
            continue;
        }
        let distance = position.distance(enemy.position());
        if distance >= radius {
            continue;
        }
        if nearest.map_or(true, |(_, best)| distance < best) {
            nearest = Some((enemy.id(), distance));
        }
    }

    let mobile = MobileId::Unit(unit.id);
    if let Some(enemy) = nearest.and_then(|(id, _)| enemies.get_mut(id)) {
        link(unit, enemy);
        unit.state = EngagementState::Engaging;
        motion.set_target(
            mobile,
            enemy.position(),
            MoveRequest::combat(unit.stats.strike_range),
        );
        out.push(Outcome::Linked {
            unit: unit.id,
            enemy: enemy.id(),
        });
        return;
    }

    unit.state = EngagementState::Unengaged;
    let gather = unit.gather_point();
    if position.distance(gather) > GATHER_EPSILON {
        motion.set_target(mobile, gather, MoveRequest::gather());
    }
}

/// Advances a live link: close the distance or exchange blows.
fn press(
    dt: f32,
    unit: &mut Unit,
    enemy: &mut Enemy,
    motion: &mut MotionResolver,
    out: &mut Vec<Outcome>,
) {
    let mobile = MobileId::Unit(unit.id);
    let strike_range = unit.stats.strike_range;
    if unit.position().distance(enemy.position()) > strike_range {
        unit.state = EngagementState::Engaging;
        motion.set_target(mobile, enemy.position(), MoveRequest::combat(strike_range));
        return;
    }

    unit.state = EngagementState::Fighting;
    let struck = unit.cooldown.advance(dt, unit.stats.attack_interval);
    if struck && enemy.apply_damage(unit.stats.damage) {
        let enemy_id = enemy.id();
        sever(unit, enemy);
        motion.stop(mobile, true);
        out.push(Outcome::EnemySlain {
            unit: unit.id,
            enemy: enemy_id,
        });
        return;
    }

    if let Some(damage) = enemy.retaliate(dt) {
        if unit.apply_damage(damage) {
            let enemy_id = enemy.id();
            sever(unit, enemy);
            motion.stop(mobile, true);
            out.push(Outcome::UnitFell {
                unit: unit.id,
                enemy: enemy_id,
            });
        }
    }
}

fn link(unit: &mut Unit, enemy: &mut Enemy) {
    unit.opponent = Some(enemy.id());
    unit.cooldown = Cooldown::ready();
    enemy.engage(unit.id);
}

fn sever(unit: &mut Unit, enemy: &mut Enemy) {
    unit.opponent = None;
    unit.state = EngagementState::Unengaged;
    enemy.release();
}

/// Clears the unit's link and, if the enemy still points back, its side too.
fn unlink(unit: &mut Unit, enemies: &mut EnemyRoster) -> Option<EnemyId> {
    let opponent = unit.opponent?;
    match enemies.get_mut(opponent) {
        Some(enemy) if enemy.engaged_by() == Some(unit.id) => sever(unit, enemy),
        _ => {
            unit.opponent = None;
            unit.state = EngagementState::Unengaged;
        }
    }
    Some(opponent)
}

/// Breaks the link held by `unit`, if any, clearing both sides.
///
/// Returns the released enemy.
pub fn disengage(
    unit: UnitId,
    units: &mut UnitRoster,
    enemies: &mut EnemyRoster,
) -> Option<EnemyId> {
    units.get_mut(unit).and_then(|unit| unlink(unit, enemies))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rampart_core::{
        config::{EnemyDefinition, UnitDefinition},
        SpawnRequest, Vec2,
    };
    use rampart_system_enemies::RosterSettings;

    use super::*;

    fn enemies() -> EnemyRoster {
        let mut definitions = BTreeMap::new();
        let _ = definitions.insert(
            String::from("grunt"),
            EnemyDefinition::new(100.0, 1.0, 1.0, 10.0),
        );
        EnemyRoster::new(
            definitions,
            vec![vec![Vec2::ZERO, Vec2::new(200.0, 0.0)]],
            RosterSettings::default(),
        )
    }

    #[test]
    fn unlink_tolerates_a_vanished_enemy() {
        let mut motion = MotionResolver::new();
        let mut units = UnitRoster::new();
        let mut enemies = enemies();
        let stats = UnitDefinition::new(10.0, 1.0, 10.0, 1.0)
            .validate("guard")
            .expect("complete definition");
        let id = units
            .enlist("guard", UnitRole::Hero, stats, Vec2::ZERO, Vec2::ZERO, &mut motion)
            .expect("enlists");
        let enemy = enemies
            .spawn(&SpawnRequest {
                enemy: String::from("grunt"),
                hp_multiplier: 1.0,
                path: 0,
                wave: 0,
            })
            .expect("spawns");

        if let (Some(unit), Some(target)) = (units.get_mut(id), enemies.get_mut(enemy)) {
            link(unit, target);
        }
        enemies.reset();

        assert_eq!(disengage(id, &mut units, &mut enemies), Some(enemy));
        assert_eq!(units.get(id).and_then(Unit::opponent), None);
        assert_eq!(disengage(id, &mut units, &mut enemies), None);
    }

    #[test]
    fn attack_clock_only_runs_within_strike_range() {
        let mut motion = MotionResolver::new();
        let mut units = UnitRoster::new();
        let mut enemies = enemies();
        let stats = UnitDefinition::new(10.0, 1.0, 10.0, 1.0)
            .with_reach(40.0, 5.0)
            .validate("guard")
            .expect("complete definition");
        let id = units
            .enlist("guard", UnitRole::Hero, stats, Vec2::ZERO, Vec2::ZERO, &mut motion)
            .expect("enlists");
        let enemy = enemies
            .spawn(&SpawnRequest {
                enemy: String::from("grunt"),
                hp_multiplier: 1.0,
                path: 0,
                wave: 0,
            })
            .expect("spawns");
        let mut out = Vec::new();

        if let (Some(unit), Some(target)) = (units.get_mut(id), enemies.get_mut(enemy)) {
            link(unit, target);
            press(0.1, unit, target, &mut motion, &mut out);
            assert_eq!(unit.cooldown.remaining(), 1.0, "first blow lands on contact");

            unit.set_position(Vec2::new(30.0, 0.0));
            press(0.5, unit, target, &mut motion, &mut out);
            assert_eq!(unit.state(), EngagementState::Engaging);
            assert_eq!(unit.cooldown.remaining(), 1.0, "closing in does not cool");
        } else {
            panic!("unit and enemy exist");
        }
    }
}
