#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that aims ranged towers and emits projectile launches.

use log::trace;
use rampart_core::{config::RangedStats, Cooldown, EnemyId, Mobile, TowerId, Vec2};
use rampart_system_enemies::EnemyRoster;
use rampart_system_projectiles::Launch;

/// Ranged tower as seen by the combat system.
#[derive(Clone, Debug, PartialEq)]
pub struct Battery {
    tower: TowerId,
    position: Vec2,
    stats: RangedStats,
    cooldown: Cooldown,
}

impl Battery {
    /// Creates a battery that can fire immediately.
    #[must_use]
    pub fn new(tower: TowerId, position: Vec2, stats: RangedStats) -> Self {
        Self {
            tower,
            position,
            stats,
            cooldown: Cooldown::ready(),
        }
    }

    /// Tower the battery belongs to.
    #[must_use]
    pub fn tower(&self) -> TowerId {
        self.tower
    }

    /// Position projectiles are launched from.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Firing statistics.
    #[must_use]
    pub fn stats(&self) -> &RangedStats {
        &self.stats
    }

    /// Seconds until the battery may fire again.
    #[must_use]
    pub fn ready_in(&self) -> f32 {
        self.cooldown.remaining()
    }
}

/// Target chosen for a tower during the last pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that acquired the target.
    pub tower: TowerId,
    /// Enemy being aimed at.
    pub enemy: EnemyId,
    /// Position of the enemy when it was chosen.
    pub enemy_position: Vec2,
}

/// Tower combat system that reuses a scratch buffer between passes.
#[derive(Debug, Default)]
pub struct TowerCombat {
    targets: Vec<TowerTarget>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cools every battery and launches at the nearest enemy for those ready.
    ///
    /// The launch captures the enemy's position at this instant; the
    /// projectile does not follow it afterwards.
    pub fn handle(
        &mut self,
        dt: f32,
        batteries: &mut [Battery],
        enemies: &EnemyRoster,
        out: &mut Vec<Launch>,
    ) {
        self.targets.clear();
        for battery in batteries.iter_mut() {
            battery.cooldown.cool(dt);
            if !battery.cooldown.is_ready() {
                continue;
            }
            let range = battery.stats.range;
            let Some(target) = select_target(battery.tower, battery.position, range, enemies) else {
                continue;
            };

            battery.cooldown.trigger(battery.stats.attack_interval);
            trace!("tower {:?} fires at {:?}", battery.tower, target.enemy);
            out.push(Launch {
                origin: battery.position,
                target_point: target.enemy_position,
                speed: battery.stats.projectile_speed,
                damage: battery.stats.damage,
                splash_radius: battery.stats.splash_radius,
                target: target.enemy,
            });
            self.targets.push(target);
        }
    }

    /// Targets acquired by batteries that fired during the last pass.
    #[must_use]
    pub fn last_targets(&self) -> &[TowerTarget] {
        &self.targets
    }
}

/// Picks the nearest living enemy within `range` of `position`.
///
/// Equal distances resolve to the lower enemy identifier, i.e. the earlier
/// spawn.
#[must_use]
pub fn select_target(
    tower: TowerId,
    position: Vec2,
    range: f32,
    enemies: &EnemyRoster,
) -> Option<TowerTarget> {
    let range_sq = range * range;
    let mut best: Option<(f32, EnemyId, Vec2)> = None;
    for enemy in enemies.iter().filter(|enemy| enemy.is_alive()) {
        let enemy_position = enemy.position();
        let distance_sq = position.distance_squared(enemy_position);
        if distance_sq > range_sq {
            continue;
        }
        let candidate = (distance_sq, enemy.id(), enemy_position);
        match best {
            Some(existing) if !precedes(&candidate, &existing) => {}
            _ => best = Some(candidate),
        }
    }

    best.map(|(_, enemy, enemy_position)| TowerTarget {
        tower,
        enemy,
        enemy_position,
    })
}

fn precedes(candidate: &(f32, EnemyId, Vec2), other: &(f32, EnemyId, Vec2)) -> bool {
    if candidate.0 != other.0 {
        return candidate.0 < other.0;
    }
    candidate.1 < other.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_ties_prefer_the_smaller_identifier() {
        let near = (4.0, EnemyId::new(9), Vec2::ZERO);
        let tied = (4.0, EnemyId::new(3), Vec2::ONE);
        let far = (9.0, EnemyId::new(1), Vec2::ZERO);

        assert!(precedes(&tied, &near));
        assert!(!precedes(&near, &tied));
        assert!(precedes(&near, &far));
    }
}
