#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Projectile resolver that applies ranged damage once shots land.
//!
//! A projectile commits to the point its target occupied at launch and flies
//! there in a straight line. Damage is applied in the tick the projectile
//! arrives: full damage to the main target if it is still alive, and half
//! damage to every other living enemy inside the splash radius.

use log::debug;
use rampart_core::{geometry::is_finite_point, EnemyId, Mobile, Targetable, Vec2};
use rampart_system_enemies::EnemyRoster;

/// Fraction of the damage dealt to enemies caught in a splash.
pub const SPLASH_FACTOR: f32 = 0.5;

/// Identifier of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new identifier with the provided numeric value.
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

/// Firing solution handed to the resolver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Launch {
    /// Position the projectile leaves from.
    pub origin: Vec2,
    /// Point the projectile flies to, captured at launch.
    pub target_point: Vec2,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Damage dealt to the main target.
    pub damage: f32,
    /// Radius around the impact point that receives splash damage.
    pub splash_radius: Option<f32>,
    /// Enemy the shot was aimed at.
    pub target: EnemyId,
}

/// Projectile in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    /// Identifier of the projectile.
    pub id: ProjectileId,
    /// Current position.
    pub position: Vec2,
    /// Parameters the projectile was launched with.
    pub launch: Launch,
}

/// Damage applied to one enemy by a landed projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Projectile that landed.
    pub projectile: ProjectileId,
    /// Enemy that took damage.
    pub enemy: EnemyId,
    /// Damage dealt.
    pub damage: f32,
    /// Whether the enemy was caught by the splash rather than hit directly.
    pub splash: bool,
    /// Whether the hit killed the enemy.
    pub lethal: bool,
}

/// Owns every projectile in flight.
#[derive(Debug, Default)]
pub struct ProjectileResolver {
    projectiles: Vec<Projectile>,
    next_id: u32,
}

impl ProjectileResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a projectile; it has no effect until a later tick lands it.
    ///
    /// Launches with non-finite points or a non-positive speed are ignored.
    pub fn spawn(&mut self, launch: Launch) -> Option<ProjectileId> {
        if !is_finite_point(launch.origin) || !is_finite_point(launch.target_point) {
            debug!(
                "ignoring projectile with non-finite trajectory at {:?}",
                launch.target
            );
            return None;
        }
        if !launch.speed.is_finite() || launch.speed <= 0.0 {
            debug!("ignoring projectile with invalid speed {}", launch.speed);
            return None;
        }

        let id = ProjectileId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.projectiles.push(Projectile {
            id,
            position: launch.origin,
            launch,
        });
        Some(id)
    }

    /// Advances every projectile and resolves those that arrive this tick.
    ///
    /// A projectile arrives when its remaining distance does not exceed the
    /// distance it covers in `dt`. Damage is applied in the same pass and the
    /// resolved projectile is dropped at the end of the tick.
    pub fn tick(&mut self, dt: f32, enemies: &mut EnemyRoster, out: &mut Vec<Hit>) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }

        self.projectiles.retain_mut(|projectile| {
            let launch = projectile.launch;
            let offset = launch.target_point - projectile.position;
            let remaining = offset.length();
            let step = launch.speed * dt;
            if remaining > step {
                projectile.position += offset / remaining * step;
                return true;
            }

            projectile.position = launch.target_point;
            land(projectile.id, &launch, enemies, out);
            false
        });
    }

    /// Projectiles in flight, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    /// Removes every projectile.
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.next_id = 0;
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// Reports whether no projectile is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}

fn land(
    projectile: ProjectileId,
    launch: &Launch,
    enemies: &mut EnemyRoster,
    out: &mut Vec<Hit>,
) {
    if let Some(enemy) = enemies.get_mut(launch.target) {
        if enemy.is_alive() {
            let lethal = enemy.apply_damage(launch.damage);
            out.push(Hit {
                projectile,
                enemy: launch.target,
                damage: launch.damage,
                splash: false,
                lethal,
            });
        }
    }

    let Some(radius) = launch.splash_radius.filter(|radius| *radius > 0.0) else {
        return;
    };
    let damage = launch.damage * SPLASH_FACTOR;
    for enemy in enemies.iter_mut() {
        if enemy.id() == launch.target || !enemy.is_alive() {
            continue;
        }
        if enemy.position().distance(launch.target_point) > radius {
            continue;
        }
        let lethal = enemy.apply_damage(damage);
        out.push(Hit {
            projectile,
            enemy: enemy.id(),
            damage,
            splash: true,
            lethal,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_launches_are_ignored() {
        let mut resolver = ProjectileResolver::new();
        let launch = Launch {
            origin: Vec2::ZERO,
            target_point: Vec2::new(10.0, 0.0),
            speed: 100.0,
            damage: 5.0,
            splash_radius: None,
            target: EnemyId::new(0),
        };

        assert!(resolver
            .spawn(Launch {
                speed: 0.0,
                ..launch
            })
            .is_none());
        assert!(resolver
            .spawn(Launch {
                target_point: Vec2::new(f32::INFINITY, 0.0),
                ..launch
            })
            .is_none());
        assert_eq!(resolver.spawn(launch), Some(ProjectileId::new(0)));
        assert_eq!(resolver.len(), 1);
    }
}
