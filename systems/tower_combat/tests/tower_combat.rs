use std::collections::BTreeMap;

use rampart_core::{
    config::{EnemyDefinition, RangedStats},
    EnemyId, Mobile, SpawnRequest, Targetable, TowerId, Vec2,
};
use rampart_system_enemies::{EnemyRoster, RosterSettings};
use rampart_system_projectiles::Launch;
use rampart_system_tower_combat::{select_target, Battery, TowerCombat};

fn roster_with(positions: &[Vec2]) -> (EnemyRoster, Vec<EnemyId>) {
    let mut definitions = BTreeMap::new();
    let _ = definitions.insert(
        String::from("grunt"),
        EnemyDefinition::new(40.0, 1.0, 1.0, 30.0),
    );
    let mut roster = EnemyRoster::new(
        definitions,
        vec![vec![Vec2::ZERO, Vec2::new(400.0, 0.0)]],
        RosterSettings::default(),
    );
    let ids = positions
        .iter()
        .map(|position| {
            let id = roster
                .spawn(&SpawnRequest {
                    enemy: String::from("grunt"),
                    hp_multiplier: 1.0,
                    path: 0,
                    wave: 0,
                })
                .expect("grunt spawns");
            if let Some(enemy) = roster.get_mut(id) {
                enemy.set_position(*position);
            }
            id
        })
        .collect();
    (roster, ids)
}

fn archer() -> RangedStats {
    RangedStats {
        range: 50.0,
        damage: 6.0,
        attack_interval: 1.0,
        projectile_speed: 300.0,
        splash_radius: None,
    }
}

#[test]
fn nearest_enemy_in_range_is_targeted() {
    let (roster, ids) = roster_with(&[
        Vec2::new(40.0, 0.0),
        Vec2::new(0.0, 20.0),
        Vec2::new(5.0, 0.0),
    ]);
    if let Some(target) = select_target(TowerId::new(0), Vec2::new(0.0, 60.0), 50.0, &roster) {
        assert_eq!(target.enemy, ids[1]);
        assert_eq!(target.enemy_position, Vec2::new(0.0, 20.0));
    } else {
        panic!("an enemy is within range");
    }
    assert!(select_target(TowerId::new(0), Vec2::new(0.0, 500.0), 50.0, &roster).is_none());
}

#[test]
fn equal_distances_prefer_the_earlier_spawn() {
    let (roster, ids) = roster_with(&[Vec2::new(10.0, 0.0), Vec2::new(-10.0, 0.0)]);

    let target = select_target(TowerId::new(0), Vec2::ZERO, 50.0, &roster);

    assert_eq!(target.map(|target| target.enemy), Some(ids[0]));
}

#[test]
fn dead_enemies_are_not_targeted() {
    let (mut roster, ids) = roster_with(&[Vec2::new(10.0, 0.0), Vec2::new(30.0, 0.0)]);
    if let Some(enemy) = roster.get_mut(ids[0]) {
        let _ = enemy.apply_damage(f32::MAX);
    }

    let target = select_target(TowerId::new(0), Vec2::ZERO, 50.0, &roster);

    assert_eq!(target.map(|target| target.enemy), Some(ids[1]));
}

#[test]
fn batteries_fire_once_per_interval_with_captured_aim() {
    let (roster, ids) = roster_with(&[Vec2::new(30.0, 0.0)]);
    let mut batteries = vec![Battery::new(TowerId::new(4), Vec2::ZERO, archer())];
    let mut combat = TowerCombat::new();
    let mut launches = Vec::new();

    combat.handle(0.1, &mut batteries, &roster, &mut launches);
    assert_eq!(
        launches,
        vec![Launch {
            origin: Vec2::ZERO,
            target_point: Vec2::new(30.0, 0.0),
            speed: 300.0,
            damage: 6.0,
            splash_radius: None,
            target: ids[0],
        }]
    );
    assert_eq!(combat.last_targets().len(), 1);

    for _ in 0..9 {
        combat.handle(0.1, &mut batteries, &roster, &mut launches);
    }
    assert_eq!(launches.len(), 1, "still cooling down");

    for _ in 0..2 {
        combat.handle(0.1, &mut batteries, &roster, &mut launches);
    }
    assert_eq!(launches.len(), 2);
}

#[test]
fn idle_batteries_stay_ready() {
    let (roster, _) = roster_with(&[Vec2::new(300.0, 0.0)]);
    let mut batteries = vec![Battery::new(TowerId::new(0), Vec2::ZERO, archer())];
    let mut combat = TowerCombat::new();
    let mut launches = Vec::new();

    combat.handle(0.5, &mut batteries, &roster, &mut launches);

    assert!(launches.is_empty());
    assert!(combat.last_targets().is_empty());
    assert_eq!(batteries[0].ready_in(), 0.0);
}
