use std::collections::BTreeMap;

use rampart_core::{
    config::EnemyDefinition, EnemyId, Mobile, SpawnRequest, Targetable, Vec2,
};
use rampart_system_enemies::{EnemyRoster, RosterSettings, HP_BALANCE};
use rampart_system_projectiles::{Hit, Launch, ProjectileResolver, SPLASH_FACTOR};

const BASE_HP: f32 = 80.0;

fn roster_with(positions: &[Vec2]) -> (EnemyRoster, Vec<EnemyId>) {
    let mut definitions = BTreeMap::new();
    let _ = definitions.insert(
        String::from("grunt"),
        EnemyDefinition::new(BASE_HP, 1.0, 1.0, 30.0),
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

fn health(roster: &EnemyRoster, id: EnemyId) -> f32 {
    roster.get(id).map_or(0.0, Targetable::health)
}

fn launch_at(target: EnemyId, target_point: Vec2, damage: f32, splash: Option<f32>) -> Launch {
    Launch {
        origin: Vec2::new(0.0, -100.0),
        target_point,
        speed: 200.0,
        damage,
        splash_radius: splash,
        target,
    }
}

#[test]
fn projectiles_have_no_effect_until_they_arrive() {
    let (mut roster, ids) = roster_with(&[Vec2::ZERO]);
    let mut resolver = ProjectileResolver::new();
    let _ = resolver.spawn(launch_at(ids[0], Vec2::ZERO, 10.0, None));
    let full = BASE_HP * HP_BALANCE;
    let mut hits = Vec::new();

    resolver.tick(0.25, &mut roster, &mut hits);
    assert_eq!(health(&roster, ids[0]), full, "still 50 units out");
    assert_eq!(resolver.len(), 1);
    assert!(hits.is_empty());

    resolver.tick(0.25, &mut roster, &mut hits);
    assert_eq!(health(&roster, ids[0]), full - 10.0);
    assert!(resolver.is_empty(), "resolved projectiles are removed");
    assert_eq!(hits.len(), 1);
    assert!(!hits[0].splash);
}

#[test]
fn splash_damage_is_halved_and_bounded_by_radius() {
    let impact = Vec2::new(50.0, 0.0);
    let (mut roster, ids) = roster_with(&[
        impact,
        Vec2::new(55.0, 0.0),
        Vec2::new(50.0, -19.0),
        Vec2::new(50.0, 20.0),
        Vec2::new(80.0, 0.0),
    ]);
    let mut resolver = ProjectileResolver::new();
    let damage = 12.0;
    let _ = resolver.spawn(launch_at(ids[0], impact, damage, Some(20.0)));
    let full = BASE_HP * HP_BALANCE;

    let mut hits = Vec::new();
    for _ in 0..10 {
        resolver.tick(0.1, &mut roster, &mut hits);
    }

    assert_eq!(health(&roster, ids[0]), full - damage);
    for &inside in &ids[1..4] {
        assert_eq!(health(&roster, inside), full - damage * SPLASH_FACTOR);
    }
    assert_eq!(health(&roster, ids[4]), full, "outside the radius");
    let total: f32 = hits.iter().map(|hit: &Hit| hit.damage).sum();
    assert_eq!(total, damage + 3.0 * damage * SPLASH_FACTOR);
}

#[test]
fn shots_commit_to_the_captured_point() {
    let (mut roster, ids) = roster_with(&[Vec2::new(50.0, 0.0), Vec2::new(50.0, 5.0)]);
    let mut resolver = ProjectileResolver::new();
    let _ = resolver.spawn(launch_at(ids[0], Vec2::new(50.0, 0.0), 10.0, Some(10.0)));

    if let Some(target) = roster.get_mut(ids[0]) {
        target.set_position(Vec2::new(300.0, 0.0));
    }
    let mut hits = Vec::new();
    for _ in 0..10 {
        resolver.tick(0.1, &mut roster, &mut hits);
    }

    assert_eq!(
        hits.iter().map(|hit| (hit.enemy, hit.splash)).collect::<Vec<_>>(),
        vec![(ids[0], false), (ids[1], true)],
        "the live main target is still hit, splash lands where the shot was aimed"
    );
}

#[test]
fn dead_main_targets_take_no_damage_but_splash_still_lands() {
    let (mut roster, ids) = roster_with(&[Vec2::new(50.0, 0.0), Vec2::new(52.0, 0.0)]);
    let mut resolver = ProjectileResolver::new();
    let _ = resolver.spawn(launch_at(ids[0], Vec2::new(50.0, 0.0), 10.0, Some(10.0)));
    if let Some(target) = roster.get_mut(ids[0]) {
        let _ = target.apply_damage(f32::MAX);
    }

    let mut hits = Vec::new();
    for _ in 0..10 {
        resolver.tick(0.1, &mut roster, &mut hits);
    }

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].enemy, ids[1]);
    assert!(roster.get(ids[0]).map_or(false, |enemy| !enemy.is_alive()));
}

#[test]
fn lethal_hits_are_reported() {
    let (mut roster, ids) = roster_with(&[Vec2::ZERO]);
    let mut resolver = ProjectileResolver::new();
    let _ = resolver.spawn(launch_at(ids[0], Vec2::ZERO, 1_000.0, None));

    let mut hits = Vec::new();
    resolver.tick(1.0, &mut roster, &mut hits);

    assert!(hits[0].lethal);
    assert!(roster.get(ids[0]).map_or(false, |enemy| !enemy.is_alive()));
}
