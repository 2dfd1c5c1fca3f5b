use std::collections::BTreeMap;

use rampart_core::{
    config::{ConfigError, EnemyDefinition, LevelDefinition, SpawnGroupDefinition, WaveDefinition},
    EnemyId, EnemySpawner, Event, SpawnError, SpawnRequest, Targetable,
};
use rampart_system_enemies::{EnemyRoster, RosterSettings};
use rampart_system_waves::{Config, Phase, WaveDirector};

#[derive(Default)]
struct Ledger {
    requests: Vec<SpawnRequest>,
    live: BTreeMap<usize, usize>,
    next: u32,
}

impl Ledger {
    fn clear_wave(&mut self, wave: usize) {
        let _ = self.live.remove(&wave);
    }

    fn spawned_for(&self, enemy: &str) -> usize {
        self.requests
            .iter()
            .filter(|request| request.enemy == enemy)
            .count()
    }
}

impl EnemySpawner for Ledger {
    fn spawn(&mut self, request: &SpawnRequest) -> Result<EnemyId, SpawnError> {
        self.requests.push(request.clone());
        if request.enemy == "broken" {
            return Err(SpawnError::Config(ConfigError::UnknownEnemy(
                request.enemy.clone(),
            )));
        }
        *self.live.entry(request.wave).or_default() += 1;
        let id = EnemyId::new(self.next);
        self.next += 1;
        Ok(id)
    }

    fn live_in_wave(&self, wave: usize) -> usize {
        self.live.get(&wave).copied().unwrap_or(0)
    }
}

fn wave(groups: Vec<SpawnGroupDefinition>) -> WaveDefinition {
    WaveDefinition { groups }
}

fn run(director: &mut WaveDirector, ledger: &mut Ledger, ticks: usize, dt: f32) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        director.tick(dt, ledger, &mut events);
    }
    events
}

#[test]
fn first_wave_waits_for_the_countdown() {
    let waves = [wave(vec![SpawnGroupDefinition::new("grunt", 1, 1.0)])];
    let mut director = WaveDirector::new(&waves, &Config::new(2.0));
    let mut ledger = Ledger::default();

    assert!(run(&mut director, &mut ledger, 3, 0.5).is_empty());
    assert_eq!(director.phase(), Phase::Idle { countdown: 0.5 });

    let events = run(&mut director, &mut ledger, 1, 0.5);
    assert_eq!(
        events,
        vec![
            Event::WaveStarted { wave: 0 },
            Event::EnemySpawned {
                enemy: EnemyId::new(0),
                wave: 0
            },
        ]
    );
}

#[test]
fn groups_spawn_independently_at_their_own_pace() {
    let waves = [wave(vec![
        SpawnGroupDefinition::new("grunt", 3, 1.0),
        SpawnGroupDefinition::new("runner", 4, 0.5).on_path(1),
    ])];
    let mut director = WaveDirector::new(&waves, &Config::new(0.0));
    let mut ledger = Ledger::default();

    let _ = run(&mut director, &mut ledger, 4, 0.5);

    assert_eq!(ledger.spawned_for("grunt"), 2);
    assert_eq!(ledger.spawned_for("runner"), 4);
    assert!(ledger
        .requests
        .iter()
        .filter(|request| request.enemy == "runner")
        .all(|request| request.path == 1));
}

#[test]
fn wave_completes_only_after_every_spawn_and_an_empty_field() {
    let waves = [
        wave(vec![SpawnGroupDefinition::new("grunt", 3, 1.0)]),
        wave(vec![SpawnGroupDefinition::new("grunt", 1, 1.0)]),
    ];
    let mut director = WaveDirector::new(&waves, &Config::new(0.0));
    let mut ledger = Ledger::default();

    let events = run(&mut director, &mut ledger, 10, 0.5);
    assert_eq!(ledger.requests.len(), 3);
    assert!(!events.contains(&Event::WaveCompleted { wave: 0 }));
    assert_eq!(director.phase(), Phase::Active);

    ledger.clear_wave(0);
    let events = run(&mut director, &mut ledger, 1, 0.5);
    assert_eq!(events, vec![Event::WaveCompleted { wave: 0 }]);
    assert_eq!(director.phase(), Phase::Idle { countdown: 0.0 });

    let events = run(&mut director, &mut ledger, 1, 0.5);
    assert_eq!(
        events.first(),
        Some(&Event::WaveStarted { wave: 1 }),
        "the next wave starts on the very next tick"
    );
}

#[test]
fn clearing_the_final_wave_is_a_victory() {
    let waves = [wave(vec![SpawnGroupDefinition::new("grunt", 1, 1.0)])];
    let mut director = WaveDirector::new(&waves, &Config::new(0.0));
    let mut ledger = Ledger::default();

    let _ = run(&mut director, &mut ledger, 1, 0.1);
    ledger.clear_wave(0);
    let events = run(&mut director, &mut ledger, 1, 0.1);

    assert_eq!(events, vec![Event::WaveCompleted { wave: 0 }]);
    assert!(director.is_victorious());
    assert!(run(&mut director, &mut ledger, 5, 0.1).is_empty());
    assert!(!director.call_early());
}

#[test]
fn a_broken_group_never_halts_the_others() {
    let waves = [wave(vec![
        SpawnGroupDefinition::new("broken", 2, 0.5),
        SpawnGroupDefinition::new("grunt", 2, 0.5),
    ])];
    let mut director = WaveDirector::new(&waves, &Config::new(0.0));
    let mut ledger = Ledger::default();

    let events = run(&mut director, &mut ledger, 2, 0.5);
    assert_eq!(ledger.spawned_for("broken"), 2);
    assert_eq!(ledger.spawned_for("grunt"), 2);
    let spawned = events
        .iter()
        .filter(|event| matches!(event, Event::EnemySpawned { .. }))
        .count();
    assert_eq!(spawned, 2);

    ledger.clear_wave(0);
    let events = run(&mut director, &mut ledger, 1, 0.5);
    assert_eq!(events, vec![Event::WaveCompleted { wave: 0 }]);
}

#[test]
fn calling_early_skips_the_countdown() {
    let waves = [wave(vec![SpawnGroupDefinition::new("grunt", 1, 1.0)])];
    let mut director = WaveDirector::new(&waves, &Config::new(30.0));
    let mut ledger = Ledger::default();

    assert!(director.call_early());
    let events = run(&mut director, &mut ledger, 1, 0.016);

    assert_eq!(events.first(), Some(&Event::WaveStarted { wave: 0 }));
    assert!(!director.call_early(), "no wave is waiting while active");
}

#[test]
fn reset_rewinds_progress() {
    let waves = [
        wave(vec![SpawnGroupDefinition::new("grunt", 1, 1.0)]),
        wave(vec![SpawnGroupDefinition::new("grunt", 2, 1.0)]),
    ];
    let mut director = WaveDirector::new(&waves, &Config::new(1.0));
    let mut ledger = Ledger::default();
    let _ = run(&mut director, &mut ledger, 3, 1.0);
    ledger.clear_wave(0);
    let _ = run(&mut director, &mut ledger, 2, 1.0);
    assert_eq!(director.current_wave(), 1);

    director.reset();

    assert_eq!(director.current_wave(), 0);
    assert_eq!(director.phase(), Phase::Idle { countdown: 1.0 });
    assert!(director
        .groups(1)
        .iter()
        .all(|group| group.spawned() == 0));
}

#[test]
fn level_without_waves_is_won_immediately() {
    let mut director = WaveDirector::new(&[], &Config::new(5.0));
    let mut ledger = Ledger::default();

    assert!(run(&mut director, &mut ledger, 1, 0.1).is_empty());
    assert!(director.is_victorious());
}

#[test]
fn malformed_toml_groups_still_play_out_against_the_roster() {
    let level: LevelDefinition = toml::from_str(
        r#"
        default_enemy = "grunt"
        paths = [[{ x = 0.0, y = 0.0 }, { x = 100.0, y = 0.0 }]]

        [[waves]]
        [[waves.groups]]
        type = "grunt"
        count = "many"
        spawnInterval = 0.25
        hpMultiplier = "tough"

        [[waves.groups]]
        count = 2
        spawn_interval = 0.25
        pathIndex = 9
        "#,
    )
    .expect("level parses despite malformed groups");

    let mut definitions = BTreeMap::new();
    let _ = definitions.insert(
        String::from("grunt"),
        EnemyDefinition::new(8.0, 1.0, 1.0, 40.0),
    );
    let mut roster = EnemyRoster::new(definitions, level.polylines(), RosterSettings::default());
    let config = Config::new(0.0)
        .with_default_enemy("grunt")
        .with_known_enemies(["grunt"]);
    let mut director = WaveDirector::new(&level.waves, &config);

    let groups = director.groups(0);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].count, 1);
    assert_eq!(groups[0].hp_multiplier, 1.0);
    assert_eq!(groups[1].enemy, "grunt");
    assert_eq!(groups[1].path, 9);

    let mut events = Vec::new();
    for _ in 0..4 {
        director.tick(0.25, &mut roster, &mut events);
    }
    assert_eq!(roster.live_in_wave(0), 3, "one + two enemies spawned");
    assert!(roster.iter().all(|enemy| enemy.path() == 0));

    for enemy in roster.iter_mut() {
        let _ = enemy.apply_damage(f32::MAX);
    }
    let mut removals = Vec::new();
    roster.sweep(level.width, &mut removals);
    director.tick(0.25, &mut roster, &mut events);

    assert_eq!(events.last(), Some(&Event::WaveCompleted { wave: 0 }));
    assert!(director.is_victorious());
}
