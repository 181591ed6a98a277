//! The classic refilling wave, built in code and from a level script.

mod common;

use common::{headless_level, load_fixture, secs};
use sortie::actions::SpawnEnemy;
use sortie::config::GameSettings;
use sortie::host::{EntitySpec, LootItem, Scene};
use sortie::script::{CounterReaches, Event};
use sortie::state::{EntitySnapshot, Point, StateKey, Value};

fn enemies(entities: &[EntitySpec]) -> usize {
    entities
        .iter()
        .filter(|e| matches!(e, EntitySpec::Enemy { .. }))
        .count()
}

fn death(id: u64) -> Value {
    Value::Entity(EntitySnapshot::at(id, "basic", Point::new(50.0, 50.0)))
}

#[test]
fn wave_spawns_three_then_completes() {
    let (mut level, host) = headless_level(GameSettings::default());
    let phase = level.phase("wave");
    phase.execute(SpawnEnemy::new("x"));
    phase.when(
        Event::enemy_dies()
            .execute(SpawnEnemy::new("x"))
            .until(CounterReaches::enemies_spawned(3)),
    );
    level.set_phase_sequence([phase.clone()]);
    level.start(0);

    assert_eq!(enemies(&host.entities()), 1);

    level.store().inform(StateKey::ENEMY_DIED, death(1));
    assert_eq!(enemies(&host.entities()), 2);
    assert!(!phase.is_finished());

    level.store().inform(StateKey::ENEMY_DIED, death(2));
    assert_eq!(enemies(&host.entities()), 3);
    assert!(phase.is_finished());

    level.store().inform(StateKey::ENEMY_DIED, death(3));
    assert_eq!(enemies(&host.entities()), 3);
    assert_eq!(host.current_scene(), Some(Scene::MainMenu));
}

#[test]
fn scripted_wave_plays_through() {
    let (mut level, host) = load_fixture("first_contact.yaml");
    level.start(3);

    // Countdown 0..3, briefing 3..5, wave from 5.
    level.update(secs(5));
    assert_eq!(host.messages(), vec!["3", "2", "1", "Wave 1"]);
    assert_eq!(enemies(&host.entities()), 1);

    level.store().inform(StateKey::ENEMY_DIED, death(1));
    level.store().inform(StateKey::ENEMY_DIED, death(2));

    let entities = host.entities();
    assert_eq!(enemies(&entities), 3);
    let experience: u64 = entities
        .iter()
        .filter_map(|e| match e {
            EntitySpec::Loot {
                item: LootItem::Experience(xp),
                ..
            } => Some(*xp),
            _ => None,
        })
        .sum();
    assert_eq!(experience, 24);
    assert_eq!(host.messages().last().map(String::as_str), Some("Wave cleared"));
    assert!(level.is_complete());
}

#[test]
fn gated_swarm_stops_at_boss_and_waits_for_kill() {
    let (mut level, host) = load_fixture("gated_swarm.yaml");
    level.start(0);
    level.update(secs(5));

    let entities = host.entities();
    let minions = entities
        .iter()
        .filter(|e| matches!(e, EntitySpec::Enemy { kind, .. } if kind == "minion"))
        .count();
    assert_eq!(minions, 3);
    assert!(!level.is_complete());

    level.store().inform(StateKey::ENEMY_DIED, death(9));
    assert_eq!(level.store().get_int(&StateKey::PLAYER_LEVEL, 1), 2);
    assert_eq!(level.store().get_int(&StateKey::PLAYER_EXPERIENCE, 0), 50);
    assert_eq!(host.messages(), vec!["Here it comes", "Boss down"]);
    assert!(level.is_complete());
}
