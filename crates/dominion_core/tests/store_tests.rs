//! Committing invasions through the dominion store.

use dominion_core::error::{InvasionError, PreconditionViolation, RuleViolation};
use dominion_core::event::{GameEventKind, Notification};
use dominion_core::spells::ActiveSpell;
use dominion_core::store::AlertType;
use dominion_core::units::UnitSlot;
use dominion_test_utils::fixtures::{self, World};

#[test]
fn test_successful_invasion_is_committed() {
    let world = World::new();
    let store = world.store([fixtures::attacker(), fixtures::defender(800)]);

    let outcome = store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK)
        .expect("invasion");

    assert_eq!(outcome.alert_type, AlertType::Success);
    assert_eq!(outcome.event_id, 1);
    assert_eq!(
        outcome.message,
        "You are victorious and defeat the forces of Dominion 2 (#2), conquering 41 new acres of land! \
         During the invasion, your troops also discovered 41 acres of land."
    );

    let attacker = store.dominion(fixtures::ATTACKER).expect("attacker");
    let defender = store.dominion(fixtures::DEFENDER).expect("defender");
    assert_eq!(attacker.military.units[UnitSlot::Four], 400);
    assert_eq!(attacker.stats.attacking_success, 1);
    assert_eq!(defender.land.total(), 759);
    assert_eq!(defender.stats.defending_failures, 1);
    assert_eq!(defender.invasions_received.len(), 1);
    assert!(!store.queue(fixtures::ATTACKER).expect("queue").is_empty());

    let defender_realm = store.realm(fixtures::DEFENDER_REALM).expect("realm");
    assert_eq!(defender_realm.invasions_received.len(), 1);
}

#[test]
fn test_event_and_notification() {
    let world = World::new();
    let store = world.store([fixtures::attacker(), fixtures::defender(800)]);
    store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK)
        .expect("invasion");

    let events = store.events().expect("events");
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!((event.source, event.target, event.tick), (fixtures::ATTACKER, fixtures::DEFENDER, fixtures::TICK));
    let GameEventKind::Invasion(result) = &event.kind;
    assert!(result.is_success());

    let notifications = store.take_notifications().expect("notifications");
    assert_eq!(notifications.len(), 1);
    match &notifications[0] {
        Notification::ReceivedInvasion {
            dominion,
            event_id,
            land_lost,
            ..
        } => {
            assert_eq!(*dominion, fixtures::DEFENDER);
            assert_eq!(*event_id, 1);
            assert_eq!(*land_lost, 41);
        }
        other => panic!("expected a received invasion, got {other:?}"),
    }
    assert!(store.take_notifications().expect("drained").is_empty());
}

#[test]
fn test_repelled_invasion() {
    let world = World::new();
    let store = world.store([fixtures::attacker(), fixtures::defender(650)]);
    let outcome = store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(500), fixtures::TICK)
        .expect("invasion");

    assert_eq!(outcome.alert_type, AlertType::Danger);
    assert_eq!(outcome.message, "Your army fails to defeat the forces of Dominion 2 (#2).");

    let attacker = store.dominion(fixtures::ATTACKER).expect("attacker");
    assert_eq!(attacker.stats.attacking_failures, 1);
    let realm = store.realm(fixtures::DEFENDER_REALM).expect("realm");
    assert_eq!(realm.stat_defending_success, 1);

    let notifications = store.take_notifications().expect("notifications");
    assert!(matches!(
        notifications.as_slice(),
        [Notification::RepelledInvasion { attacker_overwhelmed: true, .. }]
    ));
}

#[test]
fn test_rejected_invasion_changes_nothing() {
    let world = World::new();
    let mut defender = fixtures::defender(800);
    defender.spells.apply(ActiveSpell::new("stasis", 6));
    let store = world.store([fixtures::attacker(), defender]);

    let attacker_before = store.dominion(fixtures::ATTACKER).expect("attacker").state_hash();
    let defender_before = store.dominion(fixtures::DEFENDER).expect("defender").state_hash();

    let err = store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK)
        .expect_err("stasis");
    assert!(matches!(err, InvasionError::Rule(RuleViolation::TargetInStasis)));

    assert_eq!(store.dominion(fixtures::ATTACKER).expect("attacker").state_hash(), attacker_before);
    assert_eq!(store.dominion(fixtures::DEFENDER).expect("defender").state_hash(), defender_before);
    assert!(store.queue(fixtures::ATTACKER).expect("queue").is_empty());
    assert!(store.queue(fixtures::DEFENDER).expect("queue").is_empty());
    assert!(store.events().expect("events").is_empty());
    assert!(store.take_notifications().expect("notifications").is_empty());
}

#[test]
fn test_self_invasion() {
    let world = World::new();
    let store = world.store([fixtures::attacker()]);
    let err = store
        .invade(fixtures::ATTACKER, fixtures::ATTACKER, &fixtures::deployment(100), fixtures::TICK)
        .expect_err("self");
    assert!(matches!(err, InvasionError::Precondition(PreconditionViolation::SelfInvasion)));
}

#[test]
fn test_missing_dominion_is_an_invariant_failure() {
    let world = World::new();
    let store = world.store([fixtures::attacker()]);
    let err = store
        .invade(fixtures::ATTACKER, 99, &fixtures::deployment(100), fixtures::TICK)
        .expect_err("missing");
    assert!(!err.is_user_facing());
}

#[test]
fn test_returning_army_arrives_through_the_store() {
    let world = World::new();
    let store = world.store([fixtures::attacker(), fixtures::defender(800)]);
    store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK)
        .expect("invasion");

    for _ in 0..12 {
        store.advance_tick().expect("tick");
    }
    let attacker = store.dominion(fixtures::ATTACKER).expect("attacker");
    assert_eq!(attacker.military.units[UnitSlot::Four], 493);
    assert_eq!(attacker.land.total(), 1082);
    assert!(store.queue(fixtures::ATTACKER).expect("queue").is_empty());
}

#[test]
fn test_repeat_hits_count_as_recent() {
    let world = World::new();
    let store = world.store([fixtures::attacker(), fixtures::defender(800)]);
    store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK)
        .expect("first");
    let second = store
        .invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK + 1)
        .expect("second");
    assert_eq!(second.event_id, 2);

    let events = store.events().expect("events");
    let GameEventKind::Invasion(result) = &events[1].kind;
    assert_eq!(result.defender().recently_invaded_count, 1);
    // The same attacker discovers nothing on a repeat hit.
    assert_eq!(result.land_discovered(), 0);
}

#[test]
fn test_parallel_invasions_on_disjoint_pairs() {
    let world = World::new();
    let other_attacker = fixtures::dominion(3, fixtures::ATTACKER_REALM, "human", 1000, fixtures::attacker().military.units);
    let other_defender = fixtures::dominion(4, fixtures::DEFENDER_REALM, "human", 800, fixtures::defender(800).military.units);
    let store = world.store([fixtures::attacker(), fixtures::defender(800), other_attacker, other_defender]);

    std::thread::scope(|s| {
        let store = &store;
        let a = s.spawn(move || store.invade(fixtures::ATTACKER, fixtures::DEFENDER, &fixtures::deployment(1000), fixtures::TICK));
        let b = s.spawn(move || store.invade(3, 4, &fixtures::deployment(1000), fixtures::TICK));
        assert!(a.join().expect("thread").is_ok());
        assert!(b.join().expect("thread").is_ok());
    });

    let mut ids: Vec<_> = store.events().expect("events").iter().map(|e| e.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(store.dominion(4).expect("defender").land.total(), 759);
}
