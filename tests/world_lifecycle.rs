mod common;

use std::collections::BTreeSet;

use common::{runtime, Curious, Follower, Health, Journal, Probe, Reporter, Ticker};
use strata::ecs::{EntityState, Transform};
use strata::Uuid;
use tempfile::tempdir;

#[test]
fn activation_round_trip_fires_each_hook_once() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();

    let probes: Vec<_> = (0..3)
        .map(|_| world.create_entity().add_component::<Probe>().unwrap())
        .collect();

    world.set_active(true);
    world.set_active(false);

    for probe in &probes {
        let probe = probe.borrow();
        assert_eq!(probe.events, vec!["start", "destroyed"]);
        assert!(!probe.enabled);
    }
}

#[test]
fn destroy_while_inactive_still_tears_down() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();

    let doomed = world.create_entity();
    let doomed_probe = doomed.add_component::<Probe>().unwrap();
    doomed.destroy();
    assert_eq!(doomed_probe.borrow().count("destroyed"), 1);
    assert_eq!(doomed.state(), EntityState::Destroyed);

    let survivor = world.create_entity();
    let removed_probe = survivor.add_component::<Probe>().unwrap();
    assert!(survivor.remove_component::<Probe>());
    assert_eq!(removed_probe.borrow().count("destroyed"), 0);
    assert_eq!(removed_probe.borrow().count("dispose"), 0);
}

#[test]
fn behaviours_start_before_systems_enable_and_stop_before_they_disable() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();
    let journal = world.add_system::<Journal>().unwrap();
    world.create_entity().add_component::<Reporter>().unwrap();
    world.create_entity().add_component::<Reporter>().unwrap();
    assert!(journal.borrow().entries.is_empty());

    world.set_active(true);
    assert_eq!(journal.borrow().entries, vec!["start", "start", "enable"]);

    journal.borrow_mut().entries.clear();
    world.set_active(false);
    assert_eq!(journal.borrow().entries, vec!["destroyed", "destroyed", "disable"]);
}

#[test]
fn removed_component_is_gone_before_its_destroyed_hook() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();
    let journal = world.add_system::<Journal>().unwrap();
    world.set_active(true);

    let entity = world.create_entity();
    let reporter = entity.add_component::<Reporter>().unwrap();
    assert!(entity.remove_component::<Reporter>());

    assert_eq!(reporter.borrow().attached_when_destroyed, Some(false));
    assert!(!reporter.borrow().enabled);
    assert_eq!(journal.borrow().entries, vec!["enable", "start", "destroyed"]);
}

#[test]
fn start_hook_sees_siblings_added_earlier() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();

    let entity = world.create_entity();
    entity.add_component::<Health>().unwrap().borrow_mut().points = 7;
    let curious = entity.add_component::<Curious>().unwrap();
    world.set_active(true);
    assert_eq!(curious.borrow().saw_health, Some(7));
}

#[test]
fn round_trip_restores_ids_and_cross_references() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();

    // The follower is created first so it refers forward to its leader.
    let follower = world.create_entity();
    let leader = world.create_entity();
    follower.add_component::<Follower>().unwrap().borrow_mut().target = Some(leader.clone());
    leader.add_component::<Health>().unwrap().borrow_mut().points = 42;
    let child = world.create_entity();
    assert!(child.set_parent(Some(&leader)));
    world.add_system::<Ticker>().unwrap().borrow_mut().ticks = 5;

    let ids: BTreeSet<Uuid> = world.entities().iter().map(|e| e.id()).collect();
    let saved = world.on_serialize();

    world.clear();
    assert_eq!(world.entity_count(), 0);
    world.on_deserialize(&saved);

    let restored: BTreeSet<Uuid> = world.entities().iter().map(|e| e.id()).collect();
    assert_eq!(restored, ids);

    let new_follower = world.entity(follower.id()).unwrap();
    let new_leader = world.entity(leader.id()).unwrap();
    assert!(!new_leader.same_instance(&leader));
    assert_eq!(new_leader.get_component::<Health>().unwrap().borrow().points, 42);

    let target = new_follower
        .get_component::<Follower>()
        .unwrap()
        .borrow()
        .target
        .clone()
        .unwrap();
    assert!(target.same_instance(&new_leader));

    let new_child = world.entity(child.id()).unwrap();
    assert!(new_child.parent().unwrap().same_instance(&new_leader));
    assert_eq!(new_leader.children().len(), 1);
    assert!(new_leader.has_component::<Transform>());

    assert_eq!(world.get_system::<Ticker>().unwrap().borrow().ticks, 5);
}

#[test]
fn restore_into_a_populated_world_replaces_its_entities() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let source = runtime.create_world();
    source.create_entity().add_component::<Health>();
    let saved = source.on_serialize();

    let target = runtime.create_world();
    let stale = target.create_entity();
    let stale_probe = stale.add_component::<Probe>().unwrap();
    target.on_deserialize(&saved);

    assert_eq!(stale.state(), EntityState::Destroyed);
    assert_eq!(stale_probe.borrow().count("destroyed"), 1);
    assert_eq!(target.entity_count(), 1);
    assert_eq!(target.query::<Health>().len(), 1);
}

#[test]
fn restored_systems_match_activation() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let source = runtime.create_world();
    source.add_system::<Ticker>();
    let saved = source.on_serialize();

    let target = runtime.create_world();
    target.set_active(true);
    target.on_deserialize(&saved);
    assert!(target.is_system_enabled("Ticker"));

    let stats = target.update(1.0 / 60.0);
    assert_eq!(stats.systems_run, 1);
    assert_eq!(target.get_system::<Ticker>().unwrap().borrow().ticks, 1);
}

#[test]
fn unknown_saved_types_are_skipped() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let world = runtime.create_world();
    let saved = serde_json::json!({
        "Systems": { "Weather": {} },
        "Entities": [
            { "ID": "77", "Components": { "Health": { "points": 3 }, "Ghost": {} } }
        ]
    });
    world.on_deserialize(&saved);

    let entity = world.entity(Uuid::new(77)).unwrap();
    assert_eq!(entity.component_names(), vec!["Health"]);
    assert!(world.system_names().is_empty());
}
