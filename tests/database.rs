mod common;

use std::fs;

use common::{runtime, text, Health, Note, Tag};
use serde_json::Value;
use strata::resource::ManifestEntry;
use strata::World;
use tempfile::tempdir;

#[test]
fn save_then_load_restores_resources_and_worlds() {
    let dir = tempdir().unwrap();
    let (note_id, world_id, entity_id) = {
        let runtime = runtime(dir.path());
        let resources = runtime.resources();
        let note = resources.load::<Note>("notes/a.note", text("saved")).unwrap();
        resources.load::<Tag>("tags/red.tag", Value::Null).unwrap();
        let world = runtime.load_world("scenes/main.world").unwrap();
        let entity = world.borrow().create_entity();
        entity.add_component::<Health>().unwrap().borrow_mut().points = 12;

        let manifest = resources.save_database().unwrap();
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
        assert_eq!(entries.len(), 3);

        let note_id = note.borrow().meta.id();
        let world_id = world.borrow().id();
        (note_id, world_id, entity.id())
    };

    let runtime = runtime(dir.path());
    let resources = runtime.resources();
    let report = resources.load_database().unwrap();
    assert_eq!(report.loaded.len(), 3);
    assert!(report.failed.is_empty());

    assert_eq!(resources.get::<Note>(note_id).unwrap().borrow().text, "saved");
    let world = resources.get::<World>(world_id).unwrap();
    let entity = world.borrow().entity(entity_id).unwrap();
    assert_eq!(entity.get_component::<Health>().unwrap().borrow().points, 12);
}

#[test]
fn second_load_skips_live_entries() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let resources = runtime.resources();
    resources.load::<Tag>("tags/blue.tag", Value::Null).unwrap();
    resources.save_database().unwrap();

    let report = resources.load_database().unwrap();
    assert!(report.loaded.is_empty());
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn missing_sidecar_leaves_resource_unloaded_for_retry() {
    let dir = tempdir().unwrap();
    let note_id = {
        let runtime = runtime(dir.path());
        let resources = runtime.resources();
        let note = resources.load::<Note>("notes/lost.note", text("gone")).unwrap();
        resources.save_database().unwrap();
        let id = note.borrow().meta.id();
        id
    };
    fs::remove_file(dir.path().join("notes/lost.note.cache")).unwrap();

    let runtime = runtime(dir.path());
    let resources = runtime.resources();
    let report = resources.load_database().unwrap();
    assert_eq!(report.failed, vec![note_id]);
    assert!(!resources.is_loaded(note_id));

    let retried = resources.load::<Note>("notes/lost.note", text("again")).unwrap();
    assert_eq!(retried.borrow().text, "again");
}

#[test]
fn unresolved_types_do_not_abort_the_manifest() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("Resources/ResourceDatabase.json");
    fs::create_dir_all(manifest.parent().unwrap()).unwrap();
    fs::write(
        &manifest,
        r#"[
            { "ID": "900", "Path": "old/thing.bin", "Type": "Legacy.Thing" },
            { "ID": "901", "Path": "tags/green.tag", "Type": "Tag" }
        ]"#,
    )
    .unwrap();

    let runtime = runtime(dir.path());
    let resources = runtime.resources();
    let report = resources.load_database().unwrap();
    assert_eq!(report.unresolved, vec!["Legacy.Thing".to_string()]);
    assert_eq!(report.loaded.len(), 1);
    assert_eq!(resources.get_id("tags/green.tag").raw(), 901);
}

#[test]
fn missing_manifest_is_an_empty_report() {
    let dir = tempdir().unwrap();
    let runtime = runtime(dir.path());
    let report = runtime.resources().load_database().unwrap();
    assert!(report.loaded.is_empty() && report.unresolved.is_empty());
}
