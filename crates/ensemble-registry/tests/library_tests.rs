//! Multi-package registry behaviour: loading, replacement, indexing, offsets.

mod common;

use std::fs;
use std::path::PathBuf;

use common::{scene_id, stage_id, PackageSpec, SceneSpec, SlotSpec};
use ensemble_core::fragment::{Fragment, Sex, SexSet};
use ensemble_core::tags::TagQuery;
use ensemble_core::transform::Axis;
use ensemble_registry::config::RegistryConfig;
use ensemble_registry::library::Library;
use ensemble_registry::RegistryError;

fn package(name: &str, scenes: &[usize]) -> PackageSpec {
    PackageSpec::new(
        name,
        scenes
            .iter()
            .map(|&n| SceneSpec::linear(&scene_id(n), vec![SlotSpec::human(SexSet::MALE)], 2))
            .collect(),
    )
}

/// A fresh scratch directory unique to this test process and `name`.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ensemble-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn loads_and_indexes_scenes() {
    let mut library = Library::default();
    library.load_bytes(&package("One", &[1, 2]).encode()).unwrap();
    library.load_bytes(&package("Two", &[3]).encode()).unwrap();
    assert_eq!(library.packages().len(), 2);
    assert_eq!(library.scene_count(), 3);
    assert!(library.scene(&scene_id(3)).is_some());
    assert!(library.scene("missing").is_none());
}

#[test]
fn failed_load_leaves_library_unchanged() {
    let mut library = Library::default();
    library.load_bytes(&package("One", &[1]).encode()).unwrap();

    let mut broken = package("Two", &[2, 3]);
    broken.scenes[1].graph[0].1.push("st99999".into());
    let err = library.load_bytes(&broken.encode()).unwrap_err();
    assert!(matches!(err, RegistryError::Malformed(_)));

    assert_eq!(library.packages().len(), 1);
    assert!(library.scene(&scene_id(2)).is_none());
    assert!(library.scene(&scene_id(3)).is_none());
}

#[test]
fn identical_content_is_rejected() {
    let mut library = Library::default();
    let bytes = package("One", &[1]).encode();
    library.load_bytes(&bytes).unwrap();
    match library.load_bytes(&bytes) {
        Err(RegistryError::DuplicateContent { name, fingerprint }) => {
            assert_eq!(name, "One");
            assert_eq!(fingerprint, blake3::hash(&bytes).to_hex().to_string());
        }
        other => panic!("expected DuplicateContent, got {other:?}"),
    }

    let mut permissive = Library::new(RegistryConfig {
        reject_duplicate_content: false,
        ..Default::default()
    });
    permissive.load_bytes(&bytes).unwrap();
    permissive.load_bytes(&bytes).unwrap();
    assert_eq!(permissive.packages().len(), 1);
}

#[test]
fn same_name_replaces_package() {
    let mut library = Library::default();
    library.load_bytes(&package("One", &[1]).encode()).unwrap();
    library.load_bytes(&package("One", &[2]).encode()).unwrap();
    assert_eq!(library.packages().len(), 1);
    assert!(library.scene(&scene_id(1)).is_none());
    assert!(library.scene(&scene_id(2)).is_some());
}

#[test]
fn duplicate_scene_ids_keep_first_until_unloaded() {
    let mut library = Library::default();
    let mut first = package("One", &[1]);
    first.hash = "aaaa".into();
    let mut second = package("Two", &[1]);
    second.hash = "bbbb".into();
    library.load_bytes(&first.encode()).unwrap();
    library.load_bytes(&second.encode()).unwrap();

    assert_eq!(library.scene(&scene_id(1)).unwrap().hash(), "aaaa");
    assert!(library.unload("One"));
    assert_eq!(library.scene(&scene_id(1)).unwrap().hash(), "bbbb");
    assert!(!library.unload("One"));
}

#[test]
fn enabled_flag_filters_queries() {
    let mut library = Library::default();
    let mut spec = package("One", &[1, 2]);
    spec.scenes[0].stages[0] = spec.scenes[0].stages[0].clone().tagged(&["Kissing"]);
    spec.scenes[1].stages[0] = spec.scenes[1].stages[0].clone().tagged(&["kissing"]);
    library.load_bytes(&spec.encode()).unwrap();

    let query = TagQuery::parse("kissing");
    assert_eq!(library.find_scenes(&query).len(), 2);
    assert!(library.set_enabled(&scene_id(1), false));
    let found = library.find_scenes(&query);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), scene_id(2));
    assert!(!library.set_enabled("missing", false));
}

#[test]
fn assign_follows_configured_fallback() {
    let bytes = package("One", &[1]).encode();
    let actors = [("A", Fragment::human(Sex::Female))];

    let mut strict = Library::new(RegistryConfig {
        degender_fallback: false,
        ..Default::default()
    });
    strict.load_bytes(&bytes).unwrap();
    assert!(strict.assign(&scene_id(1), &actors).is_none());

    let mut lenient = Library::default();
    lenient.load_bytes(&bytes).unwrap();
    assert!(lenient.assign(&scene_id(1), &actors).is_some());
    assert!(lenient.assign("missing", &actors).is_none());
}

#[test]
fn offsets_save_and_apply() {
    let mut library = Library::default();
    library.load_bytes(&package("One", &[1]).encode()).unwrap();
    assert!(library.save_offsets().is_empty());

    let scene = library.scene(&scene_id(1)).unwrap();
    let stage = scene.stage_by_key(&stage_id(1)).unwrap();
    stage.placements()[0].offset.adjust(Axis::X, 2.5);

    let saved = library.save_offsets();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved.scenes[&scene_id(1)][&stage_id(1)][&0], vec![2.5, 0.0, 0.0, 0.0]);

    library.reset_offsets();
    assert!(!stage.placements()[0].offset.has_changes());
    assert_eq!(library.apply_offsets(&saved), 1);
    assert_eq!(stage.placements()[0].offset.offset(), [2.5, 0.0, 0.0, 0.0]);

    let json = serde_json::to_string(&saved).unwrap();
    let back: ensemble_registry::library::OffsetOverrides = serde_json::from_str(&json).unwrap();
    assert_eq!(back, saved);
}

#[test]
fn shadowed_scene_offsets_are_saved_and_reset() {
    let mut library = Library::default();
    let mut first = package("One", &[1]);
    first.hash = "aaaa".into();
    let mut second = package("Two", &[1]);
    second.hash = "bbbb".into();
    library.load_bytes(&first.encode()).unwrap();
    library.load_bytes(&second.encode()).unwrap();

    let shadowed = library.package("Two").unwrap().scene(&scene_id(1)).unwrap();
    assert_eq!(library.scene(&scene_id(1)).unwrap().hash(), "aaaa");
    let placement = &shadowed.start_stage().placements()[0];
    placement.offset.adjust(Axis::Y, -3.0);

    let saved = library.save_offsets();
    assert_eq!(saved.scenes[&scene_id(1)][&stage_id(0)][&0], vec![0.0, -3.0, 0.0, 0.0]);

    library.reset_offsets();
    assert!(!placement.offset.has_changes());

    // Both packages carry the id, so the entry lands on each of them.
    assert_eq!(library.apply_offsets(&saved), 2);
    assert_eq!(placement.offset.offset(), [0.0, -3.0, 0.0, 0.0]);
}

#[test]
fn unknown_offset_entries_are_skipped() {
    let mut library = Library::default();
    library.load_bytes(&package("One", &[1]).encode()).unwrap();
    let json = format!(
        r#"{{ "{s}": {{ "{st}": {{ "0": [1, 2, 3, 4], "9": [1, 1, 1, 1] }}, "nostage": {{}} }}, "noscene": {{}} }}"#,
        s = scene_id(1),
        st = stage_id(0),
    );
    let overrides = serde_json::from_str(&json).unwrap();
    assert_eq!(library.apply_offsets(&overrides), 1);
}

#[test]
fn directory_load_skips_bad_files() {
    let dir = scratch_dir("dir-load");
    fs::write(dir.join("b.slr"), package("Two", &[2]).encode()).unwrap();
    fs::write(dir.join("a.slr"), package("One", &[1]).encode()).unwrap();
    fs::write(dir.join("c.slr"), b"\x01garbage").unwrap();
    fs::write(dir.join("readme.txt"), b"not a package").unwrap();

    let mut library = Library::default();
    let summary = library.load_directory(&dir).unwrap();
    assert_eq!(summary.loaded, vec!["One", "Two"]);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].0.ends_with("c.slr"));
    assert!(matches!(summary.failed[0].1, RegistryError::Decode { .. }));
    assert_eq!(library.scene_count(), 2);

    let offsets = dir.join("offsets.json");
    library
        .scene(&scene_id(1))
        .unwrap()
        .start_stage()
        .placements()[0]
        .offset
        .adjust(Axis::R, 15.0);
    library.save_offsets_file(&offsets).unwrap();
    library.reset_offsets();
    assert_eq!(library.load_offsets_file(&offsets).unwrap(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn config_file_round_trip() {
    let dir = scratch_dir("config");
    let path = dir.join("registry.json");
    fs::write(&path, r#"{ "package_extension": "pkg" }"#).unwrap();
    let config = RegistryConfig::from_json_file(&path).unwrap();
    assert_eq!(config.package_extension, "pkg");
    assert!(config.degender_fallback);

    fs::write(&path, "not json").unwrap();
    assert!(matches!(
        RegistryConfig::from_json_file(&path),
        Err(RegistryError::Config { .. })
    ));
    assert!(matches!(
        RegistryConfig::from_json_file(&dir.join("missing.json")),
        Err(RegistryError::Io { .. })
    ));
    let _ = fs::remove_dir_all(&dir);
}
