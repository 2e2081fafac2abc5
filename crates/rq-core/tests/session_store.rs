//! Derived-state store tests against real files in a temp directory.

use rq_common::ThreatActorId;
use rq_core::session::{
    DerivedSnapshot, DerivedState, FileStore, KeyValueStore, StoreError, StoredValue,
};
use rq_core::{assert_approx_eq, assert_ok};
use tempfile::TempDir;

fn snapshot() -> DerivedSnapshot {
    DerivedSnapshot {
        tef: 0.42,
        total_lef: 0.21,
        total_risk: 12_345.5,
        selected_threat_actor_id: Some(ThreatActorId::from("apt-1")),
    }
}

#[test]
fn missing_file_reads_defaults() {
    let dir = TempDir::new().unwrap();
    let state = DerivedState::new(FileStore::new(dir.path().join("derived_state.json")));
    assert_eq!(assert_ok!(state.snapshot()), DerivedSnapshot::default());
}

#[test]
fn values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("derived_state.json");

    let mut state = DerivedState::new(FileStore::new(&path));
    assert_ok!(state.record(&snapshot()));
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = DerivedState::new(FileStore::new(&path));
    let read = assert_ok!(reopened.snapshot());
    assert_approx_eq!(read.tef, 0.42);
    assert_approx_eq!(read.total_lef, 0.21);
    assert_approx_eq!(read.total_risk, 12_345.5);
    assert_eq!(read.selected_threat_actor_id, Some(ThreatActorId::from("apt-1")));
}

#[test]
fn reset_clears_every_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("derived_state.json");
    let mut state = DerivedState::new(FileStore::new(&path));
    assert_ok!(state.record(&snapshot()));
    assert_ok!(state.reset());

    let reopened = DerivedState::new(FileStore::new(&path));
    assert_eq!(assert_ok!(reopened.snapshot()), DerivedSnapshot::default());
}

#[test]
fn clearing_the_actor_removes_the_key() {
    let dir = TempDir::new().unwrap();
    let mut state = DerivedState::new(FileStore::new(dir.path().join("s.json")));
    assert_ok!(state.select_threat_actor(Some(&ThreatActorId::from("apt-1"))));
    assert_ok!(state.select_threat_actor(None));
    assert_eq!(assert_ok!(state.selected_threat_actor()), None);
}

#[test]
fn corrupted_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("derived_state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let state = DerivedState::new(FileStore::new(&path));
    let err = state.snapshot().unwrap_err();
    assert!(matches!(err, StoreError::Corrupted { .. }));

    let common: rq_common::Error = err.into();
    assert_eq!(common.code(), 50);
}

#[test]
fn reset_recovers_a_corrupted_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("derived_state.json");
    std::fs::write(&path, "garbage").unwrap();

    let mut state = DerivedState::new(FileStore::new(&path));
    assert_ok!(state.reset());
    assert_eq!(assert_ok!(state.snapshot()), DerivedSnapshot::default());
}

#[test]
fn numbers_written_as_text_are_read() {
    let dir = TempDir::new().unwrap();
    let mut store = FileStore::new(dir.path().join("s.json"));
    assert_ok!(store.set("tef", StoredValue::Text("0.25".to_string())));

    let state = DerivedState::new(store);
    assert_approx_eq!(assert_ok!(state.tef()), 0.25);
}

#[test]
fn file_layout_is_plain_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("derived_state.json");
    let mut state = DerivedState::new(FileStore::new(&path));
    assert_ok!(state.record(&snapshot()));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["values"]["selectedThreatActorId"], "apt-1");
    assert!(raw["values"]["totalLEF"].is_number());
    assert!(raw["updated_at"].is_string());
}
