//! Integration tests for PlanningStore
//!
//! These drive the store through its public API against both storage adapters.

use chrono::Weekday;
use planningstore::{
    ErrorKind, FileStorage, KeyValueStore, MemoryStorage, NamePolicy, PlanningError, PlanningStore, STATE_KEY, Shift,
    SlotKey, StoreOptions, WeekKey,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn memory_store() -> PlanningStore<MemoryStorage> {
    PlanningStore::open(MemoryStorage::new(), StoreOptions::default()).expect("Failed to open store")
}

fn week() -> WeekKey {
    "2024-01-15".parse().unwrap()
}

fn slot(day: Weekday, shift: Shift) -> SlotKey {
    SlotKey::in_week(week(), day, shift).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_roster_duplicate_scenario() {
    let mut store = memory_store();
    store.add_member("Alice").unwrap();
    assert_eq!(store.roster().names(), ["Alice"]);

    let err = store.add_member("alice").unwrap_err();
    assert!(matches!(err, PlanningError::Duplicate(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.roster().names(), ["Alice"]);
}

#[test]
fn test_remove_from_slot_clears_tasks_scenario() {
    let mut store = memory_store();
    let key = slot(Weekday::Mon, Shift::Afternoon);
    store.add_member_to_slot(&key, "Bob").unwrap();
    store.assign_task(&key, "Trash", "Bob").unwrap();

    assert!(store.remove_member_from_slot(&key, "Bob").unwrap());
    let view = store.week_view(&week());
    let slot = view.slots().find(|s| s.key == key).unwrap();
    assert!(slot.members.is_empty());
    assert!(slot.tasks.iter().all(|t| t.assignee.is_none()));
}

#[test]
fn test_week_note_scenario() {
    let mut store = memory_store();
    assert_eq!(store.add_week_note(&week(), "Hello", Some("Ana")).unwrap(), 0);
    store.update_week_note(&week(), 0, "Hi", Some("Ana")).unwrap();
    assert_eq!(store.week_note(&week(), 0).unwrap().text, "Hi");
    store.delete_week_note(&week(), 0).unwrap();
    assert!(store.week(&week()).is_none());
    assert_eq!(store.roster().names(), ["Ana"]);
}

#[test]
fn test_history_eviction_scenario() {
    let mut store = memory_store();
    for n in 0..20 {
        store.snapshot_week(&week().shift(n)).unwrap();
    }
    store.snapshot_week(&week().shift(20)).unwrap();

    let dates: Vec<WeekKey> = store.history().iter().map(|s| s.date).collect();
    let expected: Vec<WeekKey> = (1..=20).map(|n| week().shift(n)).collect();
    assert_eq!(dates, expected);
}

#[test]
fn test_restore_then_mutate_leaves_snapshot_alone() {
    let mut store = memory_store();
    let key = slot(Weekday::Wed, Shift::Morning);
    store.add_member_to_slot(&key, "Bob").unwrap();
    store.snapshot_week(&week()).unwrap();

    store.reset_week(&week()).unwrap();
    store.restore_snapshot(0).unwrap();
    store.toggle_attendance(&key, "Bob").unwrap();
    store.add_member_to_slot(&key, "Eve").unwrap();

    let saved = &store.history().get(0).unwrap().data.slots[&key];
    assert_eq!(saved.members.len(), 1);
    assert!(saved.members[0].present);

    store.snapshot_week(&week()).unwrap();
    assert_eq!(store.history().get(1).unwrap().data.slots[&key].members.len(), 2);
}

#[test]
fn test_export_import_round_trip() {
    let mut source = memory_store();
    for name in ["Alice", "Bob"] {
        source.add_member(name).unwrap();
    }
    let key = slot(Weekday::Tue, Shift::Afternoon);
    source.add_member_to_slot(&key, "Alice").unwrap();
    source.assign_task(&key, "Cleaning", "Alice").unwrap();
    source.set_slot_note(&key, "Mop is broken", Some("Bob")).unwrap();
    source.add_week_note(&week().shift(1), "Holiday", None).unwrap();
    source.snapshot_week(&week()).unwrap();

    let mut target = memory_store();
    target.import_json(&source.export_json().unwrap()).unwrap();
    assert_eq!(target.roster().names(), source.roster().names());
    assert_eq!(target.weeks(), source.weeks());
    assert_eq!(target.history(), source.history());

    let reopened = PlanningStore::open(target.storage().clone(), StoreOptions::default()).unwrap();
    assert_eq!(reopened.history().len(), 1);
    assert_eq!(reopened.history().get(0).unwrap().data.slots[&key].tasks["Cleaning"], "Alice");
}

#[test]
fn test_legacy_payload_loads() {
    let legacy = r#"{
        "members": ["Alice", "Bob"],
        "weekData": {
            "2024-01-15": {
                "2024-01-15_Matin": {"members": [{"name": "Alice", "present": true}], "tasks": {}, "note": "Keys at desk"},
                "2024-01-16_Après-midi": {"members": [{"name": "Bob", "present": false}], "tasks": {"Trash": "Bob"}, "note": ""}
            }
        },
        "theme": "violet",
        "darkMode": false,
        "currentUser": "Alice"
    }"#;
    let mut storage = MemoryStorage::new();
    storage.set(STATE_KEY, legacy).unwrap();

    let store = PlanningStore::open(storage, StoreOptions::default()).unwrap();
    assert_eq!(store.roster().current_user(), Some("Alice"));
    let morning = store.slot(&slot(Weekday::Mon, Shift::Morning)).unwrap();
    assert_eq!(morning.note.as_ref().unwrap().text, "Keys at desk");
    let afternoon = store.slot(&slot(Weekday::Tue, Shift::Afternoon)).unwrap();
    assert_eq!(afternoon.note, None);
    assert_eq!(afternoon.tasks["Trash"], "Bob");
}

#[test]
fn test_file_storage_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let key = slot(Weekday::Fri, Shift::Morning);
    {
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        let mut store = PlanningStore::open(storage, StoreOptions::default()).unwrap();
        store.set_current_user("Ana").unwrap();
        store.join_current_user(&key).unwrap();
        store.snapshot_week(&week()).unwrap();
    }

    let storage = FileStorage::open(temp_dir.path()).unwrap();
    let store = PlanningStore::open(storage, StoreOptions::default()).unwrap();
    assert_eq!(store.roster().current_user(), Some("Ana"));
    assert_eq!(store.slot(&key).unwrap().members[0].name, "Ana");
    assert_eq!(store.history().len(), 1);
    assert!(temp_dir.path().join("kfet.json").exists());
    assert!(temp_dir.path().join("kfet_history.json").exists());
}

#[test]
fn test_persistence_failure_reports_and_keeps_memory() {
    let mut store = PlanningStore::open(MemoryStorage::with_quota(8), StoreOptions::default()).unwrap();
    let key = slot(Weekday::Mon, Shift::Morning);
    let err = store.add_member_to_slot(&key, "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(store.slot(&key).unwrap().members[0].name, "Bob");
}

#[test]
fn test_case_sensitive_policy() {
    let options = StoreOptions {
        names: NamePolicy {
            case_insensitive: false,
            max_name_len: None,
        },
        ..StoreOptions::default()
    };
    let mut store = PlanningStore::open(MemoryStorage::new(), options).unwrap();
    store.add_member("Alice").unwrap();
    store.add_member("alice").unwrap();
    store.add_member(&"x".repeat(100)).unwrap();
    assert_eq!(store.roster().len(), 3);
}

#[test]
fn test_weekend_slot_rejected() {
    let saturday = chrono::NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
    let err = SlotKey::new(saturday, Shift::Morning).unwrap_err();
    assert!(matches!(err, PlanningError::Weekend(_)));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_slot_add_remove_leaves_nothing(day in 0u32..5, afternoon: bool, name in "[A-Za-z]{1,12}") {
        let mut store = memory_store();
        let shift = if afternoon { Shift::Afternoon } else { Shift::Morning };
        let key = SlotKey::in_week(week(), Weekday::try_from(day as u8).unwrap(), shift).unwrap();

        store.add_member_to_slot(&key, &name).unwrap();
        if afternoon {
            store.assign_task(&key, "Accounts", &name).unwrap();
        }
        prop_assert!(store.remove_member_from_slot(&key, &name).unwrap());
        prop_assert!(store.slot(&key).is_none());
        prop_assert!(store.weeks().is_empty());
    }

    #[test]
    fn prop_export_import_identity(names in proptest::collection::vec("[A-Z][a-z]{0,8}", 0..6)) {
        let mut source = memory_store();
        for name in &names {
            let _ = source.add_member(name);
        }
        let key = slot(Weekday::Thu, Shift::Afternoon);
        for name in source.roster().names().to_vec() {
            source.add_member_to_slot(&key, &name).unwrap();
        }

        let mut target = memory_store();
        target.import_json(&source.export_json().unwrap()).unwrap();
        prop_assert_eq!(target.roster().names(), source.roster().names());
        prop_assert_eq!(target.weeks(), source.weeks());
    }
}
