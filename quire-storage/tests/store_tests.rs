use quire_storage::{load_json, save_json, KeyValueStore, MemoryStore, SqliteStore};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Counters {
    pages_printed: u32,
    characters_copied: u32,
}

fn exercise(store: &dyn KeyValueStore) {
    assert_eq!(store.get("license/a/rights").unwrap(), None);

    store.set("license/a/rights", "one").unwrap();
    assert_eq!(store.get("license/a/rights").unwrap().as_deref(), Some("one"));

    store.set("license/a/rights", "two").unwrap();
    assert_eq!(store.get("license/a/rights").unwrap().as_deref(), Some("two"));

    store.remove("license/a/rights").unwrap();
    assert_eq!(store.get("license/a/rights").unwrap(), None);

    // Removing twice is fine.
    store.remove("license/a/rights").unwrap();
}

// ── MemoryStore ──────────────────────────────────────────────────

#[test]
fn memory_store_get_set_remove() {
    exercise(&MemoryStore::new());
}

#[test]
fn memory_store_keys_are_sorted() {
    let store = MemoryStore::new();
    store.set("b", "2").unwrap();
    store.set("a", "1").unwrap();
    assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(store.len(), 2);
    assert!(!store.is_empty());
}

// ── SqliteStore ──────────────────────────────────────────────────

#[test]
fn sqlite_store_get_set_remove() {
    exercise(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn sqlite_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("quire.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.set("device/id", "dev-123").unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.get("device/id").unwrap().as_deref(), Some("dev-123"));
}

#[test]
fn keys_are_isolated() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.set("license/a/rights", "a").unwrap();
    store.set("license/b/rights", "b").unwrap();
    assert_eq!(store.get("license/a/rights").unwrap().as_deref(), Some("a"));
    assert_eq!(store.get("license/b/rights").unwrap().as_deref(), Some("b"));
}

// ── JSON helpers ─────────────────────────────────────────────────

#[test]
fn json_helpers_roundtrip() {
    let store = MemoryStore::new();
    let counters = Counters {
        pages_printed: 3,
        characters_copied: 120,
    };
    save_json(&store, "license/a/rights", &counters).unwrap();
    let loaded: Option<Counters> = load_json(&store, "license/a/rights").unwrap();
    assert_eq!(loaded, Some(counters));
}

#[test]
fn json_helpers_missing_key_is_none() {
    let store = MemoryStore::new();
    let loaded: Option<Counters> = load_json(&store, "nope").unwrap();
    assert!(loaded.is_none());
}

#[test]
fn json_helpers_corrupt_value_is_an_error() {
    let store = MemoryStore::new();
    store.set("license/a/rights", "{not json").unwrap();
    let loaded: Result<Option<Counters>, _> = load_json(&store, "license/a/rights");
    assert!(loaded.is_err());
}
