use quire_license::{default_device_name, keys, DeviceIdentity, LcpConfig};
use quire_storage::{KeyValueStore, MemoryStore, SqliteStore};
use std::path::PathBuf;

// ── Config ───────────────────────────────────────────────────────

#[test]
fn default_config() {
    let config = LcpConfig::default();
    assert!(config.allow_user_interaction);
    assert_eq!(config.http_timeout_secs, 30);
    assert!(config.user_agent.starts_with("Quire/"));
    assert_eq!(config.device_name, None);
    assert!(config.store_path().ends_with("quire/quire.db"));
}

#[test]
fn config_from_partial_json() {
    let config = LcpConfig::from_json(
        r#"{"allow_user_interaction": false, "device_name": "Kitchen tablet", "store_path": "/tmp/q.db"}"#,
    )
    .unwrap();

    assert!(!config.allow_user_interaction);
    assert_eq!(config.http_timeout_secs, 30);
    assert_eq!(config.device_name.as_deref(), Some("Kitchen tablet"));
    assert_eq!(config.store_path(), PathBuf::from("/tmp/q.db"));
}

#[test]
fn config_serde_roundtrip() {
    let config = LcpConfig {
        http_timeout_secs: 5,
        ..LcpConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(LcpConfig::from_json(&json).unwrap(), config);
}

#[test]
fn invalid_config_is_rejected() {
    assert!(LcpConfig::from_json(r#"{"http_timeout_secs": "soon"}"#).is_err());
}

// ── Device identity ──────────────────────────────────────────────

#[test]
fn device_id_is_generated_once() {
    let store = MemoryStore::new();

    let first = DeviceIdentity::load_or_create(&store, Some("Reader".to_string())).unwrap();
    let second = DeviceIdentity::load_or_create(&store, None).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.name, "Reader");
    assert_eq!(second.name, default_device_name());
    assert_eq!(store.get(keys::DEVICE_ID).unwrap().as_deref(), Some(first.id.as_str()));
}

#[test]
fn device_id_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("quire.db");

    let id = {
        let store = SqliteStore::open(&path).unwrap();
        DeviceIdentity::load_or_create(&store, None).unwrap().id
    };
    let store = SqliteStore::open(&path).unwrap();
    let reloaded = DeviceIdentity::load_or_create(&store, None).unwrap();

    assert_eq!(reloaded.id, id);
}

#[test]
fn blank_stored_device_id_is_an_error() {
    let store = MemoryStore::new();
    store.set(keys::DEVICE_ID, "  ").unwrap();
    assert!(DeviceIdentity::load_or_create(&store, None).is_err());
}

#[test]
fn default_device_name_is_not_empty() {
    assert!(!default_device_name().is_empty());
}

#[test]
fn device_query_params() {
    let device = DeviceIdentity::new("dev-9".parse().unwrap(), "Phone");
    assert_eq!(device.query_params(), vec![("id", "dev-9"), ("name", "Phone")]);
}
