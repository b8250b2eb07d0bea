//! Tests for the vector stores.

use super::*;
use serde_json::json;
use tempfile::TempDir;

fn record(id: &str, seed: f32) -> VectorRecord {
    VectorRecord::new(id, vec![seed, seed + 1.0, seed + 2.0])
}

#[test]
fn test_validate_embedding() {
    assert!(validate_embedding(&[1.0, 2.0], 2).is_ok());
    assert_eq!(validate_embedding(&[], 2).unwrap_err().code(), "AGENTDB-003");
    assert_eq!(
        validate_embedding(&[1.0], 2).unwrap_err().code(),
        "AGENTDB-002"
    );
    assert_eq!(
        validate_embedding(&[1.0, f32::NAN], 2).unwrap_err().code(),
        "AGENTDB-003"
    );
    assert_eq!(
        validate_embedding(&[f32::INFINITY, 0.0], 2)
            .unwrap_err()
            .code(),
        "AGENTDB-003"
    );
}

#[test]
fn test_memory_store_rejects_zero_dimension() {
    assert!(MemoryVectorStore::new(0).is_err());
}

#[test]
fn test_memory_store_crud() {
    let mut store = MemoryVectorStore::new(3).expect("store");

    store.insert(record("a", 0.0)).expect("insert");
    store
        .insert(record("b", 1.0).with_metadata(json!({"tag": "x"})))
        .expect("insert");

    assert_eq!(store.count(), 2);
    assert_eq!(store.get("b").expect("b").metadata, json!({"tag": "x"}));
    assert!(store.delete("a").expect("delete"));
    assert!(!store.delete("a").expect("delete again"));
    assert_eq!(store.count(), 1);
    assert!(store.get("a").is_none());
}

#[test]
fn test_memory_store_dimension_mismatch() {
    let mut store = MemoryVectorStore::new(3).expect("store");

    let err = store
        .insert(VectorRecord::new("short", vec![1.0]))
        .unwrap_err();

    assert!(matches!(
        err,
        crate::Error::DimensionMismatch {
            expected: 3,
            actual: 1
        }
    ));
    assert_eq!(store.count(), 0);
}

#[test]
fn test_memory_store_list_all_keeps_order_on_replace() {
    let mut store = MemoryVectorStore::new(3).expect("store");
    store.insert(record("first", 0.0)).expect("insert");
    store.insert(record("second", 1.0)).expect("insert");

    store.insert(record("first", 9.0)).expect("replace");

    let all = store.list_all().expect("list");
    let ids: Vec<&str> = all.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
    assert_eq!(all[0].1, vec![9.0, 10.0, 11.0]);
}

#[test]
fn test_memory_store_scan_and_clear() {
    let mut store = MemoryVectorStore::new(3).expect("store");
    for i in 0..5 {
        store.insert(record(&format!("v{i}"), i as f32)).expect("insert");
    }

    let mut seen = 0;
    store.scan(&mut |_| seen += 1);
    assert_eq!(seen, 5);

    store.clear().expect("clear");
    assert!(store.is_empty());
}

#[test]
fn test_log_store_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");

    {
        let mut store = LogVectorStore::open(dir.path(), 3, false).expect("open");
        store.insert(record("a", 0.0)).expect("insert");
        store
            .insert(record("b", 1.0).with_metadata(json!({"n": 1})))
            .expect("insert");
        store.insert(record("c", 2.0)).expect("insert");
        store.delete("a").expect("delete");
    }

    let store = LogVectorStore::open(dir.path(), 3, false).expect("reopen");
    assert_eq!(store.count(), 2);
    assert!(store.get("a").is_none());
    let b = store.get("b").expect("b");
    assert_eq!(b.embedding, vec![1.0, 2.0, 3.0]);
    assert_eq!(b.metadata, json!({"n": 1}));
}

#[test]
fn test_log_store_rejects_other_dimension() {
    let dir = TempDir::new().expect("temp dir");
    {
        let _store = LogVectorStore::open(dir.path(), 3, false).expect("open");
    }

    let err = LogVectorStore::open(dir.path(), 4, false).unwrap_err();

    assert_eq!(err.code(), "AGENTDB-001");
}

#[test]
fn test_log_store_stored_dimension() {
    let dir = TempDir::new().expect("temp dir");
    assert_eq!(LogVectorStore::stored_dimension(dir.path()).expect("stored dimension"), None);

    drop(LogVectorStore::open(dir.path(), 5, false).expect("open"));

    assert_eq!(
        LogVectorStore::stored_dimension(dir.path()).expect("stored dimension"),
        Some(5)
    );
}

#[test]
fn test_log_store_clear_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    {
        let mut store = LogVectorStore::open(dir.path(), 3, true).expect("open");
        store.insert(record("a", 0.0)).expect("insert");
        store.clear().expect("clear");
        store.insert(record("b", 1.0)).expect("insert");
    }

    let store = LogVectorStore::open(dir.path(), 3, false).expect("reopen");

    let all = store.list_all().expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].0, "b");
}

#[test]
fn test_log_store_compact_drops_dead_records() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = LogVectorStore::open(dir.path(), 3, false).expect("open");
    for i in 0..10 {
        store.insert(record(&format!("v{i}"), i as f32)).expect("insert");
    }
    for i in 0..10 {
        store.insert(record(&format!("v{i}"), 100.0)).expect("overwrite");
    }
    store.delete("v0").expect("delete");
    let before = std::fs::metadata(store.path()).expect("meta").len();
    assert_eq!(store.dead_records(), 12);

    store.compact().expect("compact");

    let after = std::fs::metadata(store.path()).expect("meta").len();
    assert!(after < before);
    assert_eq!(store.dead_records(), 0);

    store.insert(record("late", 5.0)).expect("insert after compact");
    drop(store);

    let reopened = LogVectorStore::open(dir.path(), 3, false).expect("reopen");
    assert_eq!(reopened.count(), 10);
    assert_eq!(reopened.get("v5").expect("v5").embedding[0], 100.0);
    assert!(reopened.get("late").is_some());
}

#[test]
fn test_log_store_torn_tail_is_recovered() {
    let dir = TempDir::new().expect("temp dir");
    let path;
    {
        let mut store = LogVectorStore::open(dir.path(), 3, false).expect("open");
        store.insert(record("kept", 0.0)).expect("insert");
        path = store.path().to_path_buf();
    }
    let mut bytes = std::fs::read(&path).expect("read");
    bytes.extend_from_slice(&[9, 0, 0, 0, 1]);
    std::fs::write(&path, &bytes).expect("write");

    let mut store = LogVectorStore::open(dir.path(), 3, false).expect("reopen");
    store.insert(record("next", 1.0)).expect("insert");
    drop(store);

    let store = LogVectorStore::open(dir.path(), 3, false).expect("reopen again");
    assert_eq!(store.count(), 2);
}

#[test]
fn test_log_store_compacts_when_mostly_dead() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = LogVectorStore::open(dir.path(), 3, false)
        .expect("open")
        .with_compaction_min_bytes(1);
    store.insert(record("a", 0.0)).expect("insert");
    store.insert(record("b", 1.0)).expect("insert");
    let live_size = store.log_bytes();

    for _ in 0..20 {
        store.insert(record("a", 0.0)).expect("overwrite");
        assert!(store.dead_records() < 2);
    }

    assert_eq!(store.log_bytes(), live_size);
    assert_eq!(
        std::fs::metadata(store.path()).expect("meta").len(),
        live_size
    );
    drop(store);

    let reopened = LogVectorStore::open(dir.path(), 3, false).expect("reopen");
    assert_eq!(reopened.count(), 2);
    assert_eq!(reopened.dead_records(), 0);
}

#[test]
fn test_log_store_auto_compaction_can_be_disabled() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = LogVectorStore::open(dir.path(), 3, false)
        .expect("open")
        .with_compaction_min_bytes(u64::MAX);
    store.insert(record("a", 0.0)).expect("insert");

    for _ in 0..5 {
        store.insert(record("a", 0.0)).expect("overwrite");
    }

    assert_eq!(store.dead_records(), 5);
}
