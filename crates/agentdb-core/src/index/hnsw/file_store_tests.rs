//! Tests for `file_store` module - snapshot + WAL persistence.

use super::file_store::{FileGraphStore, SNAPSHOT_MAGIC};
use super::graph_store::GraphStore;
use super::memory_store::MemoryGraphStore;
use super::node::{Edge, GraphMeta, NodeRecord};
use std::path::Path;
use tempfile::TempDir;

fn sample_graph() -> (MemoryGraphStore, NodeRecord, NodeRecord) {
    let mut graph = MemoryGraphStore::new();
    let a = NodeRecord::new("a", 1, &[0.0, 1.0]);
    let b = NodeRecord::new("b", 0, &[1.0, 0.0]);
    graph.put_node(a.clone()).unwrap();
    graph.put_node(b.clone()).unwrap();
    let e = Edge {
        from: a.id,
        to: b.id,
        level: 0,
        distance: 1.5,
    };
    graph.put_edge(e).unwrap();
    graph.put_edge(e.mirror()).unwrap();
    graph
        .set_meta(GraphMeta {
            entry_point: Some(a.id),
            max_level: 1,
            is_built: true,
        })
        .unwrap();
    (graph, a, b)
}

fn wal_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.ends_with(".wal"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_open_empty_directory() {
    let dir = TempDir::new().unwrap();

    let store = FileGraphStore::open(dir.path(), false).unwrap();

    assert_eq!(store.generation(), 0);
    assert_eq!(store.node_count(), 0);
    assert_eq!(store.meta(), GraphMeta::default());
    assert_eq!(store.wal_bytes(), 0);
}

#[test]
fn test_row_writes_replay_from_wal() {
    let dir = TempDir::new().unwrap();
    let (_, a, b) = sample_graph();

    {
        let mut store = FileGraphStore::open(dir.path(), true).unwrap();
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        store
            .put_edge(Edge {
                from: a.id,
                to: b.id,
                level: 0,
                distance: 2.0,
            })
            .unwrap();
        store.remove_node(b.id).unwrap();
        store
            .set_meta(GraphMeta {
                entry_point: Some(a.id),
                max_level: 1,
                is_built: true,
            })
            .unwrap();
    }

    let store = FileGraphStore::open(dir.path(), false).unwrap();
    assert_eq!(store.node_count(), 1);
    assert_eq!(store.edge_count(), 1);
    assert_eq!(store.node(a.id).unwrap(), &a);
    assert_eq!(store.meta().entry_point, Some(a.id));
}

#[test]
fn test_replace_all_bumps_generation_and_drops_old_wal() {
    let dir = TempDir::new().unwrap();
    let (graph, a, _) = sample_graph();
    let mut store = FileGraphStore::open(dir.path(), false).unwrap();
    store.put_node(NodeRecord::new("stale", 0, &[5.0, 5.0])).unwrap();

    store.replace_all(graph).unwrap();

    assert_eq!(store.generation(), 1);
    assert_eq!(store.node_count(), 2);
    assert_eq!(wal_files(dir.path()), vec!["graph-0000000000000001.wal"]);

    drop(store);
    let reopened = FileGraphStore::open(dir.path(), false).unwrap();
    assert_eq!(reopened.generation(), 1);
    assert_eq!(reopened.node_count(), 2);
    assert_eq!(reopened.edge_count(), 2);
    assert_eq!(reopened.meta().entry_point, Some(a.id));
}

#[test]
fn test_writes_after_commit_land_in_new_wal() {
    let dir = TempDir::new().unwrap();
    let (graph, a, b) = sample_graph();
    {
        let mut store = FileGraphStore::open(dir.path(), false).unwrap();
        store.replace_all(graph).unwrap();
        store.remove_edge(a.id, b.id, 0).unwrap();
    }

    let store = FileGraphStore::open(dir.path(), false).unwrap();

    assert_eq!(store.edge_count(), 1);
    assert!(store.neighbors(a.id, 0).is_empty());
    assert_eq!(store.neighbors(b.id, 0)[0].id, a.id);
}

#[test]
fn test_wal_of_other_generation_is_ignored() {
    let dir = TempDir::new().unwrap();
    let (graph, _, _) = sample_graph();
    {
        let mut store = FileGraphStore::open(dir.path(), false).unwrap();
        store.replace_all(graph).unwrap();
    }
    // Leftover from an interrupted commit of generation 2
    std::fs::write(dir.path().join("graph-0000000000000002.wal"), b"junk").unwrap();

    let store = FileGraphStore::open(dir.path(), false).unwrap();

    assert_eq!(store.node_count(), 2);
    assert_eq!(wal_files(dir.path()), vec!["graph-0000000000000001.wal"]);
}

#[test]
fn test_torn_wal_tail_is_truncated() {
    let dir = TempDir::new().unwrap();
    let (_, a, _) = sample_graph();
    {
        let mut store = FileGraphStore::open(dir.path(), false).unwrap();
        store.put_node(a.clone()).unwrap();
    }
    let wal = dir.path().join("graph-0000000000000000.wal");
    let intact_len = std::fs::metadata(&wal).unwrap().len();
    let mut bytes = std::fs::read(&wal).unwrap();
    bytes.extend_from_slice(&[200, 0, 0, 0, 7, 7]);
    std::fs::write(&wal, &bytes).unwrap();

    let store = FileGraphStore::open(dir.path(), false).unwrap();

    assert_eq!(store.node_count(), 1);
    assert_eq!(std::fs::metadata(&wal).unwrap().len(), intact_len);
}

#[test]
fn test_corrupted_snapshot_is_reported() {
    let dir = TempDir::new().unwrap();
    let (graph, _, _) = sample_graph();
    {
        let mut store = FileGraphStore::open(dir.path(), false).unwrap();
        store.replace_all(graph).unwrap();
    }
    let path = dir.path().join("graph.snapshot");
    let mut bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], SNAPSHOT_MAGIC);
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let err = FileGraphStore::open(dir.path(), false).unwrap_err();

    assert_eq!(err.code(), "AGENTDB-007");
    assert!(!err.is_recoverable());
}

#[test]
fn test_bad_magic_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("graph.snapshot"), b"NOPE\x01\0\0\0\0\0\0\0\0\0\0\0\0").unwrap();

    let err = FileGraphStore::open(dir.path(), false).unwrap_err();

    assert_eq!(err.code(), "AGENTDB-007");
}

#[test]
fn test_stale_temp_snapshot_is_removed() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join("graph.snapshot.tmp");
    std::fs::write(&temp, b"half written").unwrap();

    let store = FileGraphStore::open(dir.path(), false).unwrap();

    assert!(!temp.exists());
    assert_eq!(store.node_count(), 0);
}

#[test]
fn test_checkpoint_folds_wal() {
    let dir = TempDir::new().unwrap();
    let (_, a, b) = sample_graph();
    {
        let mut store = FileGraphStore::open(dir.path(), false).unwrap();
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();

        store.checkpoint().unwrap();

        assert_eq!(store.generation(), 1);
        let wal = dir.path().join("graph-0000000000000001.wal");
        assert_eq!(std::fs::metadata(wal).unwrap().len(), 0);
    }

    let store = FileGraphStore::open(dir.path(), false).unwrap();
    assert_eq!(store.node_count(), 2);
}

#[test]
fn test_clear_is_logged() {
    let dir = TempDir::new().unwrap();
    let (graph, _, _) = sample_graph();
    {
        let mut store = FileGraphStore::open(dir.path(), false).unwrap();
        store.replace_all(graph).unwrap();
        store.clear().unwrap();
    }

    let store = FileGraphStore::open(dir.path(), false).unwrap();

    assert_eq!(store.node_count(), 0);
    assert_eq!(store.edge_count(), 0);
    assert_eq!(store.meta(), GraphMeta::default());
}

#[test]
fn test_wal_is_folded_past_threshold() {
    let dir = TempDir::new().unwrap();
    let (graph, a, b) = sample_graph();
    let mut store = FileGraphStore::open(dir.path(), false)
        .unwrap()
        .with_compaction_min_bytes(256);
    store.replace_all(graph.clone()).unwrap();
    let start = store.generation();

    for i in 0..200 {
        let edge = Edge {
            from: b.id,
            to: a.id,
            level: 0,
            distance: i as f32,
        };
        store.put_edge(edge).unwrap();
        store.remove_edge(b.id, a.id, 0).unwrap();
        assert!(store.wal_bytes() < 1024);
    }
    store
        .put_edge(Edge {
            from: b.id,
            to: a.id,
            level: 0,
            distance: 1.5,
        })
        .unwrap();

    assert!(store.generation() > start + 1);
    let wals = wal_files(dir.path());
    assert_eq!(wals.len(), 1);
    let wal_len = std::fs::metadata(dir.path().join(&wals[0])).unwrap().len();
    assert_eq!(wal_len, store.wal_bytes());
    drop(store);

    let reopened = FileGraphStore::open(dir.path(), false).unwrap();
    assert_eq!(reopened.node_count(), graph.node_count());
    assert_eq!(reopened.edge_count(), graph.edge_count());
    assert_eq!(reopened.meta(), graph.meta());
    assert_eq!(reopened.neighbors(b.id, 0), graph.neighbors(b.id, 0));
}

#[test]
fn test_compact_folds_wal_through_trait() {
    let dir = TempDir::new().unwrap();
    let (_, a, _) = sample_graph();
    let mut store = FileGraphStore::open(dir.path(), false).unwrap();
    store.put_node(a.clone()).unwrap();
    assert!(store.wal_bytes() > 0);

    GraphStore::compact(&mut store).unwrap();

    assert_eq!(store.generation(), 1);
    assert_eq!(store.wal_bytes(), 0);
    assert_eq!(store.node(a.id), Some(&a));
}
