//! Bulk build against a durable graph store.
//!
//! The timing comparison is ignored by default; run it in release mode:
//!
//! ```bash
//! cargo test --release --test bulk_build_tests -- --ignored --nocapture
//! ```

use agentdb_core::{
    FileGraphStore, GraphStore, HnswIndex, HnswParams, MemoryVectorStore, VectorRecord,
    VectorStore,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn vector_store(count: usize, dim: usize, seed: u64) -> MemoryVectorStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = MemoryVectorStore::new(dim).unwrap();
    for i in 0..count {
        let embedding = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        store.insert(VectorRecord::new(format!("vec-{i}"), embedding)).unwrap();
    }
    store
}

fn open_index(dir: &Path, sync_writes: bool) -> HnswIndex<FileGraphStore> {
    let store = FileGraphStore::open(dir, sync_writes).unwrap();
    HnswIndex::with_seed(store, HnswParams::new(16, 32, 100, 50).unwrap(), 11).unwrap()
}

#[test]
fn test_optimized_build_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let source = vector_store(300, 16, 1);

    let built = {
        let mut index = open_index(dir.path(), false);
        index.build_optimized(&source).unwrap();
        index.stats()
    };

    let index = open_index(dir.path(), false);
    assert_eq!(index.stats(), built);
    assert_eq!(index.len(), 300);
    assert!(index.is_ready());
    assert_eq!(index.store().generation(), 1);

    let query = source.get("vec-123").unwrap().embedding;
    assert_eq!(&*index.search(&query, 1)[0].vector_id, "vec-123");
}

#[test]
fn test_naive_and_optimized_builds_persist_same_graph() {
    let naive_dir = TempDir::new().unwrap();
    let optimized_dir = TempDir::new().unwrap();
    let source = vector_store(200, 8, 2);

    open_index(naive_dir.path(), false).build(&source).unwrap();
    open_index(optimized_dir.path(), false)
        .build_optimized(&source)
        .unwrap();

    let naive = open_index(naive_dir.path(), false);
    let optimized = open_index(optimized_dir.path(), false);
    assert_eq!(naive.stats(), optimized.stats());
    assert_eq!(naive.store().node_ids(), optimized.store().node_ids());
    for id in naive.store().node_ids() {
        assert_eq!(naive.store().node(id), optimized.store().node(id));
        let level = naive.store().node(id).unwrap().level;
        for l in 0..=level {
            let mut a: Vec<_> = naive.store().neighbors(id, l).iter().map(|n| n.id).collect();
            let mut b: Vec<_> = optimized.store().neighbors(id, l).iter().map(|n| n.id).collect();
            a.sort();
            b.sort();
            assert_eq!(a, b, "neighbors of {id} differ on level {l}");
        }
    }
}

#[test]
fn test_rebuild_replaces_previous_graph() {
    let dir = TempDir::new().unwrap();
    let mut index = open_index(dir.path(), false);
    index.build_optimized(&vector_store(100, 8, 3)).unwrap();

    index.build_optimized(&vector_store(40, 8, 4)).unwrap();
    drop(index);

    let index = open_index(dir.path(), false);
    assert_eq!(index.len(), 40);
    assert_eq!(index.store().generation(), 2);
}

#[test]
#[ignore = "slow: run with --release"]
fn test_optimized_build_is_faster_than_naive() {
    let source = vector_store(1000, 128, 5);
    let naive_dir = TempDir::new().unwrap();
    let optimized_dir = TempDir::new().unwrap();

    let started = Instant::now();
    open_index(naive_dir.path(), true).build(&source).unwrap();
    let naive = started.elapsed();

    let started = Instant::now();
    open_index(optimized_dir.path(), true)
        .build_optimized(&source)
        .unwrap();
    let optimized = started.elapsed();

    let per_vector = optimized / 1000;
    println!("naive: {naive:?}, optimized: {optimized:?}, per vector: {per_vector:?}");
    assert!(per_vector < Duration::from_millis(50));
    assert!(
        naive.as_secs_f64() >= 2.0 * optimized.as_secs_f64(),
        "expected at least 2x speedup, got naive {naive:?} vs optimized {optimized:?}"
    );
}
