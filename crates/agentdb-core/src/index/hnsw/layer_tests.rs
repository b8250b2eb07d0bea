//! Tests for `layer` module - single-layer traversal.

use super::candidate::Candidate;
use super::graph_store::GraphStore;
use super::layer::{greedy_descent, search_layer, select_closest};
use super::memory_store::MemoryGraphStore;
use super::node::{Edge, NodeId, NodeRecord};
use crate::distance::DistanceMetric;

/// Points 0..n on a line, linked as a chain at level 0.
#[allow(clippy::cast_precision_loss)]
fn chain(n: usize) -> (MemoryGraphStore, Vec<NodeId>) {
    let mut store = MemoryGraphStore::new();
    let mut ids = Vec::new();
    for i in 0..n {
        let node = NodeRecord::new(&format!("p{i}"), 0, &[i as f32]);
        ids.push(node.id);
        store.put_node(node).unwrap();
    }
    for pair in ids.windows(2) {
        let e = Edge {
            from: pair[0],
            to: pair[1],
            level: 0,
            distance: 1.0,
        };
        store.put_edge(e).unwrap();
        store.put_edge(e.mirror()).unwrap();
    }
    (store, ids)
}

#[test]
fn test_greedy_walk_follows_chain() {
    let (store, ids) = chain(10);
    let entry = Candidate::new(ids[0], 7.2);

    let found = search_layer(&store, DistanceMetric::Euclidean, &[7.2], &[entry], 1, 0);

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ids[7]);
}

#[test]
fn test_results_sorted_and_bounded_by_ef() {
    let (store, ids) = chain(20);
    let entry = Candidate::new(ids[0], 10.0);

    let found = search_layer(&store, DistanceMetric::Euclidean, &[10.0], &[entry], 5, 0);

    assert_eq!(found.len(), 5);
    assert_eq!(found[0].id, ids[10]);
    assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_missing_nodes_are_skipped() {
    let (mut store, ids) = chain(5);
    store.remove_node(ids[2]).unwrap();
    let entry = Candidate::new(ids[0], 4.0);

    let found = search_layer(&store, DistanceMetric::Euclidean, &[4.0], &[entry], 10, 0);

    // The chain is cut at 2, so only 0 and 1 are reachable
    let found_ids: Vec<NodeId> = found.iter().map(|c| c.id).collect();
    assert_eq!(found_ids, vec![ids[1], ids[0]]);
}

#[test]
fn test_greedy_descent_without_upper_links_keeps_entry() {
    let (store, ids) = chain(3);
    let entry = Candidate::new(ids[0], 2.0);

    let result = greedy_descent(&store, DistanceMetric::Euclidean, &[2.0], entry, 3, 1);

    assert_eq!(result.id, ids[0]);
}

#[test]
fn test_select_closest_truncates_and_excludes() {
    let candidates = vec![
        Candidate::new(NodeId(3), 0.3),
        Candidate::new(NodeId(1), 0.1),
        Candidate::new(NodeId(9), 0.0),
        Candidate::new(NodeId(2), 0.2),
    ];

    let selected = select_closest(&candidates, 2, NodeId(9));

    let ids: Vec<NodeId> = selected.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![NodeId(1), NodeId(2)]);
}

#[test]
fn test_candidate_ordering_breaks_ties_by_id() {
    let mut items = vec![
        Candidate::new(NodeId(5), 1.0),
        Candidate::new(NodeId(2), 1.0),
        Candidate::new(NodeId(7), 0.5),
    ];

    items.sort();

    let ids: Vec<u64> = items.iter().map(|c| c.id.0).collect();
    assert_eq!(ids, vec![7, 2, 5]);
}
