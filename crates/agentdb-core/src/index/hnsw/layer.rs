//! Single-layer graph traversal shared by insertion, search and repair.

use super::candidate::Candidate;
use super::graph_store::GraphStore;
use super::node::NodeId;
use crate::distance::DistanceMetric;
use rustc_hash::FxHashSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Beam search restricted to one layer.
///
/// Expands the closest unexplored candidate until it is farther than the
/// worst of the `ef` best results found so far. Neighbors whose node row is
/// missing are skipped. Returns results in ascending distance order.
pub(crate) fn search_layer(
    graph: &dyn GraphStore,
    metric: DistanceMetric,
    query: &[f32],
    entry_points: &[Candidate],
    ef: usize,
    level: usize,
) -> Vec<Candidate> {
    let ef = ef.max(1);
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef + 1);

    for &entry in entry_points {
        if visited.insert(entry.id) {
            frontier.push(Reverse(entry));
            results.push(entry);
            if results.len() > ef {
                results.pop();
            }
        }
    }

    while let Some(Reverse(current)) = frontier.pop() {
        let worst = results.peek().map_or(f32::INFINITY, |c| c.distance);
        if current.distance > worst {
            break;
        }

        for neighbor in graph.neighbors(current.id, level) {
            if !visited.insert(neighbor.id) {
                continue;
            }
            let Some(node) = graph.node(neighbor.id) else {
                continue;
            };

            let distance = metric.distance(query, &node.embedding);
            let worst = results.peek().map_or(f32::INFINITY, |c| c.distance);
            if results.len() < ef || distance < worst {
                let candidate = Candidate::new(neighbor.id, distance);
                frontier.push(Reverse(candidate));
                results.push(candidate);
                if results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    results.into_sorted_vec()
}

/// Greedy descent with beam width 1 from `from_level` down to `to_level`
/// (both inclusive). Returns the closest node found on `to_level`.
pub(crate) fn greedy_descent(
    graph: &dyn GraphStore,
    metric: DistanceMetric,
    query: &[f32],
    entry: Candidate,
    from_level: usize,
    to_level: usize,
) -> Candidate {
    let mut current = entry;
    for level in (to_level..=from_level).rev() {
        if let Some(&closest) = search_layer(graph, metric, query, &[current], 1, level).first() {
            current = closest;
        }
    }
    current
}

/// Closest-M truncation: the `m` nearest candidates, ascending, excluding
/// `exclude`.
pub(crate) fn select_closest(candidates: &[Candidate], m: usize, exclude: NodeId) -> Vec<Candidate> {
    let mut selected: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.id != exclude)
        .copied()
        .collect();
    selected.sort_unstable();
    selected.truncate(m);
    selected
}
