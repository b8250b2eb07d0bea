//! Insertion and neighbor pruning.

use super::HnswIndex;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::hnsw::candidate::Candidate;
use crate::index::hnsw::graph_store::GraphStore;
use crate::index::hnsw::layer::{greedy_descent, search_layer, select_closest};
use crate::index::hnsw::node::{Edge, GraphMeta, NodeId, NodeRecord};
use crate::index::hnsw::params::MAX_LEVEL;
use rand::Rng;
use rustc_hash::FxHashSet;
use std::sync::Arc;

impl<S: GraphStore> HnswIndex<S> {
    /// Inserts one vector and returns its node id.
    ///
    /// Re-inserting an existing `vector_id` replaces its node. A successful
    /// insert leaves the index ready for search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVector`] for an empty embedding,
    /// [`Error::DimensionMismatch`] if it differs from the indexed
    /// dimension, [`Error::Index`] if another vector already owns the same
    /// node id, or the store's error if a write fails.
    pub fn insert(&mut self, vector_id: &str, embedding: &[f32]) -> Result<NodeId> {
        if embedding.is_empty() {
            return Err(Error::InvalidVector("embedding is empty".to_string()));
        }
        // Validate before a re-insert drops the old node.
        let graph = self.graph();
        if let Some(entry) = graph.meta().entry_point.and_then(|e| graph.node(e)) {
            if entry.embedding.len() != embedding.len() {
                return Err(Error::DimensionMismatch {
                    expected: entry.embedding.len(),
                    actual: embedding.len(),
                });
            }
        }

        let id = NodeId::from_vector_id(vector_id);
        self.evict(id, vector_id)?;
        let level = self.random_level();
        self.insert_node(NodeRecord::new(vector_id, level, embedding))?;
        Ok(id)
    }

    /// Removes the node currently stored under `id` so `vector_id` can take
    /// its place.
    ///
    /// Fails with [`Error::Index`] if that node belongs to a different vector
    /// whose id hashes to the same [`NodeId`].
    pub(crate) fn evict(&mut self, id: NodeId, vector_id: &str) -> Result<()> {
        let Some(existing) = self.graph().node(id) else {
            return Ok(());
        };
        if &*existing.vector_id != vector_id {
            return Err(Error::Index(format!(
                "node id {id} of '{vector_id}' collides with '{}'",
                existing.vector_id
            )));
        }
        self.remove_node(id)
    }

    /// Draws a level from the geometric distribution with success
    /// probability `1 / ln(M)`, capped at [`MAX_LEVEL`].
    pub(crate) fn random_level(&mut self) -> usize {
        let p = self.params.level_probability();
        let mut level = 0;
        while level < MAX_LEVEL && self.rng.gen::<f64>() < p {
            level += 1;
        }
        level
    }

    /// Links an already-leveled node into the active graph.
    pub(crate) fn insert_node(&mut self, node: NodeRecord) -> Result<()> {
        if node.embedding.is_empty() {
            return Err(Error::InvalidVector("embedding is empty".to_string()));
        }

        let params = self.params;
        let metric = params.metric;
        let graph = self.graph_mut();
        let mut meta = graph.meta();
        let id = node.id;
        let level = node.level;
        let query = Arc::clone(&node.embedding);

        let entry = match meta.entry_point {
            Some(entry_id) => {
                let entry_node = graph.node(entry_id).ok_or_else(|| {
                    Error::IndexCorrupted(format!("entry point {entry_id} has no node"))
                })?;
                if entry_node.embedding.len() != query.len() {
                    return Err(Error::DimensionMismatch {
                        expected: entry_node.embedding.len(),
                        actual: query.len(),
                    });
                }
                Some(Candidate::new(
                    entry_id,
                    metric.distance(&query, &entry_node.embedding),
                ))
            }
            None => None,
        };

        graph.put_node(node)?;

        let Some(mut entry) = entry else {
            graph.set_meta(GraphMeta {
                entry_point: Some(id),
                max_level: level,
                is_built: true,
            })?;
            return Ok(());
        };

        if meta.max_level > level {
            entry = greedy_descent(&*graph, metric, &query, entry, meta.max_level, level + 1);
        }

        let mut entry_points = vec![entry];
        for layer in (0..=level.min(meta.max_level)).rev() {
            let candidates = search_layer(
                &*graph,
                metric,
                &query,
                &entry_points,
                params.ef_construction,
                layer,
            );
            let cap = params.max_degree(layer);
            let selected = select_closest(&candidates, cap, id);

            for c in &selected {
                connect(graph, id, c.id, layer, c.distance)?;
            }
            for c in &selected {
                prune(graph, metric, c.id, layer, cap)?;
            }

            entry_points = candidates;
        }

        meta.is_built = true;
        if level > meta.max_level {
            meta.entry_point = Some(id);
            meta.max_level = level;
        }
        graph.set_meta(meta)
    }
}

/// Writes the edge `a -> b` and its mirror.
pub(super) fn connect(
    graph: &mut dyn GraphStore,
    a: NodeId,
    b: NodeId,
    level: usize,
    distance: f32,
) -> Result<()> {
    let edge = Edge {
        from: a,
        to: b,
        level,
        distance,
    };
    graph.put_edge(edge)?;
    graph.put_edge(edge.mirror())
}

/// Shrinks the neighborhood of `id` at `level` back to `cap`.
///
/// The current neighbors are fetched in one batch, re-scored against `id`,
/// and all but the closest `cap` are unlinked in both directions.
fn prune(
    graph: &mut dyn GraphStore,
    metric: DistanceMetric,
    id: NodeId,
    level: usize,
    cap: usize,
) -> Result<()> {
    let current: Vec<NodeId> = graph.neighbors(id, level).iter().map(|n| n.id).collect();
    if current.len() <= cap {
        return Ok(());
    }
    let Some(owner) = graph.node(id).map(|n| Arc::clone(&n.embedding)) else {
        return Ok(());
    };

    let mut scored: Vec<Candidate> = graph
        .nodes(&current)
        .iter()
        .map(|n| Candidate::new(n.id, metric.distance(&owner, &n.embedding)))
        .collect();
    scored.sort_unstable();
    let keep: FxHashSet<NodeId> = scored.iter().take(cap).map(|c| c.id).collect();

    for other in current {
        if !keep.contains(&other) {
            graph.remove_edge(id, other, level)?;
            graph.remove_edge(other, id, level)?;
        }
    }
    Ok(())
}
