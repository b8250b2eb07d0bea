//! k-NN search.

use super::HnswIndex;
use crate::index::hnsw::candidate::Candidate;
use crate::index::hnsw::graph_store::GraphStore;
use crate::index::hnsw::layer::{greedy_descent, search_layer};
use crate::index::hnsw::node::NodeId;
use std::sync::Arc;

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Node that matched.
    pub node_id: NodeId,
    /// Vector store id of the match.
    pub vector_id: Arc<str>,
    /// Graph distance to the query (lower is closer).
    pub distance: f32,
    /// The matched embedding.
    pub embedding: Arc<[f32]>,
}

impl<S: GraphStore> HnswIndex<S> {
    /// Returns up to `k` approximate nearest neighbors of `query`, closest
    /// first, using a beam of `max(ef_search, k)` on the base layer.
    ///
    /// An empty or unbuilt index returns no hits, as does a query whose
    /// dimension differs from the indexed vectors.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        self.search_with_ef(query, k, self.params.ef_search)
    }

    /// Like [`search`](Self::search) with an explicit base-layer beam width.
    #[must_use]
    pub fn search_with_ef(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<SearchHit> {
        if k == 0 {
            return Vec::new();
        }
        let graph = self.graph();
        let meta = graph.meta();
        if !meta.is_built {
            return Vec::new();
        }
        let Some(entry_id) = meta.entry_point else {
            return Vec::new();
        };
        let Some(entry_node) = graph.node(entry_id) else {
            tracing::warn!(entry = %entry_id, "Entry point has no node; search skipped");
            return Vec::new();
        };
        if entry_node.embedding.len() != query.len() {
            tracing::warn!(
                expected = entry_node.embedding.len(),
                actual = query.len(),
                "Query dimension mismatch; search skipped"
            );
            return Vec::new();
        }

        let metric = self.params.metric;
        let mut entry = Candidate::new(entry_id, metric.distance(query, &entry_node.embedding));
        if meta.max_level > 0 {
            entry = greedy_descent(graph, metric, query, entry, meta.max_level, 1);
        }

        let ef = ef_search.max(k);
        search_layer(graph, metric, query, &[entry], ef, 0)
            .into_iter()
            .take(k)
            .filter_map(|c| {
                graph.node(c.id).map(|node| SearchHit {
                    node_id: c.id,
                    vector_id: Arc::clone(&node.vector_id),
                    distance: c.distance,
                    embedding: Arc::clone(&node.embedding),
                })
            })
            .collect()
    }
}
