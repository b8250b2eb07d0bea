//! Deletion and local repair.

use super::insert::connect;
use super::HnswIndex;
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::hnsw::candidate::Candidate;
use crate::index::hnsw::graph_store::GraphStore;
use crate::index::hnsw::node::{GraphMeta, NodeId};

impl<S: GraphStore> HnswIndex<S> {
    /// Removes the node of `vector_id` and every edge touching it.
    ///
    /// Returns false, changing nothing, if the id is not indexed. Former
    /// neighbors left with spare capacity are re-linked among themselves; if
    /// the entry point was removed the remaining node with the highest level
    /// takes over, and removing the last node resets the index to empty.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a write fails.
    pub fn delete(&mut self, vector_id: &str) -> Result<bool> {
        let id = NodeId::from_vector_id(vector_id);
        let indexed = self
            .graph()
            .node(id)
            .is_some_and(|node| &*node.vector_id == vector_id);
        if !indexed {
            return Ok(false);
        }
        self.remove_node(id)?;
        Ok(true)
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let params = self.params;
        let graph = self.graph_mut();
        let Some(level) = graph.node(id).map(|n| n.level) else {
            return Ok(());
        };

        let mut former: Vec<Vec<NodeId>> = Vec::with_capacity(level + 1);
        for layer in 0..=level {
            let neighbors: Vec<NodeId> = graph.neighbors(id, layer).iter().map(|n| n.id).collect();
            for &other in &neighbors {
                graph.remove_edge(other, id, layer)?;
            }
            former.push(neighbors);
        }
        graph.remove_node(id)?;

        for (layer, neighbors) in former.iter().enumerate() {
            repair_layer(graph, params.metric, neighbors, layer, params.max_degree(layer))?;
        }

        if graph.node_count() == 0 {
            return graph.set_meta(GraphMeta::default());
        }

        let mut meta = graph.meta();
        if meta.entry_point == Some(id) {
            let mut best: Option<(NodeId, usize)> = None;
            for candidate in graph.node_ids() {
                if let Some(node) = graph.node(candidate) {
                    if best.is_none_or(|(_, lvl)| node.level > lvl) {
                        best = Some((candidate, node.level));
                    }
                }
            }
            meta.entry_point = best.map(|(candidate, _)| candidate);
            meta.max_level = best.map_or(0, |(_, lvl)| lvl);
            tracing::debug!(
                deleted = %id,
                entry_point = ?meta.entry_point,
                max_level = meta.max_level,
                "Reassigned entry point"
            );
        }
        graph.set_meta(meta)
    }
}

/// Re-links the former neighbors of a deleted node at `level`.
///
/// Each former neighbor below `cap` is connected to the closest other former
/// neighbors that are also below `cap` and not yet linked to it.
fn repair_layer(
    graph: &mut dyn GraphStore,
    metric: DistanceMetric,
    former: &[NodeId],
    level: usize,
    cap: usize,
) -> Result<()> {
    if former.len() < 2 {
        return Ok(());
    }
    let records = graph.nodes(former);

    for a in &records {
        if graph.neighbors(a.id, level).len() >= cap {
            continue;
        }

        let mut options: Vec<Candidate> = records
            .iter()
            .filter(|b| b.id != a.id)
            .map(|b| Candidate::new(b.id, metric.distance(&a.embedding, &b.embedding)))
            .collect();
        options.sort_unstable();

        for option in options {
            let linked = graph.neighbors(a.id, level);
            if linked.len() >= cap {
                break;
            }
            if linked.iter().any(|n| n.id == option.id)
                || graph.neighbors(option.id, level).len() >= cap
            {
                continue;
            }
            connect(graph, a.id, option.id, level, option.distance)?;
        }
    }
    Ok(())
}
