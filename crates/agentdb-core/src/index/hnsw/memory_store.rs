//! In-process graph tables.
//!
//! Serves two roles: the durable store for purely in-memory indexes, and the
//! build cache every bulk build writes into before its single flush.

use super::graph_store::GraphStore;
use super::node::{Edge, GraphMeta, Neighbor, NodeId, NodeRecord};
use crate::error::Result;
use rustc_hash::FxHashMap;

/// Graph tables held in hash maps.
///
/// Adjacency is stored per node as one neighbor list per level, so reading a
/// node's neighborhood at a level is a single lookup.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraphStore {
    nodes: FxHashMap<NodeId, NodeRecord>,
    adjacency: FxHashMap<NodeId, Vec<Vec<Neighbor>>>,
    meta: GraphMeta,
    edge_count: usize,
}

impl MemoryGraphStore {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates empty tables sized for `nodes` nodes.
    #[must_use]
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            adjacency: FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            ..Self::default()
        }
    }

    /// Iterates over node rows in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Iterates over every directed edge row.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().flat_map(|(&from, levels)| {
            levels.iter().enumerate().flat_map(move |(level, list)| {
                list.iter().map(move |n| Edge {
                    from,
                    to: n.id,
                    level,
                    distance: n.distance,
                })
            })
        })
    }

    /// Returns true if there are no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl GraphStore for MemoryGraphStore {
    fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    fn neighbors(&self, id: NodeId, level: usize) -> &[Neighbor] {
        self.adjacency
            .get(&id)
            .and_then(|levels| levels.get(level))
            .map_or(&[], Vec::as_slice)
    }

    fn meta(&self) -> GraphMeta {
        self.meta
    }

    fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn put_node(&mut self, node: NodeRecord) -> Result<()> {
        self.nodes.insert(node.id, node);
        Ok(())
    }

    fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.nodes.remove(&id);
        if let Some(levels) = self.adjacency.remove(&id) {
            self.edge_count -= levels.iter().map(Vec::len).sum::<usize>();
        }
        Ok(())
    }

    fn put_edge(&mut self, edge: Edge) -> Result<()> {
        let levels = self.adjacency.entry(edge.from).or_default();
        if levels.len() <= edge.level {
            levels.resize_with(edge.level + 1, Vec::new);
        }
        let list = &mut levels[edge.level];

        if let Some(existing) = list.iter_mut().find(|n| n.id == edge.to) {
            existing.distance = edge.distance;
        } else {
            list.push(Neighbor {
                id: edge.to,
                distance: edge.distance,
            });
            self.edge_count += 1;
        }
        Ok(())
    }

    fn remove_edge(&mut self, from: NodeId, to: NodeId, level: usize) -> Result<()> {
        if let Some(list) = self
            .adjacency
            .get_mut(&from)
            .and_then(|levels| levels.get_mut(level))
        {
            let before = list.len();
            list.retain(|n| n.id != to);
            self.edge_count -= before - list.len();
        }
        Ok(())
    }

    fn set_meta(&mut self, meta: GraphMeta) -> Result<()> {
        self.meta = meta;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self = Self::default();
        Ok(())
    }

    fn replace_all(&mut self, graph: MemoryGraphStore) -> Result<()> {
        *self = graph;
        Ok(())
    }
}
