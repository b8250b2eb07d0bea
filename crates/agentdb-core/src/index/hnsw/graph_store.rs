//! Storage seam for the HNSW graph.
//!
//! The index reads and writes its three tables (nodes, edges, metadata) only
//! through [`GraphStore`], so the same insertion and search code runs against
//! the durable store in normal mode and against the in-memory build cache
//! during a bulk build.

use super::memory_store::MemoryGraphStore;
use super::node::{Edge, GraphMeta, Neighbor, NodeId, NodeRecord};
use crate::error::Result;

/// Backend-agnostic graph tables.
///
/// Reads are infallible: implementations keep the working set resident and
/// only writes touch durable media. Writes are applied in call order.
pub trait GraphStore: Send + Sync {
    /// Looks up one node.
    fn node(&self, id: NodeId) -> Option<&NodeRecord>;

    /// Batch lookup; ids without a node are skipped.
    fn nodes(&self, ids: &[NodeId]) -> Vec<NodeRecord> {
        ids.iter().filter_map(|id| self.node(*id)).cloned().collect()
    }

    /// Outgoing edges of `id` at `level`. Empty when there are none.
    fn neighbors(&self, id: NodeId, level: usize) -> &[Neighbor];

    /// Current metadata row.
    fn meta(&self) -> GraphMeta;

    /// Every node id, in ascending order.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Number of node rows.
    fn node_count(&self) -> usize;

    /// Number of directed edge rows.
    fn edge_count(&self) -> usize;

    /// Inserts or replaces a node row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn put_node(&mut self, node: NodeRecord) -> Result<()>;

    /// Removes a node row together with all of its outgoing edges.
    /// Incoming edges are the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn remove_node(&mut self, id: NodeId) -> Result<()>;

    /// Inserts an edge row, or updates its distance if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn put_edge(&mut self, edge: Edge) -> Result<()>;

    /// Removes the edge row `(from, to, level)` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn remove_edge(&mut self, from: NodeId, to: NodeId, level: usize) -> Result<()>;

    /// Overwrites the metadata row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn set_meta(&mut self, meta: GraphMeta) -> Result<()>;

    /// Drops every node, edge and metadata value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn clear(&mut self) -> Result<()>;

    /// Replaces the entire contents with `graph` as one atomic commit.
    ///
    /// Nodes are committed before edges. On error the previous contents are
    /// left exactly as they were.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is changed in that case.
    fn replace_all(&mut self, graph: MemoryGraphStore) -> Result<()>;

    /// Shrinks durable storage to the current contents. A no-op for stores
    /// without a log.
    ///
    /// # Errors
    ///
    /// Returns an error if the compacted form cannot be written.
    fn compact(&mut self) -> Result<()> {
        Ok(())
    }
}
