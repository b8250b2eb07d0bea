//! Graph records: nodes, edges and index metadata.
//!
//! Nodes and edges live in owned tables keyed by [`NodeId`]; nothing holds a
//! reference to another record, so deleting a node can never leave a dangling
//! pointer behind, only stale ids that lookups report as missing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identifier of a graph node.
///
/// Derived from the vector id with 64-bit FNV-1a, so the same vector always
/// maps to the same node across rebuilds and processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    const FNV_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

    /// Derives the node id for a vector id.
    #[must_use]
    pub fn from_vector_id(vector_id: &str) -> Self {
        let hash = vector_id.bytes().fold(Self::FNV_OFFSET, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(Self::FNV_PRIME)
        });
        Self(hash)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One indexed vector.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    /// Node id, derived from `vector_id`.
    pub id: NodeId,
    /// Back-reference into the vector store.
    pub vector_id: Arc<str>,
    /// Highest layer this node participates in.
    pub level: usize,
    /// The node's own copy of the embedding.
    pub embedding: Arc<[f32]>,
}

impl NodeRecord {
    /// Creates a node record for `vector_id` at `level`.
    #[must_use]
    pub fn new(vector_id: &str, level: usize, embedding: &[f32]) -> Self {
        Self {
            id: NodeId::from_vector_id(vector_id),
            vector_id: Arc::from(vector_id),
            level,
            embedding: Arc::from(embedding),
        }
    }
}

/// Adjacency entry: the far end of an edge plus its cached distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Target node.
    pub id: NodeId,
    /// Distance between the endpoints when the edge was created.
    pub distance: f32,
}

/// A directed edge row `(from, to, level) -> distance`.
///
/// The index always writes an edge together with its [`mirror`](Self::mirror).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Layer the edge lives on.
    pub level: usize,
    /// Distance between the endpoints.
    pub distance: f32,
}

impl Edge {
    /// Returns the reverse edge with the same level and distance.
    #[must_use]
    pub const fn mirror(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            level: self.level,
            distance: self.distance,
        }
    }
}

/// Index-wide metadata row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMeta {
    /// Node every descent starts from; `None` when the graph is empty.
    pub entry_point: Option<NodeId>,
    /// Highest level any node has reached.
    pub max_level: usize,
    /// Readiness flag checked by `search`.
    pub is_built: bool,
}
