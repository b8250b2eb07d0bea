//! HNSW (Hierarchical Navigable Small World) index over a [`GraphStore`].
//!
//! # Modes
//!
//! The index is normally backed by its store: every insert, delete and prune
//! writes rows straight through. [`HnswIndex::build_optimized`] switches to
//! build mode, where the same algorithms run against an in-memory
//! [`MemoryGraphStore`] that is committed to the store in one
//! [`GraphStore::replace_all`] at the end.
//!
//! ```text
//! GraphState::Ready            reads/writes -> store
//! GraphState::Building(cache)  reads/writes -> cache -> store.replace_all(cache)
//! ```
//!
//! # Recommended Parameters by Vector Dimension
//!
//! | Dimension   | M     | ef_construction | ef_search |
//! |-------------|-------|-----------------|-----------|
//! | d <= 64     | 12-16 | 100-200         | 50-128    |
//! | 64 < d      | 16-32 | 200-400         | 200-400   |
//!
//! The default `ef_search` of 50 favors latency. On 10,000 unit vectors of
//! dimension 128 (default `M`/`M0`/`ef_construction`) recall@10 is about
//! 0.65 at `ef_search = 50`, 0.95 at 200 and close to 1.0 at 800; use
//! [`HnswIndex::search_with_ef`] or raise [`HnswParams::ef_search`] when
//! recall matters more than latency.

mod build;
mod constructors;
mod delete;
mod insert;
mod search;

pub use search::SearchHit;

use super::graph_store::GraphStore;
use super::memory_store::MemoryGraphStore;
use super::params::HnswParams;
use crate::error::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Where graph reads and writes are currently routed.
pub(crate) enum GraphState {
    /// Normal mode: the durable store is the source of truth.
    Ready,
    /// Bulk build in progress: the cache is the sole source of truth.
    Building(MemoryGraphStore),
}

/// HNSW index for approximate nearest neighbor search.
///
/// Mutations take `&mut self`; [`search`](Self::search) takes `&self` and can
/// run concurrently once the index is shared behind a lock.
///
/// # Example
///
/// ```rust
/// use agentdb_core::index::hnsw::{HnswIndex, HnswParams, MemoryGraphStore};
///
/// let mut index = HnswIndex::with_seed(MemoryGraphStore::new(), HnswParams::default(), 7)?;
/// index.insert("a", &[0.0, 0.0])?;
/// index.insert("b", &[1.0, 1.0])?;
///
/// let hits = index.search(&[0.9, 0.9], 1);
/// assert_eq!(&*hits[0].vector_id, "b");
/// # Ok::<(), agentdb_core::Error>(())
/// ```
pub struct HnswIndex<S: GraphStore = MemoryGraphStore> {
    pub(crate) params: HnswParams,
    pub(crate) store: S,
    pub(crate) state: GraphState,
    pub(crate) rng: Box<dyn RngCore + Send + Sync>,
    /// Re-applied at the start of every build so rebuilds are reproducible.
    pub(crate) seed: Option<u64>,
}

/// Point-in-time index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of directed edge rows (each link counts twice).
    pub edge_count: usize,
    /// Highest level reached by any node.
    pub max_level: usize,
    /// `edge_count / node_count`, or 0 for an empty graph.
    pub avg_degree: f64,
    /// Readiness flag.
    pub is_built: bool,
}

impl<S: GraphStore> HnswIndex<S> {
    /// Graph currently serving reads.
    pub(crate) fn graph(&self) -> &dyn GraphStore {
        match &self.state {
            GraphState::Ready => &self.store,
            GraphState::Building(cache) => cache,
        }
    }

    /// Graph currently receiving writes.
    pub(crate) fn graph_mut(&mut self) -> &mut dyn GraphStore {
        match &mut self.state {
            GraphState::Ready => &mut self.store,
            GraphState::Building(cache) => cache,
        }
    }

    /// Index parameters.
    #[must_use]
    pub const fn params(&self) -> &HnswParams {
        &self.params
    }

    /// The durable store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph().node_count()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `vector_id` has a node.
    #[must_use]
    pub fn contains(&self, vector_id: &str) -> bool {
        self.graph()
            .node(super::node::NodeId::from_vector_id(vector_id))
            .is_some_and(|node| &*node.vector_id == vector_id)
    }

    /// Compacts the durable store (see [`GraphStore::compact`]).
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn compact(&mut self) -> Result<()> {
        self.store.compact()
    }

    /// True when the graph is built and has an entry point.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let meta = self.graph().meta();
        meta.is_built && meta.entry_point.is_some()
    }

    /// Current statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> IndexStats {
        let graph = self.graph();
        let meta = graph.meta();
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();
        IndexStats {
            node_count,
            edge_count,
            max_level: meta.max_level,
            avg_degree: if node_count == 0 {
                0.0
            } else {
                edge_count as f64 / node_count as f64
            },
            is_built: meta.is_built,
        }
    }
}

impl<S: GraphStore + std::fmt::Debug> std::fmt::Debug for HnswIndex<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("params", &self.params)
            .field("store", &self.store)
            .field("building", &matches!(self.state, GraphState::Building(_)))
            .finish_non_exhaustive()
    }
}
