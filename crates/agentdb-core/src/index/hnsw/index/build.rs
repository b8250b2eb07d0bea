//! Whole-graph rebuilds from a vector source.

use super::{GraphState, HnswIndex};
use crate::error::{Error, Result};
use crate::index::hnsw::graph_store::GraphStore;
use crate::index::hnsw::memory_store::MemoryGraphStore;
use crate::index::hnsw::node::{NodeId, NodeRecord};
use crate::vector_store::VectorSource;
use std::time::Instant;

impl<S: GraphStore> HnswIndex<S> {
    /// Rebuilds the graph by inserting every vector straight into the store.
    ///
    /// Each insert issues its own node, edge and metadata writes, so a
    /// durable store pays one round-trip per row. Prefer
    /// [`build_optimized`](Self::build_optimized) beyond a few hundred
    /// vectors.
    ///
    /// # Errors
    ///
    /// Returns the source's or the store's error. The store may hold a
    /// partial graph afterwards; running the build again replaces it.
    pub fn build(&mut self, source: &dyn VectorSource) -> Result<()> {
        let started = Instant::now();
        let vectors = source.list_all()?;
        tracing::info!(vectors = vectors.len(), "Starting HNSW build");

        self.reseed();
        self.store.clear()?;
        self.insert_all(vectors)?;

        self.log_finished("HNSW build finished", started);
        Ok(())
    }

    /// Rebuilds the graph in memory and commits it to the store in one
    /// atomic [`GraphStore::replace_all`].
    ///
    /// The store is not touched until the commit, so a failure at any point
    /// leaves the previous graph fully intact.
    ///
    /// # Errors
    ///
    /// Returns the source's error, an insertion error, or the commit error.
    pub fn build_optimized(&mut self, source: &dyn VectorSource) -> Result<()> {
        let started = Instant::now();
        let vectors = source.list_all()?;
        tracing::info!(vectors = vectors.len(), "Starting optimized HNSW build");

        self.reseed();
        self.state = GraphState::Building(MemoryGraphStore::with_capacity(vectors.len()));
        let inserted = self.insert_all(vectors);
        let state = std::mem::replace(&mut self.state, GraphState::Ready);
        inserted?;

        let GraphState::Building(cache) = state else {
            return Err(Error::Internal("build cache vanished during build".to_string()));
        };
        let nodes = cache.node_count();
        let edges = cache.edge_count();
        let flush_started = Instant::now();
        self.store.replace_all(cache)?;
        tracing::debug!(
            nodes,
            edges,
            elapsed_ms = flush_started.elapsed().as_millis(),
            "Flushed build cache"
        );

        self.log_finished("Optimized HNSW build finished", started);
        Ok(())
    }

    fn insert_all(&mut self, vectors: Vec<(String, Vec<f32>)>) -> Result<()> {
        for (vector_id, embedding) in vectors {
            self.evict(NodeId::from_vector_id(&vector_id), &vector_id)?;
            let level = self.random_level();
            self.insert_node(NodeRecord::new(&vector_id, level, &embedding))?;
        }
        Ok(())
    }

    fn log_finished(&self, message: &'static str, started: Instant) {
        let stats = self.stats();
        let elapsed = started.elapsed();
        tracing::info!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            max_level = stats.max_level,
            elapsed_ms = elapsed.as_millis(),
            "{message}"
        );
    }
}
