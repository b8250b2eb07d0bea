//! # `AgentDB` Core
//!
//! Embedded vector database with a persistent HNSW index.
//!
//! `AgentDB` keeps embeddings in a vector store and answers nearest-neighbor
//! queries either exactly (small collections) or through an HNSW graph that
//! lives in a pluggable [`GraphStore`](index::hnsw::GraphStore).
//!
//! ## Features
//!
//! - **Persistent HNSW**: node and edge rows in a snapshot + WAL graph store
//! - **Bulk build**: whole-graph construction in memory, committed atomically
//! - **Exact fallback**: brute-force search below `min_vectors_for_index`
//! - **3 Distance Metrics**: Cosine, Euclidean, Dot Product (SIMD via `wide`)
//!
//! ## Quick Start
//!
//! ```rust
//! use agentdb_core::{AgentDb, AgentDbConfig, SearchPath};
//!
//! # fn main() -> agentdb_core::Result<()> {
//! let mut config = AgentDbConfig::default();
//! config.hnsw.min_vectors_for_index = 2;
//!
//! let db = AgentDb::in_memory(3, config)?;
//! db.insert("a", vec![1.0, 0.0, 0.0], None)?;
//! db.insert("b", vec![0.0, 1.0, 0.0], None)?;
//!
//! let outcome = db.search(&[0.9, 0.1, 0.0], 1)?;
//! assert_eq!(outcome.path, SearchPath::Indexed);
//! assert_eq!(outcome.results[0].id, "a");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod db;
pub mod distance;
#[cfg(test)]
mod distance_tests;
pub mod error;
pub mod index;
pub mod simd;
pub mod storage;
pub mod vector_store;

pub use config::{AgentDbConfig, ConfigError, HnswConfig};
pub use db::{AgentDb, DbStats, QueryResult, SearchOutcome, SearchPath};
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::hnsw::{FileGraphStore, GraphStore, MemoryGraphStore};
pub use index::{HnswIndex, HnswParams, IndexStats, SearchHit};
pub use vector_store::{
    LogVectorStore, MemoryVectorStore, VectorRecord, VectorSource, VectorStore,
};
