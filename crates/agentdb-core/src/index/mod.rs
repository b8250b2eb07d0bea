//! Index implementations for approximate nearest neighbor search.

pub mod hnsw;

pub use hnsw::{HnswIndex, HnswParams, IndexStats, SearchHit};
