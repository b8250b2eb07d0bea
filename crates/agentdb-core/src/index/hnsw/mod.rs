//! Persistent HNSW graph index.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              HnswIndex<S>                  │
//! │  params: HnswParams                        │
//! │  state:  Ready | Building(MemoryGraphStore)│
//! │  store:  S: GraphStore                     │
//! └────────────────────────────────────────────┘
//!            │                     │
//!   MemoryGraphStore        FileGraphStore
//!   (tables in memory,      (snapshot + WAL,
//!    build cache)            one node row per vector)
//! ```
//!
//! # References
//!
//! - Paper: "Efficient and robust approximate nearest neighbor search
//!   using Hierarchical Navigable Small World graphs" (Malkov & Yashunin, 2016)
//! - arXiv: <https://arxiv.org/abs/1603.09320>

mod candidate;
mod file_store;
mod graph_store;
mod index;
mod layer;
mod memory_store;
mod node;
mod params;

pub use file_store::FileGraphStore;
pub use graph_store::GraphStore;
pub use index::{HnswIndex, IndexStats, SearchHit};
pub use memory_store::MemoryGraphStore;
pub use node::{Edge, GraphMeta, Neighbor, NodeId, NodeRecord};
pub use params::{HnswParams, MAX_LEVEL};

#[cfg(test)]
mod file_store_tests;
#[cfg(test)]
mod layer_tests;
