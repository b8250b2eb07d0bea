//! Vector storage: the durable mapping from vector id to embedding and
//! metadata.
//!
//! The HNSW index only ever reads from a store, through [`VectorSource`].
//! Writes come from the backend layer.

mod log_store;
mod memory;

pub use log_store::LogVectorStore;
pub use memory::MemoryVectorStore;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// A stored vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Caller-assigned identifier.
    pub id: String,
    /// The embedding.
    pub embedding: Vec<f32>,
    /// Arbitrary JSON metadata (`null` when absent).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl VectorRecord {
    /// Creates a record without metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Read side of a vector store used to (re)build an index.
pub trait VectorSource {
    /// Every `(vector_id, embedding)` pair, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn list_all(&self) -> Result<Vec<(String, Vec<f32>)>>;

    /// Number of stored vectors.
    fn count(&self) -> usize;
}

/// A complete vector store.
pub trait VectorStore: VectorSource + Send + Sync {
    /// Fixed embedding dimension of this store.
    fn dimension(&self) -> usize;

    /// Looks up a record by id.
    fn get(&self, id: &str) -> Option<VectorRecord>;

    /// Inserts or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] or [`Error::InvalidVector`] for a
    /// malformed embedding, or a storage error if the write fails.
    fn insert(&mut self, record: VectorRecord) -> Result<()>;

    /// Removes a record. Returns false if the id was unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&mut self, id: &str) -> Result<bool>;

    /// Removes every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn clear(&mut self) -> Result<()>;

    /// Visits every record in stable order.
    fn scan(&self, visit: &mut dyn FnMut(&VectorRecord));

    /// Shrinks durable storage to the live records. A no-op for stores
    /// without a log.
    ///
    /// # Errors
    ///
    /// Returns an error if the compacted log cannot be written.
    fn compact(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Checks an embedding against the store dimension.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the length differs, or
/// [`Error::InvalidVector`] if the embedding is empty or contains NaN or
/// infinite values.
pub fn validate_embedding(embedding: &[f32], dimension: usize) -> Result<()> {
    if embedding.is_empty() {
        return Err(Error::InvalidVector("embedding is empty".to_string()));
    }
    if embedding.len() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            actual: embedding.len(),
        });
    }
    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(Error::InvalidVector(format!(
            "non-finite value at position {pos}"
        )));
    }
    Ok(())
}
