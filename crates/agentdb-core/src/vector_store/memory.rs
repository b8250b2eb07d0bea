//! In-memory vector store.

use super::{validate_embedding, VectorRecord, VectorSource, VectorStore};
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Vector store held in an insertion-ordered map.
///
/// Replacing an existing id keeps its original position, so `list_all`
/// is stable across updates.
#[derive(Debug, Clone)]
pub struct MemoryVectorStore {
    dimension: usize,
    records: IndexMap<String, VectorRecord>,
}

impl MemoryVectorStore {
    /// Creates an empty store for embeddings of `dimension` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("dimension must be greater than 0".to_string()));
        }
        Ok(Self {
            dimension,
            records: IndexMap::new(),
        })
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl VectorSource for MemoryVectorStore {
    fn list_all(&self) -> Result<Vec<(String, Vec<f32>)>> {
        Ok(self
            .records
            .values()
            .map(|r| (r.id.clone(), r.embedding.clone()))
            .collect())
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}

impl VectorStore for MemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.get(id).cloned()
    }

    fn insert(&mut self, record: VectorRecord) -> Result<()> {
        validate_embedding(&record.embedding, self.dimension)?;
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        // shift_remove keeps the remaining order intact
        Ok(self.records.shift_remove(id).is_some())
    }

    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&VectorRecord)) {
        for record in self.records.values() {
            visit(record);
        }
    }
}
