//! Backend integration layer.
//!
//! [`AgentDb`] owns a vector store and an HNSW index over it and decides per
//! query which of the two serves the results:
//!
//! | Condition                                               | Path         |
//! |---------------------------------------------------------|--------------|
//! | index disabled                                          | brute force  |
//! | fewer than `min_vectors_for_index` vectors              | brute force  |
//! | index enabled, above threshold, but not ready           | brute force  |
//! | otherwise                                               | indexed      |
//!
//! Indexed candidates (`k * rerank_multiplier` of them) are re-scored with
//! the configured search metric before truncation to `k`.
//!
//! Lock order is always vectors, then index.

use crate::config::AgentDbConfig;
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::hnsw::{FileGraphStore, GraphStore, HnswIndex, IndexStats, MemoryGraphStore};
use crate::vector_store::{
    validate_embedding, LogVectorStore, MemoryVectorStore, VectorRecord, VectorStore,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which path served a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPath {
    /// Candidates came from the HNSW index.
    Indexed,
    /// Exact linear scan over the vector store.
    BruteForce,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Vector id.
    pub id: String,
    /// Score under the search metric.
    pub score: f32,
    /// Metadata stored with the vector.
    pub metadata: serde_json::Value,
}

/// Results of a query together with the path that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Results, best first.
    pub results: Vec<QueryResult>,
    /// Path that served the query.
    pub path: SearchPath,
}

/// Database-level statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbStats {
    /// Number of stored vectors.
    pub vectors: usize,
    /// Embedding dimension.
    pub dimension: usize,
    /// Whether queries would currently be served by the index.
    pub index_active: bool,
    /// Index statistics.
    pub index: IndexStats,
}

/// Vector database: a vector store plus an HNSW index with exact-search
/// fallback.
pub struct AgentDb<V = MemoryVectorStore, G = MemoryGraphStore>
where
    V: VectorStore,
    G: GraphStore,
{
    config: AgentDbConfig,
    vectors: RwLock<V>,
    index: RwLock<HnswIndex<G>>,
}

impl AgentDb<MemoryVectorStore, MemoryGraphStore> {
    /// Creates a purely in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `dimension` is zero or `config` is
    /// invalid.
    pub fn in_memory(dimension: usize, config: AgentDbConfig) -> Result<Self> {
        let vectors = MemoryVectorStore::new(dimension)?;
        Self::with_stores(vectors, MemoryGraphStore::new(), config)
    }
}

impl AgentDb<LogVectorStore, FileGraphStore> {
    /// Opens (or creates) a durable database under `config.storage.data_dir`.
    ///
    /// Vectors live in `<data_dir>/vectors`, the graph in `<data_dir>/graph`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or either store
    /// cannot be opened.
    pub fn open(dimension: usize, config: AgentDbConfig) -> Result<Self> {
        config.validate()?;
        let root = Path::new(&config.storage.data_dir);
        let sync = config.storage.sync_writes;
        let threshold = config.storage.compaction_threshold();
        let vectors = LogVectorStore::open(root.join("vectors"), dimension, sync)?
            .with_compaction_min_bytes(threshold);
        let graph =
            FileGraphStore::open(root.join("graph"), sync)?.with_compaction_min_bytes(threshold);
        Self::with_stores(vectors, graph, config)
    }
}

impl<V: VectorStore, G: GraphStore> AgentDb<V, G> {
    /// Wraps existing stores.
    ///
    /// If the graph does not cover the stored vectors (for example after a
    /// crash between a vector write and its index update) and the index is
    /// in use, it is rebuilt.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the reconciling rebuild
    /// fails.
    pub fn with_stores(vectors: V, graph: G, config: AgentDbConfig) -> Result<Self> {
        config.validate()?;
        let index = HnswIndex::from_config(graph, &config.hnsw)?;

        let db = Self {
            config,
            vectors: RwLock::new(vectors),
            index: RwLock::new(index),
        };

        let count = db.vectors.read().count();
        let (indexed, ready) = {
            let index = db.index.read();
            (index.len(), index.is_ready())
        };
        if db.should_index(count) && (!ready || indexed != count) {
            tracing::warn!(
                vectors = count,
                indexed,
                "Index out of sync with vector store; rebuilding"
            );
            db.rebuild()?;
        }
        Ok(db)
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentDbConfig {
        &self.config
    }

    /// Embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.read().dimension()
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.vectors.read().count()
    }

    /// Returns true if the index currently holds a searchable graph.
    #[must_use]
    pub fn is_index_ready(&self) -> bool {
        self.index.read().is_ready()
    }

    /// Inserts or replaces a vector.
    ///
    /// Once the store reaches `min_vectors_for_index` the index is built with
    /// the optimized bulk path; after that every insert updates it
    /// incrementally.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] or
    /// [`crate::Error::InvalidVector`] for a malformed embedding, or a storage
    /// error.
    pub fn insert(
        &self,
        id: &str,
        embedding: Vec<f32>,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut vectors = self.vectors.write();
        let record = VectorRecord {
            id: id.to_string(),
            embedding,
            metadata: metadata.unwrap_or(serde_json::Value::Null),
        };
        let embedding = record.embedding.clone();
        vectors.insert(record)?;

        let mut index = self.index.write();
        if index.is_ready() {
            index.insert(id, &embedding)?;
        } else if self.should_index(vectors.count()) {
            tracing::info!(
                vectors = vectors.count(),
                threshold = self.config.hnsw.min_vectors_for_index,
                "Vector count reached index threshold"
            );
            index.build_optimized(&*vectors)?;
        }
        Ok(())
    }

    /// Inserts many vectors, building or updating the index once at the end.
    ///
    /// # Errors
    ///
    /// Stops at the first invalid record and returns its error; records
    /// before it are kept.
    pub fn insert_batch(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut vectors = self.vectors.write();
        let mut index = self.index.write();
        let was_ready = index.is_ready();
        let mut inserted = 0;

        for record in records {
            let id = record.id.clone();
            let embedding = record.embedding.clone();
            vectors.insert(record)?;
            if was_ready {
                index.insert(&id, &embedding)?;
            }
            inserted += 1;
        }

        if !was_ready && self.should_index(vectors.count()) {
            index.build_optimized(&*vectors)?;
        }
        Ok(inserted)
    }

    /// Looks up a vector.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.vectors.read().get(id)
    }

    /// Deletes a vector. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either store fails to persist the removal.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut vectors = self.vectors.write();
        if !vectors.delete(id)? {
            return Ok(false);
        }
        self.index.write().delete(id)?;
        Ok(true)
    }

    /// Removes every vector and resets the index.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn clear(&self) -> Result<()> {
        let mut vectors = self.vectors.write();
        vectors.clear()?;
        self.index.write().build_optimized(&*vectors)
    }

    /// Rebuilds the index from the store with the optimized bulk path.
    ///
    /// # Errors
    ///
    /// Returns the build error; the previous graph is kept in that case.
    pub fn rebuild(&self) -> Result<()> {
        let vectors = self.vectors.read();
        self.index.write().build_optimized(&*vectors)
    }

    /// Rebuilds the index with one durable write per row.
    ///
    /// # Errors
    ///
    /// Returns the build error.
    pub fn rebuild_naive(&self) -> Result<()> {
        let vectors = self.vectors.read();
        self.index.write().build(&*vectors)
    }

    /// Rewrites both stores down to their live contents: the vector log
    /// without superseded records, the graph as a fresh snapshot with an
    /// empty WAL.
    ///
    /// # Errors
    ///
    /// Returns the storage error; a store that fails to compact keeps its
    /// current files.
    pub fn compact(&self) -> Result<()> {
        let mut vectors = self.vectors.write();
        vectors.compact()?;
        self.index.write().compact()?;
        tracing::info!(vectors = vectors.count(), "Compacted storage");
        Ok(())
    }

    /// Returns the `k` best matches for `query` under the search metric.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] or
    /// [`crate::Error::InvalidVector`] if the query is malformed.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchOutcome> {
        let vectors = self.vectors.read();
        validate_embedding(query, vectors.dimension())?;

        let k = k.min(self.config.search.max_results);
        let metric = self.config.search.metric;
        let index = self.index.read();
        let path = if self.should_index(vectors.count()) && index.is_ready() {
            SearchPath::Indexed
        } else {
            SearchPath::BruteForce
        };
        tracing::debug!(?path, k, vectors = vectors.count(), "Search");

        if k == 0 {
            return Ok(SearchOutcome {
                results: Vec::new(),
                path,
            });
        }

        let mut scored: Vec<(String, f32)> = match path {
            SearchPath::Indexed => {
                let wanted = k.saturating_mul(self.config.search.rerank_multiplier);
                index
                    .search(query, wanted)
                    .into_iter()
                    .map(|hit| {
                        let score = metric.calculate(query, &hit.embedding);
                        (hit.vector_id.to_string(), score)
                    })
                    .collect()
            }
            SearchPath::BruteForce => brute_force(&*vectors, metric, query),
        };

        metric.sort_results(&mut scored);
        scored.truncate(k);

        let results = scored
            .into_iter()
            .filter_map(|(id, score)| {
                vectors.get(&id).map(|record| QueryResult {
                    id,
                    score,
                    metadata: record.metadata,
                })
            })
            .collect();
        Ok(SearchOutcome { results, path })
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> DbStats {
        let vectors = self.vectors.read();
        let index = self.index.read();
        let count = vectors.count();
        DbStats {
            vectors: count,
            dimension: vectors.dimension(),
            index_active: self.should_index(count) && index.is_ready(),
            index: index.stats(),
        }
    }

    fn should_index(&self, count: usize) -> bool {
        self.config.hnsw.enabled && count >= self.config.hnsw.min_vectors_for_index
    }
}

fn brute_force<V: VectorStore + ?Sized>(
    vectors: &V,
    metric: DistanceMetric,
    query: &[f32],
) -> Vec<(String, f32)> {
    let mut scored = Vec::with_capacity(vectors.count());
    vectors.scan(&mut |record| {
        scored.push((record.id.clone(), metric.calculate(query, &record.embedding)));
    });
    scored
}

impl SearchOutcome {
    /// Result ids, best first.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }
}

impl<V: VectorStore, G: GraphStore> std::fmt::Debug for AgentDb<V, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDb")
            .field("config", &self.config)
            .field("vectors", &self.count())
            .field("index_ready", &self.is_index_ready())
            .finish()
    }
}
