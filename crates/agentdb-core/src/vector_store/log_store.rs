//! Log-structured on-disk vector store.
//!
//! Every mutation is appended to `vectors.log` as a CRC-framed bincode record
//! and applied to an in-memory map; opening the store replays the log.
//! [`LogVectorStore::compact`] rewrites the log so that it holds only live
//! records. It also runs after a write once the log is past the compaction
//! threshold and at least half of its records are dead.

use super::{validate_embedding, VectorRecord, VectorSource, VectorStore};
use crate::error::{Error, Result};
use crate::storage::atomic::write_atomic;
use crate::storage::codec::{bytes_to_embedding, embedding_to_bytes};
use crate::storage::record_log::{append_record, open_for_append, replay};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "vectors.log";
const DEFAULT_COMPACTION_MIN_BYTES: u64 = 4 * 1024 * 1024;

// Metadata travels as a JSON string: bincode cannot decode self-describing
// `serde_json::Value`s.
#[derive(Debug, Serialize, Deserialize)]
enum LogOp {
    Header { dimension: usize },
    Put { id: String, embedding: Vec<u8>, metadata: String },
    Delete(String),
    Clear,
}

impl LogOp {
    fn put(record: &VectorRecord) -> Result<Self> {
        Ok(Self::Put {
            id: record.id.clone(),
            embedding: embedding_to_bytes(&record.embedding),
            metadata: serde_json::to_string(&record.metadata)?,
        })
    }
}

/// Vector store persisted as an append-only log under a directory.
pub struct LogVectorStore {
    path: PathBuf,
    dimension: usize,
    records: IndexMap<String, VectorRecord>,
    log: BufWriter<File>,
    sync_writes: bool,
    // Records in the log that no longer describe a live vector.
    dead_records: usize,
    log_bytes: u64,
    compaction_min_bytes: u64,
}

impl std::fmt::Debug for LogVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogVectorStore")
            .field("path", &self.path)
            .field("dimension", &self.dimension)
            .field("records", &self.records.len())
            .field("dead_records", &self.dead_records)
            .field("log_bytes", &self.log_bytes)
            .finish_non_exhaustive()
    }
}

impl LogVectorStore {
    /// Opens (or creates) the store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `dimension` is zero or differs from the
    /// dimension the store was created with, or an I/O or serialization error
    /// if the log cannot be read.
    pub fn open<P: AsRef<Path>>(dir: P, dimension: usize, sync_writes: bool) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("dimension must be greater than 0".to_string()));
        }
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(LOG_FILE);

        let replayed = replay(&path)?;
        if replayed.torn {
            tracing::warn!(
                path = %path.display(),
                valid_len = replayed.valid_len,
                "Vector log has a torn tail; discarding incomplete record"
            );
        }

        let mut records = IndexMap::new();
        let mut dead_records = 0usize;
        let mut stored_dimension = None;
        for payload in &replayed.records {
            match bincode::deserialize::<LogOp>(payload)? {
                LogOp::Header { dimension } => stored_dimension = Some(dimension),
                LogOp::Put {
                    id,
                    embedding,
                    metadata,
                } => {
                    let record = VectorRecord {
                        id: id.clone(),
                        embedding: bytes_to_embedding(&embedding)?,
                        metadata: serde_json::from_str(&metadata)?,
                    };
                    if records.insert(id, record).is_some() {
                        dead_records += 1;
                    }
                }
                LogOp::Delete(id) => {
                    if records.shift_remove(&id).is_some() {
                        dead_records += 1;
                    }
                    dead_records += 1;
                }
                LogOp::Clear => {
                    dead_records += records.len() + 1;
                    records.clear();
                }
            }
        }

        if let Some(stored) = stored_dimension {
            if stored != dimension {
                return Err(Error::Config(format!(
                    "vector store at {} has dimension {stored}, requested {dimension}",
                    path.display()
                )));
            }
        }

        let mut log = open_for_append(&path, replayed.valid_len)?;
        let mut log_bytes = replayed.valid_len;
        if stored_dimension.is_none() {
            log_bytes +=
                append_record(&mut log, &bincode::serialize(&LogOp::Header { dimension })?)?;
            log.flush()?;
        }

        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            dead_records,
            "Opened vector log"
        );

        Ok(Self {
            path,
            dimension,
            records,
            log,
            sync_writes,
            dead_records,
            log_bytes,
            compaction_min_bytes: DEFAULT_COMPACTION_MIN_BYTES,
        })
    }

    /// Sets the log size below which the log is never compacted
    /// automatically. `u64::MAX` turns automatic compaction off.
    #[must_use]
    pub const fn with_compaction_min_bytes(mut self, bytes: u64) -> Self {
        self.compaction_min_bytes = bytes;
        self
    }

    /// Reads the dimension recorded in the store under `dir`, if any.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error if the log cannot be read.
    pub fn stored_dimension<P: AsRef<Path>>(dir: P) -> Result<Option<usize>> {
        let replayed = replay(&dir.as_ref().join(LOG_FILE))?;
        match replayed.records.first() {
            Some(payload) => match bincode::deserialize::<LogOp>(payload)? {
                LogOp::Header { dimension } => Ok(Some(dimension)),
                _ => Err(Error::IndexCorrupted(
                    "vector log does not start with a header".to_string(),
                )),
            },
            None => Ok(None),
        }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of superseded records a [`compact`](Self::compact) would drop.
    #[must_use]
    pub const fn dead_records(&self) -> usize {
        self.dead_records
    }

    /// Bytes in the log file.
    #[must_use]
    pub const fn log_bytes(&self) -> u64 {
        self.log_bytes
    }

    /// Rewrites the log with one record per live vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the new log cannot be written; the old log stays in
    /// place in that case.
    pub fn compact(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        append_record(
            &mut buf,
            &bincode::serialize(&LogOp::Header {
                dimension: self.dimension,
            })?,
        )?;
        for record in self.records.values() {
            append_record(&mut buf, &bincode::serialize(&LogOp::put(record)?)?)?;
        }

        self.log.flush()?;
        write_atomic(&self.path, &buf)?;
        self.log = open_for_append(&self.path, buf.len() as u64)?;
        self.log_bytes = buf.len() as u64;

        tracing::debug!(
            path = %self.path.display(),
            dropped = self.dead_records,
            "Compacted vector log"
        );
        self.dead_records = 0;
        Ok(())
    }

    fn append(&mut self, op: &LogOp) -> Result<()> {
        self.log_bytes += append_record(&mut self.log, &bincode::serialize(op)?)?;
        self.log.flush()?;
        if self.sync_writes {
            self.log.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Compacts once dead records make up at least half of a log past the
    /// threshold. The write that triggered it is already durable, so a failed
    /// compaction is only logged.
    fn compact_if_due(&mut self) {
        if self.dead_records == 0
            || self.log_bytes < self.compaction_min_bytes
            || self.dead_records < self.records.len()
        {
            return;
        }
        if let Err(e) = self.compact() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Vector log compaction failed"
            );
        }
    }
}

impl VectorSource for LogVectorStore {
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

impl VectorStore for LogVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.get(id).cloned()
    }

    fn insert(&mut self, record: VectorRecord) -> Result<()> {
        validate_embedding(&record.embedding, self.dimension)?;
        self.append(&LogOp::put(&record)?)?;
        if self.records.insert(record.id.clone(), record).is_some() {
            self.dead_records += 1;
        }
        self.compact_if_due();
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        if !self.records.contains_key(id) {
            return Ok(false);
        }
        self.append(&LogOp::Delete(id.to_string()))?;
        self.records.shift_remove(id);
        self.dead_records += 2;
        self.compact_if_due();
        Ok(true)
    }

    fn clear(&mut self) -> Result<()> {
        self.append(&LogOp::Clear)?;
        self.dead_records += self.records.len() + 1;
        self.records.clear();
        self.compact_if_due();
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&VectorRecord)) {
        for record in self.records.values() {
            visit(record);
        }
    }

    fn compact(&mut self) -> Result<()> {
        LogVectorStore::compact(self)
    }
}
