//! Durable graph tables: a generation snapshot plus a write-ahead log.
//!
//! # Files
//!
//! ```text
//! graph.snapshot                 [magic "AGSN"][version u8][generation u64 LE][bincode body][crc32 u32 LE]
//! graph-<generation:016x>.wal    record log of bincode WalOp values
//! ```
//!
//! Every per-row write is appended to the WAL of the current generation before
//! it is applied in memory. [`GraphStore::replace_all`] writes a complete
//! snapshot under the next generation number and renames it into place; from
//! that rename on, WALs of older generations are dead and are removed on the
//! next open. A crash at any point therefore recovers either the old graph
//! (old snapshot + old WAL) or the new one, never a mix.
//!
//! Once the WAL is at least as large as the snapshot and past the compaction
//! threshold it is folded into a new snapshot the same way.

use super::graph_store::GraphStore;
use super::memory_store::MemoryGraphStore;
use super::node::{Edge, GraphMeta, Neighbor, NodeId, NodeRecord};
use crate::error::{Error, Result};
use crate::storage::atomic::{temp_path_for, write_atomic};
use crate::storage::checksum::crc32;
use crate::storage::codec::{bytes_to_embedding, embedding_to_bytes};
use crate::storage::record_log::{append_record, open_for_append, replay};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) const SNAPSHOT_MAGIC: &[u8; 4] = b"AGSN";
pub(crate) const SNAPSHOT_VERSION: u8 = 1;
const SNAPSHOT_FILE: &str = "graph.snapshot";
// magic(4) + version(1) + generation(8)
const HEADER_LEN: usize = 13;
const CRC_LEN: usize = 4;
const DEFAULT_COMPACTION_MIN_BYTES: u64 = 4 * 1024 * 1024;

/// On-disk node row. The embedding is kept as little-endian bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRow {
    id: NodeId,
    vector_id: String,
    level: usize,
    embedding: Vec<u8>,
}

impl From<&NodeRecord> for NodeRow {
    fn from(node: &NodeRecord) -> Self {
        Self {
            id: node.id,
            vector_id: node.vector_id.to_string(),
            level: node.level,
            embedding: embedding_to_bytes(&node.embedding),
        }
    }
}

impl NodeRow {
    fn into_record(self) -> Result<NodeRecord> {
        let embedding = bytes_to_embedding(&self.embedding)?;
        Ok(NodeRecord {
            id: self.id,
            vector_id: Arc::from(self.vector_id),
            level: self.level,
            embedding: Arc::from(embedding),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum WalOp {
    PutNode(NodeRow),
    RemoveNode(NodeId),
    PutEdge(Edge),
    RemoveEdge { from: NodeId, to: NodeId, level: usize },
    SetMeta(GraphMeta),
    Clear,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotBody {
    meta: GraphMeta,
    nodes: Vec<NodeRow>,
    edges: Vec<Edge>,
}

/// Graph tables persisted under a directory.
///
/// The full graph stays resident in a [`MemoryGraphStore`]; disk is only
/// touched by writes.
pub struct FileGraphStore {
    dir: PathBuf,
    graph: MemoryGraphStore,
    generation: u64,
    wal: BufWriter<File>,
    sync_writes: bool,
    wal_bytes: u64,
    snapshot_bytes: u64,
    compaction_min_bytes: u64,
}

impl std::fmt::Debug for FileGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileGraphStore")
            .field("dir", &self.dir)
            .field("generation", &self.generation)
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("wal_bytes", &self.wal_bytes)
            .field("sync_writes", &self.sync_writes)
            .finish_non_exhaustive()
    }
}

impl FileGraphStore {
    /// Opens (or creates) the graph stored in `dir`.
    ///
    /// Loads the snapshot, replays the WAL of the snapshot's generation and
    /// truncates a torn WAL tail. With `sync_writes` every WAL append is
    /// followed by `fsync`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexCorrupted`] if the snapshot fails validation, or an
    /// I/O error if the directory cannot be read or written.
    pub fn open<P: AsRef<Path>>(dir: P, sync_writes: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let stale_temp = temp_path_for(&snapshot_path);
        if stale_temp.exists() {
            tracing::warn!(path = %stale_temp.display(), "Removing unfinished snapshot");
            std::fs::remove_file(&stale_temp)?;
        }

        let (mut graph, generation, snapshot_bytes) = match std::fs::read(&snapshot_path) {
            Ok(data) => {
                let (graph, generation) = decode_snapshot(&data)?;
                (graph, generation, data.len() as u64)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (MemoryGraphStore::new(), 0, 0),
            Err(e) => return Err(e.into()),
        };

        let wal_path = wal_path(&dir, generation);
        let replayed = replay(&wal_path)?;
        if replayed.torn {
            tracing::warn!(
                path = %wal_path.display(),
                valid_len = replayed.valid_len,
                "Graph WAL has a torn tail; discarding incomplete record"
            );
        }
        let op_count = replayed.records.len();
        for record in replayed.records {
            let op: WalOp = bincode::deserialize(&record)?;
            apply(&mut graph, op)?;
        }

        remove_dead_wals(&dir, generation)?;
        let wal = open_for_append(&wal_path, replayed.valid_len)?;

        tracing::debug!(
            dir = %dir.display(),
            generation,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            wal_ops = op_count,
            "Opened graph store"
        );

        Ok(Self {
            dir,
            graph,
            generation,
            wal,
            sync_writes,
            wal_bytes: replayed.valid_len,
            snapshot_bytes,
            compaction_min_bytes: DEFAULT_COMPACTION_MIN_BYTES,
        })
    }

    /// Sets the WAL size below which the WAL is never folded automatically.
    /// `u64::MAX` turns automatic folding off.
    #[must_use]
    pub const fn with_compaction_min_bytes(mut self, bytes: u64) -> Self {
        self.compaction_min_bytes = bytes;
        self
    }

    /// Generation of the snapshot currently in effect.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Bytes in the WAL of the current generation.
    #[must_use]
    pub const fn wal_bytes(&self) -> u64 {
        self.wal_bytes
    }

    /// Folds the WAL into a fresh snapshot and starts an empty WAL.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written; the store is
    /// unchanged in that case.
    pub fn checkpoint(&mut self) -> Result<()> {
        let (generation, wal, snapshot_bytes) = self.commit_generation(&self.graph)?;
        self.switch_generation(generation, wal, snapshot_bytes);
        Ok(())
    }

    fn log(&mut self, op: &WalOp) -> Result<()> {
        let payload = bincode::serialize(op)?;
        self.wal_bytes += append_record(&mut self.wal, &payload)?;
        self.wal.flush()?;
        if self.sync_writes {
            self.wal.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Folds the WAL once it outgrows both the snapshot and the threshold.
    /// Runs after the write is applied in memory; a failed fold keeps the
    /// current generation and is retried on the next write.
    fn fold_if_due(&mut self) {
        if self.wal_bytes < self.compaction_min_bytes || self.wal_bytes < self.snapshot_bytes {
            return;
        }
        let wal_bytes = self.wal_bytes;
        match self.checkpoint() {
            Ok(()) => tracing::debug!(
                generation = self.generation,
                wal_bytes,
                snapshot_bytes = self.snapshot_bytes,
                "Folded graph WAL"
            ),
            Err(e) => tracing::warn!(error = %e, wal_bytes, "Graph WAL fold failed"),
        }
    }

    /// Writes `graph` as the snapshot of the next generation and returns the
    /// new generation, its (empty) WAL and the snapshot size. Nothing
    /// observable changes on error.
    fn commit_generation(&self, graph: &MemoryGraphStore) -> Result<(u64, BufWriter<File>, u64)> {
        let generation = self.generation + 1;
        let bytes = encode_snapshot(graph, generation)?;

        // The new WAL must exist before the snapshot that refers to it.
        let new_wal_path = wal_path(&self.dir, generation);
        let wal = open_for_append(&new_wal_path, 0)?;
        if self.sync_writes {
            wal.get_ref().sync_all()?;
        }

        if let Err(e) = write_atomic(&self.dir.join(SNAPSHOT_FILE), &bytes) {
            drop(wal);
            let _ = std::fs::remove_file(&new_wal_path);
            return Err(Error::Storage(format!(
                "failed to commit graph generation {generation}: {e}"
            )));
        }

        tracing::debug!(
            generation,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            bytes = bytes.len(),
            "Committed graph snapshot"
        );
        Ok((generation, wal, bytes.len() as u64))
    }

    fn switch_generation(&mut self, generation: u64, wal: BufWriter<File>, snapshot_bytes: u64) {
        let old = wal_path(&self.dir, self.generation);
        self.wal = wal;
        self.generation = generation;
        self.wal_bytes = 0;
        self.snapshot_bytes = snapshot_bytes;
        if let Err(e) = std::fs::remove_file(&old) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %old.display(), error = %e, "Failed to remove old graph WAL");
            }
        }
    }
}

impl GraphStore for FileGraphStore {
    fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.graph.node(id)
    }

    fn neighbors(&self, id: NodeId, level: usize) -> &[Neighbor] {
        self.graph.neighbors(id, level)
    }

    fn meta(&self) -> GraphMeta {
        self.graph.meta()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_ids()
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn put_node(&mut self, node: NodeRecord) -> Result<()> {
        self.log(&WalOp::PutNode(NodeRow::from(&node)))?;
        self.graph.put_node(node)?;
        self.fold_if_due();
        Ok(())
    }

    fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.log(&WalOp::RemoveNode(id))?;
        self.graph.remove_node(id)?;
        self.fold_if_due();
        Ok(())
    }

    fn put_edge(&mut self, edge: Edge) -> Result<()> {
        self.log(&WalOp::PutEdge(edge))?;
        self.graph.put_edge(edge)?;
        self.fold_if_due();
        Ok(())
    }

    fn remove_edge(&mut self, from: NodeId, to: NodeId, level: usize) -> Result<()> {
        self.log(&WalOp::RemoveEdge { from, to, level })?;
        self.graph.remove_edge(from, to, level)?;
        self.fold_if_due();
        Ok(())
    }

    fn set_meta(&mut self, meta: GraphMeta) -> Result<()> {
        self.log(&WalOp::SetMeta(meta))?;
        self.graph.set_meta(meta)?;
        self.fold_if_due();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.log(&WalOp::Clear)?;
        self.graph.clear()?;
        self.fold_if_due();
        Ok(())
    }

    fn replace_all(&mut self, graph: MemoryGraphStore) -> Result<()> {
        let (generation, wal, snapshot_bytes) = self.commit_generation(&graph)?;
        self.switch_generation(generation, wal, snapshot_bytes);
        self.graph = graph;
        Ok(())
    }

    fn compact(&mut self) -> Result<()> {
        self.checkpoint()
    }
}

fn wal_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("graph-{generation:016x}.wal"))
}

fn remove_dead_wals(dir: &Path, live_generation: u64) -> Result<()> {
    let live = wal_path(dir, live_generation);
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wal = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("graph-") && n.ends_with(".wal"));
        if is_wal && path != live {
            tracing::debug!(path = %path.display(), "Removing WAL of a superseded generation");
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn apply(graph: &mut MemoryGraphStore, op: WalOp) -> Result<()> {
    match op {
        WalOp::PutNode(row) => graph.put_node(row.into_record()?),
        WalOp::RemoveNode(id) => graph.remove_node(id),
        WalOp::PutEdge(edge) => graph.put_edge(edge),
        WalOp::RemoveEdge { from, to, level } => graph.remove_edge(from, to, level),
        WalOp::SetMeta(meta) => graph.set_meta(meta),
        WalOp::Clear => graph.clear(),
    }
}

fn encode_snapshot(graph: &MemoryGraphStore, generation: u64) -> Result<Vec<u8>> {
    let mut nodes: Vec<NodeRow> = graph.records().map(NodeRow::from).collect();
    nodes.sort_unstable_by_key(|row| row.id);
    let body = SnapshotBody {
        meta: graph.meta(),
        nodes,
        edges: graph.edges().collect(),
    };
    let encoded = bincode::serialize(&body)?;

    let mut buf = Vec::with_capacity(HEADER_LEN + encoded.len() + CRC_LEN);
    buf.extend_from_slice(SNAPSHOT_MAGIC);
    buf.push(SNAPSHOT_VERSION);
    buf.extend_from_slice(&generation.to_le_bytes());
    buf.extend_from_slice(&encoded);
    let crc = crc32(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

fn decode_snapshot(data: &[u8]) -> Result<(MemoryGraphStore, u64)> {
    if data.len() < HEADER_LEN + CRC_LEN {
        return Err(Error::IndexCorrupted("graph snapshot too small".to_string()));
    }
    if &data[0..4] != SNAPSHOT_MAGIC {
        return Err(Error::IndexCorrupted("graph snapshot has invalid magic".to_string()));
    }
    if data[4] != SNAPSHOT_VERSION {
        return Err(Error::IndexCorrupted(format!(
            "unsupported graph snapshot version {}",
            data[4]
        )));
    }

    let (content, crc_bytes) = data.split_at(data.len() - CRC_LEN);
    let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    if crc32(content) != stored_crc {
        return Err(Error::IndexCorrupted("graph snapshot CRC mismatch".to_string()));
    }

    let mut generation_bytes = [0u8; 8];
    generation_bytes.copy_from_slice(&content[5..HEADER_LEN]);
    let generation = u64::from_le_bytes(generation_bytes);

    let body: SnapshotBody = bincode::deserialize(&content[HEADER_LEN..])
        .map_err(|e| Error::IndexCorrupted(format!("graph snapshot body: {e}")))?;

    let mut graph = MemoryGraphStore::with_capacity(body.nodes.len());
    for row in body.nodes {
        graph.put_node(row.into_record()?)?;
    }
    for edge in body.edges {
        graph.put_edge(edge)?;
    }
    graph.set_meta(body.meta)?;

    Ok((graph, generation))
}
