//! Bulk import from JSON Lines files.

use agentdb_core::{AgentDb, FileGraphStore, LogVectorStore, VectorRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

/// JSON Lines record structure
#[derive(Debug, Deserialize)]
pub struct JsonRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Import statistics
#[derive(Debug, Default)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    pub duration_ms: u128,
}

/// Dimension of the first record in `path`.
pub fn detect_dimension(path: &Path) -> Result<usize> {
    let file = File::open(path).context("Failed to open JSONL file")?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: JsonRecord =
            serde_json::from_str(&line).context("Failed to parse first record")?;
        return Ok(record.vector.len());
    }
    anyhow::bail!("Empty file: {}", path.display())
}

/// Streams `path` into `db` in batches of `batch_size`.
///
/// Lines that fail to parse are skipped with a warning; store errors abort
/// the import.
pub fn import_jsonl(
    db: &AgentDb<LogVectorStore, FileGraphStore>,
    path: &Path,
    batch_size: usize,
) -> Result<ImportStats> {
    let started = Instant::now();
    let file = File::open(path).context("Failed to open JSONL file")?;
    let reader = BufReader::with_capacity(128 * 1024, file);

    let mut stats = ImportStats::default();
    let mut batch = Vec::with_capacity(batch_size);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonRecord>(&line) {
            Ok(record) => {
                let mut vector = VectorRecord::new(record.id, record.vector);
                if let Some(metadata) = record.metadata {
                    vector = vector.with_metadata(metadata);
                }
                batch.push(vector);
            }
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "Skipping malformed record");
                stats.skipped += 1;
            }
        }

        if batch.len() >= batch_size {
            stats.imported += db.insert_batch(std::mem::take(&mut batch))?;
        }
    }
    if !batch.is_empty() {
        stats.imported += db.insert_batch(batch)?;
    }

    stats.duration_ms = started.elapsed().as_millis();
    Ok(stats)
}
