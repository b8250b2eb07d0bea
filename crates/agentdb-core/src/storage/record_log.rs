//! Append-only record log shared by the graph WAL and the vector log.
//!
//! # Record Format
//!
//! ```text
//! [Length: u32 LE][CRC32 of payload: u32 LE][Payload: Length bytes]
//! ```
//!
//! A crash can leave a partially written record at the tail. Replay stops at
//! the first record that is short or fails its CRC, and the caller truncates
//! the file back to the last valid record before appending again.

use super::checksum::crc32;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

const HEADER_LEN: usize = 8;

/// Writes one framed record and returns its size on disk. The caller decides
/// when to flush or sync.
///
/// # Errors
///
/// Returns an error if the payload exceeds `u32::MAX` bytes or the write fails.
pub fn append_record<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<u64> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Record too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&crc32(payload).to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(HEADER_LEN as u64 + u64::from(len))
}

/// Result of replaying a record log from disk.
#[derive(Debug, Default)]
pub struct Replay {
    /// Payloads of every intact record, in write order.
    pub records: Vec<Vec<u8>>,
    /// Byte length of the intact prefix of the file.
    pub valid_len: u64,
    /// True when trailing bytes after `valid_len` were discarded.
    pub torn: bool,
}

/// Reads every intact record from `path`. A missing file replays as empty.
///
/// # Errors
///
/// Returns an error only if the file exists but cannot be read.
pub fn replay(path: &Path) -> io::Result<Replay> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
        Err(e) => return Err(e),
    };

    let mut out = Replay::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let Some(header) = data.get(pos..pos + HEADER_LEN) else {
            break;
        };
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = pos + HEADER_LEN;
        let Some(payload) = data.get(start..start + len) else {
            break;
        };
        if crc32(payload) != crc {
            break;
        }

        out.records.push(payload.to_vec());
        pos = start + len;
    }

    out.valid_len = pos as u64;
    out.torn = pos < data.len();
    Ok(out)
}

/// Opens `path` for appending, first cutting it back to `valid_len` bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or truncated.
pub fn open_for_append(path: &Path, valid_len: u64) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    if file.metadata()?.len() > valid_len {
        tracing::warn!(
            path = %path.display(),
            valid_len,
            "Truncating torn tail of record log"
        );
        file.set_len(valid_len)?;
    }

    Ok(BufWriter::new(file))
}
