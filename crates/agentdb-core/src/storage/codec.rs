//! Conversion between `f32` embeddings and their on-disk byte form.
//!
//! Embeddings are stored as little-endian `f32` values regardless of the host
//! byte order so snapshots stay portable.

use crate::error::{Error, Result};

/// Encodes an embedding as little-endian bytes.
#[must_use]
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(embedding));
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes little-endian bytes produced by [`embedding_to_bytes`].
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the length is not a multiple of 4.
pub fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::Serialization(format!(
            "embedding byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
