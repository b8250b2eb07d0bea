//! Low-level persistence building blocks.
//!
//! - [`record_log`]: CRC-framed append-only logs with torn-tail recovery
//! - [`atomic`]: temp-file + rename whole-file replacement
//! - [`codec`]: embedding <-> little-endian byte conversion
//! - [`checksum`]: CRC32

pub mod atomic;
pub mod checksum;
pub mod codec;
pub mod record_log;
