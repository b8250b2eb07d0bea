//! Error types for `AgentDB`.
//!
//! A single error enum covers the vector store, the graph store and the HNSW
//! index so that callers only ever match on one type.

use thiserror::Error;

/// Result type alias for `AgentDB` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `AgentDB` operations.
///
/// Error codes follow the pattern `AGENTDB-XXX`.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration (AGENTDB-001).
    ///
    /// Raised at construction time; parameters are never clamped silently.
    #[error("[AGENTDB-001] Configuration error: {0}")]
    Config(String),

    /// Dimension mismatch (AGENTDB-002).
    #[error("[AGENTDB-002] Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Invalid vector (AGENTDB-003).
    #[error("[AGENTDB-003] Invalid vector: {0}")]
    InvalidVector(String),

    /// Vector not found (AGENTDB-004).
    #[error("[AGENTDB-004] Vector with ID '{0}' not found")]
    VectorNotFound(String),

    /// Storage error (AGENTDB-005).
    #[error("[AGENTDB-005] Storage error: {0}")]
    Storage(String),

    /// Index error (AGENTDB-006).
    #[error("[AGENTDB-006] Index error: {0}")]
    Index(String),

    /// Index corrupted (AGENTDB-007).
    ///
    /// The persisted graph failed validation and must be rebuilt.
    #[error("[AGENTDB-007] Index corrupted: {0}")]
    IndexCorrupted(String),

    /// IO error (AGENTDB-008).
    #[error("[AGENTDB-008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (AGENTDB-009).
    #[error("[AGENTDB-009] Serialization error: {0}")]
    Serialization(String),

    /// Internal error (AGENTDB-010).
    #[error("[AGENTDB-010] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "AGENTDB-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "AGENTDB-001",
            Self::DimensionMismatch { .. } => "AGENTDB-002",
            Self::InvalidVector(_) => "AGENTDB-003",
            Self::VectorNotFound(_) => "AGENTDB-004",
            Self::Storage(_) => "AGENTDB-005",
            Self::Index(_) => "AGENTDB-006",
            Self::IndexCorrupted(_) => "AGENTDB-007",
            Self::Io(_) => "AGENTDB-008",
            Self::Serialization(_) => "AGENTDB-009",
            Self::Internal(_) => "AGENTDB-010",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Corruption and internal errors require a rebuild or a bug report;
    /// everything else can be retried or fixed by the caller.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IndexCorrupted(_) | Self::Internal(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
