//! `AgentDB` Configuration Module
//!
//! Provides configuration file support via `agentdb.toml`, environment variables,
//! and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (API, CLI flags)
//! 2. Environment variables (`AGENTDB_<SECTION>__<KEY>`, e.g. `AGENTDB_HNSW__EF_SEARCH=64`)
//! 3. Configuration file (`agentdb.toml`)
//! 4. Default values

use crate::distance::DistanceMetric;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// HNSW index configuration section.
///
/// This is the plain options record consumed by the index and by the
/// backend's fallback policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Maximum out-degree per node on layers >= 1.
    pub m: usize,
    /// Maximum out-degree per node on layer 0.
    pub m0: usize,
    /// Beam width used while building the graph.
    pub ef_construction: usize,
    /// Beam width used at query time (raised to `k` when smaller).
    pub ef_search: usize,
    /// Below this many stored vectors the backend uses exact search.
    pub min_vectors_for_index: usize,
    /// Whether the backend may route queries through the index at all.
    pub enabled: bool,
    /// Seed for level assignment. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m0: 32,
            ef_construction: 200,
            ef_search: 50,
            min_vectors_for_index: 1000,
            enabled: true,
            seed: None,
        }
    }
}

/// Search configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Metric used to rank results returned to callers.
    pub metric: DistanceMetric,
    /// The index is asked for `k * rerank_multiplier` candidates before re-ranking.
    pub rerank_multiplier: usize,
    /// Maximum results per query.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            rerank_multiplier: 2,
            max_results: 1000,
        }
    }
}

/// Storage configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory path.
    pub data_dir: String,
    /// fsync after every durable write (graph WAL and vector log).
    pub sync_writes: bool,
    /// Fold the graph WAL and compact the vector log automatically.
    pub auto_compact: bool,
    /// Logs smaller than this are never compacted automatically.
    pub compaction_min_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./agentdb_data".to_string(),
            sync_writes: false,
            auto_compact: true,
            compaction_min_bytes: 4 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    /// Size at which the stores compact themselves, `u64::MAX` when
    /// automatic compaction is off.
    #[must_use]
    pub const fn compaction_threshold(&self) -> u64 {
        if self.auto_compact {
            self.compaction_min_bytes
        } else {
            u64::MAX
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
    /// Log format: text or json.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main `AgentDB` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentDbConfig {
    /// HNSW index configuration.
    pub hnsw: HnswConfig,
    /// Search configuration.
    pub search: SearchConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl AgentDbConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("agentdb.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("AGENTDB_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hnsw.validate()?;

        if self.search.rerank_multiplier == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.rerank_multiplier".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.max_results".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl HnswConfig {
    /// Validates the index parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for non-positive beam widths,
    /// `m < 2` (`ln(m)` is zero or negative) or `m0 < m`.
    ///
    /// `m = 2` is accepted but degenerate: the per-trial level probability
    /// `1 / ln(2)` exceeds one, so every node is drawn at `MAX_LEVEL`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.m < 2 {
            return Err(ConfigError::InvalidValue {
                key: "hnsw.m".to_string(),
                message: format!("value {} must be >= 2", self.m),
            });
        }

        if self.m0 < self.m {
            return Err(ConfigError::InvalidValue {
                key: "hnsw.m0".to_string(),
                message: format!("value {} must be >= hnsw.m ({})", self.m0, self.m),
            });
        }

        if self.ef_construction == 0 {
            return Err(ConfigError::InvalidValue {
                key: "hnsw.ef_construction".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if self.ef_search == 0 {
            return Err(ConfigError::InvalidValue {
                key: "hnsw.ef_search".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        Ok(())
    }
}
