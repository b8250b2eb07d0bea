//! HNSW index parameters.

use crate::config::HnswConfig;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Highest layer a node may be assigned to. Bounds worst-case descent and
/// construction cost regardless of how the level draws fall.
pub const MAX_LEVEL: usize = 16;

/// HNSW index parameters for tuning performance and recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Maximum out-degree on layers >= 1 (M).
    pub m: usize,
    /// Maximum out-degree on layer 0 (M0).
    pub m0: usize,
    /// Beam width while inserting.
    pub ef_construction: usize,
    /// Beam width while searching (raised to `k` when smaller).
    pub ef_search: usize,
    /// Graph distance. Euclidean unless the caller needs otherwise.
    pub metric: DistanceMetric,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            m0: 32,
            ef_construction: 200,
            ef_search: 50,
            metric: DistanceMetric::Euclidean,
        }
    }
}

impl HnswParams {
    /// Creates validated parameters with the default Euclidean metric.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value is out of range.
    pub fn new(m: usize, m0: usize, ef_construction: usize, ef_search: usize) -> Result<Self> {
        let params = Self {
            m,
            m0,
            ef_construction,
            ef_search,
            metric: DistanceMetric::Euclidean,
        };
        params.validate()?;
        Ok(params)
    }

    /// Builds parameters from the `[hnsw]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the section fails validation.
    pub fn from_config(config: &HnswConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            m: config.m,
            m0: config.m0,
            ef_construction: config.ef_construction,
            ef_search: config.ef_search,
            metric: DistanceMetric::Euclidean,
        })
    }

    /// Returns a copy using `metric` as the graph distance.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for `m < 2`, `m0 < m` or a zero beam width.
    pub fn validate(&self) -> Result<()> {
        HnswConfig {
            m: self.m,
            m0: self.m0,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            ..HnswConfig::default()
        }
        .validate()
        .map_err(Error::from)
    }

    /// Degree cap for `level`: `m0` on the base layer, `m` above it.
    #[must_use]
    pub const fn max_degree(&self, level: usize) -> usize {
        if level == 0 {
            self.m0
        } else {
            self.m
        }
    }

    /// Success probability of each Bernoulli trial when drawing a level.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn level_probability(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }
}
