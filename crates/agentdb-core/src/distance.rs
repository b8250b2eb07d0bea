//! Distance metrics for vector similarity calculations.
//!
//! Two views of the same metric are exposed:
//!
//! - [`DistanceMetric::calculate`] returns the natural score (cosine similarity,
//!   L2 distance, inner product) used to rank results for callers.
//! - [`DistanceMetric::distance`] returns a lower-is-better dissimilarity used
//!   inside the HNSW graph, where every comparison assumes "smaller is closer".

use crate::simd;
use serde::{Deserialize, Serialize};

/// Distance metric for vector similarity calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity. Best for normalized text embeddings.
    #[default]
    Cosine,

    /// Euclidean distance (L2 norm). Default metric inside the index layer.
    Euclidean,

    /// Dot product (inner product), for maximum inner product search.
    #[serde(alias = "dot")]
    DotProduct,
}

impl DistanceMetric {
    /// Calculates the natural score between two vectors.
    ///
    /// Higher is more similar for `Cosine` and `DotProduct`; lower is more
    /// similar for `Euclidean`.
    ///
    /// # Panics
    ///
    /// Panics if vectors have different dimensions.
    #[must_use]
    #[inline]
    pub fn calculate(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => simd::cosine_similarity(a, b),
            Self::Euclidean => simd::euclidean_distance(a, b),
            Self::DotProduct => simd::dot_product(a, b),
        }
    }

    /// Lower-is-better dissimilarity between two vectors.
    ///
    /// - `Cosine`: `1 - cos(a, b)`, in `[0, 2]`
    /// - `Euclidean`: L2 distance
    /// - `DotProduct`: `-(a · b)`
    ///
    /// # Panics
    ///
    /// Panics if vectors have different dimensions.
    #[must_use]
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => 1.0 - simd::cosine_similarity(a, b),
            Self::Euclidean => simd::euclidean_distance(a, b),
            Self::DotProduct => -simd::dot_product(a, b),
        }
    }

    /// Returns whether higher [`calculate`](Self::calculate) values indicate more similarity.
    #[must_use]
    pub const fn higher_is_better(&self) -> bool {
        match self {
            Self::Cosine | Self::DotProduct => true,
            Self::Euclidean => false,
        }
    }

    /// Sorts `(id, score)` pairs best-first according to the metric.
    pub fn sort_results<T>(&self, results: &mut [(T, f32)]) {
        if self.higher_is_better() {
            results.sort_by(|a, b| b.1.total_cmp(&a.1));
        } else {
            results.sort_by(|a, b| a.1.total_cmp(&b.1));
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dot_product",
        };
        f.write_str(name)
    }
}
