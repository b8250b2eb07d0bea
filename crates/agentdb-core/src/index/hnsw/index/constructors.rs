//! `HnswIndex` constructors.

use super::{GraphState, HnswIndex};
use crate::config::HnswConfig;
use crate::error::Result;
use crate::index::hnsw::graph_store::GraphStore;
use crate::index::hnsw::params::HnswParams;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

impl<S: GraphStore> HnswIndex<S> {
    /// Creates an index over `store` with an entropy-seeded level generator.
    ///
    /// An existing graph in `store` is used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `params` are invalid.
    pub fn new(store: S, params: HnswParams) -> Result<Self> {
        Self::with_rng(store, params, Box::new(StdRng::from_entropy()))
    }

    /// Creates an index whose level draws are fully determined by `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `params` are invalid.
    pub fn with_seed(store: S, params: HnswParams, seed: u64) -> Result<Self> {
        let mut index = Self::with_rng(store, params, Box::new(StdRng::seed_from_u64(seed)))?;
        index.seed = Some(seed);
        Ok(index)
    }

    /// Creates an index drawing levels from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `params` are invalid.
    pub fn with_rng(
        store: S,
        params: HnswParams,
        rng: Box<dyn RngCore + Send + Sync>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            store,
            state: GraphState::Ready,
            rng,
            seed: None,
        })
    }

    /// Creates an index from the `[hnsw]` configuration section, honoring its
    /// optional seed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the section is invalid.
    pub fn from_config(store: S, config: &HnswConfig) -> Result<Self> {
        let params = HnswParams::from_config(config)?;
        match config.seed {
            Some(seed) => Self::with_seed(store, params, seed),
            None => Self::new(store, params),
        }
    }

    pub(crate) fn reseed(&mut self) {
        if let Some(seed) = self.seed {
            self.rng = Box::new(StdRng::seed_from_u64(seed));
        }
    }
}
