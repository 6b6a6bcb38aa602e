//! Swapping in a new dataset without pausing detection.
//!
//! Detections take a snapshot of the current provider and keep using it
//! until they finish, so a reload never disturbs a match in flight.

use crate::config::DetectionConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::pattern::PatternProvider;
use crate::result::Match;
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// A [`PatternProvider`] that can be replaced atomically.
#[derive(Debug)]
pub struct ReloadableProvider {
    current: ArcSwap<PatternProvider>,
    generation: AtomicU64,
}

impl ReloadableProvider {
    pub fn new(provider: PatternProvider) -> Self {
        Self {
            current: ArcSwap::from_pointee(provider),
            generation: AtomicU64::new(0),
        }
    }

    /// Open `path` with `config` and build a provider over it.
    pub fn open(path: impl AsRef<Path>, config: &DetectionConfig) -> Result<Self> {
        Ok(Self::new(load_provider(path.as_ref(), config)?))
    }

    /// The provider in use right now.
    pub fn snapshot(&self) -> Arc<PatternProvider> {
        self.current.load_full()
    }

    pub fn detect(&self, input: &str) -> Result<Match> {
        self.snapshot().detect(input)
    }

    /// Install `provider`. Returns the new generation number.
    pub fn replace(&self, provider: PatternProvider) -> u64 {
        self.current.store(Arc::new(provider));
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Load `path` and install it. On failure the current provider stays.
    pub fn reload_from_file(&self, path: impl AsRef<Path>, config: &DetectionConfig) -> Result<u64> {
        let path = path.as_ref();
        let provider = load_provider(path, config)?;
        let generation = self.replace(provider);
        info!(path = %path.display(), generation, "Dataset reloaded");
        Ok(generation)
    }

    /// Number of successful replacements.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

fn load_provider(path: &Path, config: &DetectionConfig) -> Result<PatternProvider> {
    let dataset = Arc::new(Dataset::open(path, config)?);
    PatternProvider::with_config(dataset, config.matching.clone())
}
