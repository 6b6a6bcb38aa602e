//! Unified configuration for dataset loading and matching.
//!
//! This module provides control over how a data file is brought into memory,
//! how large the entity caches are in streamed mode, and the tuning knobs of
//! the pattern engine's fallback tiers.

use crate::cache::CacheConfig;
use crate::error::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a data file is exposed to the matchers.
///
/// | Mode | Load time | Memory | Per-match I/O | Use Case |
/// |------|-----------|--------|---------------|----------|
/// | `Resident` | O(file size) | O(file size) | None | Servers with RAM to spare |
/// | `Streamed` | O(metadata) | Caches plus fragment automata | On cache miss | Constrained hosts |
///
/// Both modes return identical match results for the same input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Decode every record at load time; no I/O afterwards.
    #[default]
    Resident,
    /// Keep the file open and decode records on demand through the caches.
    ///
    /// A [`PatternProvider`](crate::PatternProvider) still reads every node
    /// once when it is built, and its fragment automata stay in memory for
    /// its lifetime. Only the records behind those automata are bounded by
    /// the caches.
    Streamed,
}

/// Distance between an input's node sequence and a candidate signature.
///
/// Used by the nearest and closest fallback tiers. Distances are counted in
/// nodes, never in raw characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Levenshtein distance over node indices (insert, delete, substitute).
    #[default]
    NodeEdit,
    /// Size of the symmetric difference between the two node sets.
    NodeSetDifference,
}

/// Tuning for the pattern engine's fallback tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// How far, in bytes, a fragment may drift from its recorded position
    /// when the numeric tier matches version-like sub-tokens.
    ///
    /// Version numbers change length ("9" vs "10"), which shifts every
    /// following fragment.
    ///
    /// **Default**: 8
    pub numeric_position_tolerance: u32,

    /// Upper bound on signatures scored by the nearest tier.
    ///
    /// Candidates are taken in order of how many input nodes they share.
    ///
    /// **Default**: 200
    pub nearest_candidate_limit: usize,

    /// Metric used by the nearest and closest tiers.
    ///
    /// **Default**: `DistanceMetric::NodeEdit`
    pub distance_metric: DistanceMetric,

    /// Minimum number of inputs before `detect_batch` fans out to rayon.
    ///
    /// **Default**: 16
    pub min_batch_size_for_parallelism: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            numeric_position_tolerance: 8,
            nearest_candidate_limit: 200,
            distance_metric: DistanceMetric::NodeEdit,
            min_batch_size_for_parallelism: 16,
        }
    }
}

/// Top-level configuration.
///
/// # Example
/// ```rust
/// use device_detection::{DetectionConfig, LoadMode};
///
/// let config = DetectionConfig::new()
///     .with_load_mode(LoadMode::Streamed)
///     .with_signature_cache(20_000)
///     .with_nearest_candidate_limit(50);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DetectionConfig {
    /// Resident or streamed loading
    pub load_mode: LoadMode,
    /// Per-kind entity cache capacities (streamed mode only)
    pub cache: CacheConfig,
    /// Pattern engine tuning
    pub matching: MatchConfig,
}

impl DetectionConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Streamed loading with small caches, for hosts where the data file
    /// must not be held in memory.
    pub fn low_memory() -> Self {
        Self {
            load_mode: LoadMode::Streamed,
            cache: CacheConfig {
                values: 500,
                profiles: 500,
                signatures: 2_000,
                nodes: 2_000,
            },
            matching: MatchConfig {
                nearest_candidate_limit: 50,
                ..Default::default()
            },
        }
    }

    /// Resident loading with parallel batch detection kicking in early.
    pub fn high_performance() -> Self {
        Self {
            load_mode: LoadMode::Resident,
            cache: CacheConfig::default(),
            matching: MatchConfig {
                min_batch_size_for_parallelism: 4,
                ..Default::default()
            },
        }
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file; `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Reject settings that would make a tier unable to run.
    pub fn validate(&self) -> Result<()> {
        if self.matching.nearest_candidate_limit == 0 {
            return Err(DetectionError::Config(
                "nearest_candidate_limit must be at least 1".to_string(),
            ));
        }
        if self.matching.min_batch_size_for_parallelism == 0 {
            return Err(DetectionError::Config(
                "min_batch_size_for_parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    // Builder methods

    /// Set the load mode.
    pub fn with_load_mode(mut self, mode: LoadMode) -> Self {
        self.load_mode = mode;
        self
    }

    /// Replace all cache capacities.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Disable every entity cache.
    pub fn without_cache(mut self) -> Self {
        self.cache = CacheConfig::disabled();
        self
    }

    /// Set the signature cache capacity.
    pub fn with_signature_cache(mut self, capacity: usize) -> Self {
        self.cache.signatures = capacity;
        self
    }

    /// Set the node cache capacity.
    pub fn with_node_cache(mut self, capacity: usize) -> Self {
        self.cache.nodes = capacity;
        self
    }

    /// Set the numeric tier's position tolerance.
    pub fn with_numeric_position_tolerance(mut self, tolerance: u32) -> Self {
        self.matching.numeric_position_tolerance = tolerance;
        self
    }

    /// Set the nearest tier's candidate limit.
    pub fn with_nearest_candidate_limit(mut self, limit: usize) -> Self {
        self.matching.nearest_candidate_limit = limit;
        self
    }

    /// Set the distance metric for nearest/closest.
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.matching.distance_metric = metric;
        self
    }
}
