//! # Device Detection Engine
//!
//! Identifies the hardware, platform, browser and crawler behind a
//! User-Agent string by matching it against a precompiled binary dataset,
//! and returns strongly typed property values for the matched device.
//!
//! Two matchers share one entity model:
//!
//! - [`PatternProvider`] splits the input into known fragments and looks the
//!   result up among ranked signatures, falling back through numeric,
//!   nearest and closest matching before giving up with the default
//!   profiles.
//! - [`TrieProvider`] walks a byte trie straight to a device index. Faster
//!   and smaller, but with no fallbacks.
//!
//! A [`Dataset`] is either decoded fully into memory
//! ([`LoadMode::Resident`]) or read on demand from the open file through
//! bounded LRU caches ([`LoadMode::Streamed`]). Both modes produce identical
//! results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use device_detection::{Dataset, DetectionConfig, PatternProvider};
//! use std::sync::Arc;
//!
//! let config = DetectionConfig::default();
//! let dataset = Arc::new(Dataset::open("devices.dat", &config)?);
//! let provider = PatternProvider::with_config(dataset, config.matching.clone())?;
//!
//! let result = provider.detect(
//!     "Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X) AppleWebKit/536.26 \
//!      (KHTML, like Gecko) Version/6.0 Mobile/10A5376e Safari/8536.25",
//! )?;
//!
//! println!("method: {}", result.method());
//! if let Some(is_mobile) = result.values("IsMobile")? {
//!     println!("mobile: {}", is_mobile.to_bool()?);
//! }
//! # Ok::<(), device_detection::DetectionError>(())
//! ```
//!
//! ### Streamed Loading
//!
//! ```rust,no_run
//! use device_detection::{Dataset, DetectionConfig, LoadMode};
//!
//! let config = DetectionConfig::low_memory().with_signature_cache(5_000);
//! assert_eq!(config.load_mode, LoadMode::Streamed);
//!
//! let dataset = Dataset::open("devices.dat", &config)?;
//! println!("{} signatures", dataset.signature_count());
//! # Ok::<(), device_detection::DetectionError>(())
//! ```
//!
//! ### Trie Matching
//!
//! ```rust,no_run
//! use device_detection::{Dataset, TrieProvider};
//! use std::sync::Arc;
//!
//! let dataset = Arc::new(Dataset::from_bytes(std::fs::read("devices-trie.dat")?)?);
//! let trie = TrieProvider::new(dataset)?;
//!
//! let device = trie.device_index("Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X)")?;
//! let width = trie.property_value(device, "ScreenPixelsWidth")?;
//! println!("{device}: {width:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod entities;
pub mod error;
pub mod format;
pub mod overrides;
pub mod pattern;
pub mod reload;
pub mod result;
pub mod store;
pub mod trie;
pub mod values;

// Loading and configuration
pub use cache::{CacheConfig, CacheStats};
pub use config::{DetectionConfig, DistanceMetric, LoadMode, MatchConfig};
pub use dataset::{Dataset, DatasetCounts};

// Core types and errors
pub use entities::{Component, Node, Profile, Property, PropertyValueType, Signature, Value};
pub use error::{DetectionError, Result};

// Matchers and results
pub use pattern::{PatternProvider, ProviderStats};
pub use reload::ReloadableProvider;
pub use result::{Match, MatchCost, MatchMethod, MatchSummary};
pub use trie::{DeviceIndex, TrieProvider};
pub use values::Values;
