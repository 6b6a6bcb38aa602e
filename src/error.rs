//! Error types for the device detection crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectionError>;

/// Errors raised while loading a dataset or resolving values from it.
///
/// Unmatched input is never an error: the pattern engine answers with
/// [`MatchMethod::None`](crate::MatchMethod::None) and the trie engine with
/// [`DeviceIndex::UNMATCHED`](crate::DeviceIndex::UNMATCHED). Unknown
/// properties resolve to `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// The data file header or a section is malformed. Fatal to loading.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// The data file declares a format version this crate cannot read.
    #[error("Unsupported data format version: {0}")]
    UnsupportedVersion(u32),

    /// A read against an already opened streamed source failed.
    ///
    /// Only the requesting operation fails; the dataset stays usable.
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// A stored payload cannot be represented as the requested type.
    #[error("Value type error: cannot convert '{value}' to {target}")]
    ValueType { value: String, target: &'static str },

    /// The byte source could not be opened.
    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The dataset builder was given inconsistent entities.
    #[error("Dataset build error: {0}")]
    Build(String),
}

impl DetectionError {
    pub(crate) fn value_type(value: impl Into<String>, target: &'static str) -> Self {
        DetectionError::ValueType {
            value: value.into(),
            target,
        }
    }

    /// Re-labels a read failure that happened while a dataset was still being
    /// loaded: at that point a short read means the file itself is malformed.
    pub(crate) fn into_format(self) -> Self {
        match self {
            DetectionError::DataAccess(msg) => DetectionError::DataFormat(msg),
            other => other,
        }
    }

    /// Whether the error leaves the dataset usable for later calls.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DetectionError::DataAccess(_) | DetectionError::ValueType { .. }
        )
    }
}

impl From<std::io::Error> for DetectionError {
    fn from(err: std::io::Error) -> Self {
        DetectionError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for DetectionError {
    fn from(err: serde_yaml::Error) -> Self {
        DetectionError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DetectionError {
    fn from(err: serde_json::Error) -> Self {
        DetectionError::Config(err.to_string())
    }
}
