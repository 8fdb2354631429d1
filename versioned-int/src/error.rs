//! Error types for the versioned-int library.
use thiserror::Error;

/// The primary error type for operations within this library.
#[derive(Error, Debug)]
pub enum VersionedIntError {
    /// An append was called without a value. Nothing is written.
    #[error("A value is required to append to a versioned int")]
    ValueRequired,

    /// An explicit-timestamp append was called without a timestamp. Nothing is written.
    #[error("A timestamp is required for an explicit-time append")]
    TimestampRequired,

    /// Growing the entry buffer would exceed the configured maximum byte size.
    /// The store is left untouched and remains usable.
    #[error("Growing history to {requested} bytes would exceed the maximum of {max} bytes")]
    CapacityExceeded { requested: usize, max: usize },

    /// A structured query point is missing one of its components.
    #[error("Query point is missing its {0} component")]
    MissingQueryField(&'static str),

    /// A retention policy selector outside the known set.
    #[error("Unknown retention policy selector '{0}'")]
    UnknownRetentionPolicy(char),

    /// An empty history was compared. This is a caller contract violation and is raised
    /// as a panic by the ordering operators; the variant exists so the message is shared.
    #[error("Cannot compare a versioned int with an empty history")]
    EmptyHistoryComparison,

    /// An operation that needs at least one entry was handed an empty history.
    #[error("Versioned int has no history")]
    EmptyHistory,

    /// The binary representation of a store could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid JSON for [`crate::Config`].
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience type alias for `Result<T, VersionedIntError>`.
pub type Result<T, E = VersionedIntError> = std::result::Result<T, E>;
