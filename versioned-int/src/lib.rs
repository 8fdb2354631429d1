//! A versioned integer: a scalar that keeps every `(value, time)` it has held, answers
//! point-in-time lookups, trims its history by retention policy, and can be indexed by the
//! rectangle its history covers in (time, value) space.
mod bbox;
mod codec;
mod config;
mod context;
mod error;
pub mod gist;
mod history;
mod index;
pub mod ordering;
mod query;
mod retention;
mod split;
mod timestamp;

pub use bbox::BoundingBox;
pub use codec::{decode, encode};
pub use config::{Config, IndexConfig, StoreConfig, DEFAULT_MAX_BYTES, DEFAULT_MAX_FANOUT};
pub use context::TransactionContext;
pub use error::{Result, VersionedIntError};
pub use history::{append, History, HistoryEntry, HistoryStore, ENTRY_SIZE, HEADER_SIZE};
pub use index::{Candidate, IndexNode, SpatialIndex};
pub use query::{Consistency, IndexQuery, PointQuery, QueryPoint, RangeQuery};
pub use retention::{apply_retention, RetentionPolicy, KEEP_LAST_N_SELECTOR, KEEP_SINCE_SELECTOR};
pub use split::{quadratic_split, Side, Split};
pub use timestamp::{Timestamp, HOST_EPOCH_UNIX_MICROS};
