//! Queries evaluated against the spatial index.
//!
//! A query is asked two questions while the index is walked: at internal nodes whether the
//! subtree can hold a match at all, and at leaves whether the store is a match and whether
//! that answer is exact. Leaf boxes bound a store's whole history, so most leaf answers have
//! to be confirmed against the store itself with [`IndexQuery::recheck`].
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    bbox::BoundingBox,
    error::{Result, VersionedIntError},
    history::HistoryStore,
    timestamp::Timestamp,
};

/// Outcome of testing one node key against a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Consistency {
    pub matches: bool,
    /// The match is only possible; the store must be checked exactly.
    pub recheck: bool,
}

impl Consistency {
    pub const NONE: Consistency = Consistency {
        matches: false,
        recheck: false,
    };
    pub const CERTAIN: Consistency = Consistency {
        matches: true,
        recheck: false,
    };
    pub const POSSIBLE: Consistency = Consistency {
        matches: true,
        recheck: true,
    };
}

pub trait IndexQuery {
    /// Called for leaf keys.
    fn containing(&self, bbox: &BoundingBox) -> Consistency;

    /// Called for internal node keys. `false` prunes the subtree.
    fn intersecting(&self, bbox: &BoundingBox) -> bool;

    /// Exact test against the store behind a leaf.
    fn recheck(&self, store: &HistoryStore) -> bool;
}

/// "Did the integer hold `value` at `time`?" as handed over by the host. Both parts are
/// optional on the wire and must be present to evaluate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub time: Option<Timestamp>,
    pub value: Option<i64>,
}

impl QueryPoint {
    pub fn new(time: Timestamp, value: i64) -> Self {
        Self {
            time: Some(time),
            value: Some(value),
        }
    }

    pub fn resolve(&self) -> Result<PointQuery> {
        let time = self
            .time
            .ok_or(VersionedIntError::MissingQueryField("time"))?;
        let value = self
            .value
            .ok_or(VersionedIntError::MissingQueryField("value"))?;
        Ok(PointQuery { time, value })
    }
}

/// A complete [`QueryPoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointQuery {
    pub time: Timestamp,
    pub value: i64,
}

impl IndexQuery for PointQuery {
    fn containing(&self, bbox: &BoundingBox) -> Consistency {
        let result = if bbox.contains_point(self.time, self.value) {
            Consistency::POSSIBLE
        } else {
            Consistency::NONE
        };
        trace!(query = ?self, ?bbox, ?result, "Point query at leaf");
        result
    }

    fn intersecting(&self, bbox: &BoundingBox) -> bool {
        bbox.contains_point(self.time, self.value)
    }

    fn recheck(&self, store: &HistoryStore) -> bool {
        store.matches_at(self.time, self.value) == Some(true)
    }
}

/// Stores that held a value in `[val_lo, val_hi]` at some instant in `[time_from, time_to]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub time_from: Timestamp,
    pub time_to: Timestamp,
    pub val_lo: i64,
    pub val_hi: i64,
}

impl RangeQuery {
    pub fn new(time: (Timestamp, Timestamp), values: (i64, i64)) -> Self {
        Self {
            time_from: time.0,
            time_to: time.1,
            val_lo: values.0,
            val_hi: values.1,
        }
    }

    /// Every value ever held, at any time.
    pub fn values(val_lo: i64, val_hi: i64) -> Self {
        Self::new((Timestamp::NEG_INFINITY, Timestamp::INFINITY), (val_lo, val_hi))
    }

    fn as_box(&self) -> BoundingBox {
        BoundingBox::new(self.time_from, self.time_to, self.val_lo, self.val_hi)
    }

    fn is_empty(&self) -> bool {
        self.time_from > self.time_to || self.val_lo > self.val_hi
    }
}

impl IndexQuery for RangeQuery {
    fn containing(&self, bbox: &BoundingBox) -> Consistency {
        if !self.intersecting(bbox) {
            return Consistency::NONE;
        }
        // Every value lies in range and the window reaches the latest entry.
        if self.as_box().contains(bbox) {
            Consistency::CERTAIN
        } else {
            Consistency::POSSIBLE
        }
    }

    fn intersecting(&self, bbox: &BoundingBox) -> bool {
        !self.is_empty() && self.as_box().intersects(bbox)
    }

    fn recheck(&self, store: &HistoryStore) -> bool {
        store
            .values_during(self.time_from, self.time_to)
            .any(|v| self.val_lo <= v && v <= self.val_hi)
    }
}
