//! Rectangles in (time, value) space.
use serde::{Deserialize, Serialize};

use crate::{history::HistoryStore, timestamp::Timestamp};

/// Index key summarising one store or one subtree. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub time_lo: Timestamp,
    pub time_hi: Timestamp,
    pub val_lo: i64,
    pub val_hi: i64,
}

impl BoundingBox {
    pub fn new(time_lo: Timestamp, time_hi: Timestamp, val_lo: i64, val_hi: i64) -> Self {
        Self {
            time_lo,
            time_hi,
            val_lo,
            val_hi,
        }
    }

    /// A degenerate box covering one point.
    pub fn point(time: Timestamp, value: i64) -> Self {
        Self::new(time, time, value, value)
    }

    /// Compresses a store into its leaf box: from the earliest entry to the open upper
    /// bound, spanning every value the store has held. `None` for an empty store.
    pub fn from_store(store: &HistoryStore) -> Option<Self> {
        let first = store.first()?;
        let mut val_lo = first.value;
        let mut val_hi = first.value;
        for entry in store {
            val_lo = val_lo.min(entry.value);
            val_hi = val_hi.max(entry.value);
        }
        Some(Self::new(first.time, Timestamp::INFINITY, val_lo, val_hi))
    }

    /// Smallest box containing both.
    pub fn extend(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            time_lo: self.time_lo.min(other.time_lo),
            time_hi: self.time_hi.max(other.time_hi),
            val_lo: self.val_lo.min(other.val_lo),
            val_hi: self.val_hi.max(other.val_hi),
        }
    }

    /// Union of all boxes, `None` if there are none.
    pub fn union<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        let mut boxes = boxes.into_iter();
        let first = *boxes.next()?;
        Some(boxes.fold(first, |acc, b| acc.extend(b)))
    }

    pub fn contains_point(&self, time: Timestamp, value: i64) -> bool {
        self.time_lo <= time && time <= self.time_hi && self.val_lo <= value && value <= self.val_hi
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.time_lo <= other.time_lo
            && other.time_hi <= self.time_hi
            && self.val_lo <= other.val_lo
            && other.val_hi <= self.val_hi
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.time_lo <= other.time_hi
            && other.time_lo <= self.time_hi
            && self.val_lo <= other.val_hi
            && other.val_lo <= self.val_hi
    }

    /// Relative size used for penalty and split decisions. Boxes reaching the open upper
    /// bound get a very large, still finite, time extent.
    pub fn area(&self) -> f64 {
        let width = self.time_hi.0 as f64 - self.time_lo.0 as f64;
        let height = self.val_hi as f64 - self.val_lo as f64;
        width * height
    }

    /// How much this box grows if it absorbs `candidate`.
    pub fn enlargement_cost(&self, candidate: &BoundingBox) -> f64 {
        self.extend(candidate).area() - self.area()
    }

    pub fn same(&self, other: &BoundingBox) -> bool {
        self == other
    }
}
