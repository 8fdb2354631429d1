//! The time-ordered history of one versioned integer.
//!
//! A [`HistoryStore`] keeps every `(value, time)` observation sorted by time. Its buffer grows
//! by doubling (starting at one slot) and growth always builds a fresh buffer, so a clone taken
//! before an append keeps seeing the old contents. Retention produces right-sized projections.
use std::{iter::FusedIterator, sync::Arc};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    config::StoreConfig,
    context::TransactionContext,
    error::{Result, VersionedIntError},
    timestamp::Timestamp,
};

/// Bytes taken by the store header (total length and count).
pub const HEADER_SIZE: usize = 8;
/// Bytes taken by one entry slot (value and time).
pub const ENTRY_SIZE: usize = 16;

/// Byte size of a buffer with `capacity` slots, `None` on overflow.
pub fn byte_size_for(capacity: usize) -> Option<usize> {
    capacity.checked_mul(ENTRY_SIZE)?.checked_add(HEADER_SIZE)
}

/// One observation: `value` became effective at `time`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: i64,
    pub time: Timestamp,
}

impl HistoryEntry {
    pub fn new(value: i64, time: Timestamp) -> Self {
        Self { value, time }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryStore {
    entries: Arc<Vec<HistoryEntry>>,
    capacity: usize,
    config: StoreConfig,
}

impl HistoryStore {
    /// An empty store with no slots. It has no current value.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entries: Arc::new(Vec::new()),
            capacity: 0,
            config,
        }
    }

    /// A store seeded with one value at the transaction's time.
    pub fn with_value(
        config: StoreConfig,
        ctx: &TransactionContext,
        value: Option<i64>,
    ) -> Result<Self> {
        let mut store = Self::new(config);
        store.append_now(ctx, value)?;
        Ok(store)
    }

    /// Builds a right-sized store from entries that are already sorted by time.
    pub(crate) fn from_sorted(config: StoreConfig, entries: Vec<HistoryEntry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].time <= w[1].time));
        let capacity = entries.len();
        Self {
            entries: Arc::new(entries),
            capacity,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Size of the buffer as laid out by the host: header plus every slot of capacity.
    pub fn byte_size(&self) -> usize {
        byte_size_for(self.capacity).unwrap_or(usize::MAX)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn first(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// The value with the greatest timestamp.
    pub fn current_value(&self) -> Option<i64> {
        self.entries.last().map(|entry| entry.value)
    }

    /// Records `value` at the transaction's time.
    pub fn append_now(&mut self, ctx: &TransactionContext, value: Option<i64>) -> Result<()> {
        let value = value.ok_or(VersionedIntError::ValueRequired)?;
        let time = ctx.now();
        // Entries written at an explicit future time stay ahead of "now".
        let index = match self.entries.last() {
            Some(last) if last.time > time => self.entries.partition_point(|e| e.time <= time),
            _ => self.len(),
        };
        self.insert_entry(index, HistoryEntry::new(value, time))
    }

    /// Records `value` at an explicit time, keeping the history sorted.
    pub fn append_at(&mut self, value: Option<i64>, time: Option<Timestamp>) -> Result<()> {
        let value = value.ok_or(VersionedIntError::ValueRequired)?;
        let time = time.ok_or(VersionedIntError::TimestampRequired)?;
        let index = self.entries.partition_point(|e| e.time < time);
        trace!(value, %time, index, "Inserting entry at explicit time");
        self.insert_entry(index, HistoryEntry::new(value, time))
    }

    fn insert_entry(&mut self, index: usize, entry: HistoryEntry) -> Result<()> {
        let len = self.len();
        debug_assert!(len <= self.capacity, "count {len} exceeds capacity {}", self.capacity);

        if len == self.capacity {
            let new_capacity = if self.capacity == 0 {
                1
            } else {
                self.capacity.saturating_mul(2)
            };
            let requested = byte_size_for(new_capacity).unwrap_or(usize::MAX);
            if requested > self.config.max_bytes {
                warn!(
                    requested,
                    max = self.config.max_bytes,
                    count = len,
                    "Refusing to grow history past the configured maximum"
                );
                return Err(VersionedIntError::CapacityExceeded {
                    requested,
                    max: self.config.max_bytes,
                });
            }

            let mut grown = Vec::with_capacity(new_capacity);
            grown.extend_from_slice(&self.entries[..index]);
            grown.push(entry);
            grown.extend_from_slice(&self.entries[index..]);
            debug!(
                old_capacity = self.capacity,
                new_capacity,
                bytes = requested,
                "Grew history buffer"
            );
            self.entries = Arc::new(grown);
            self.capacity = new_capacity;
        } else {
            Arc::make_mut(&mut self.entries).insert(index, entry);
        }

        Ok(())
    }

    /// The value effective at `time`: the entry with the greatest time not after it.
    pub fn value_at(&self, time: Timestamp) -> Option<i64> {
        let last = self.entries.last()?;
        if time >= last.time {
            return Some(last.value);
        }
        let index = self.entries.partition_point(|e| e.time <= time);
        index.checked_sub(1).map(|i| self.entries[i].value)
    }

    /// `None` when nothing was recorded at or before `time`.
    pub fn matches_at(&self, time: Timestamp, expected: i64) -> Option<bool> {
        self.value_at(time).map(|value| value == expected)
    }

    /// Every value the integer held at some instant in `[from, to]`: the value effective at
    /// `from` followed by each entry recorded in `(from, to]`.
    pub fn values_during(&self, from: Timestamp, to: Timestamp) -> impl Iterator<Item = i64> + '_ {
        let (start, range) = if from > to {
            (None, 0..0)
        } else {
            let lo = self.entries.partition_point(|e| e.time <= from);
            let hi = self.entries.partition_point(|e| e.time <= to);
            (self.value_at(from), lo..hi)
        };
        start
            .into_iter()
            .chain(self.entries[range].iter().map(|e| e.value))
    }

    /// A snapshot iterator over all entries in time order. Later appends to this store do
    /// not affect it.
    pub fn history(&self) -> History {
        History {
            entries: Arc::clone(&self.entries),
            front: 0,
            back: self.entries.len(),
        }
    }

    /// At most the `n` most recent entries.
    pub fn retain_last_n(&self, n: usize) -> HistoryStore {
        let start = self.len().saturating_sub(n);
        if start > 0 {
            debug!(dropped = start, kept = self.len() - start, "Trimmed history to last n");
        }
        self.project(start)
    }

    /// Only the entries newer than `ctx.now() - max_age`.
    pub fn retain_since(&self, ctx: &TransactionContext, max_age: Duration) -> HistoryStore {
        let cutoff = ctx.now().saturating_sub(max_age);
        let start = self.entries.partition_point(|e| e.time <= cutoff);
        if start > 0 {
            debug!(dropped = start, %cutoff, "Trimmed history older than cutoff");
        }
        self.project(start)
    }

    fn project(&self, start: usize) -> HistoryStore {
        if start == 0 && self.capacity == self.len() {
            return self.clone();
        }
        Self::from_sorted(self.config, self.entries[start..].to_vec())
    }
}

/// Host entrypoint for both creating and extending a versioned integer.
///
/// With no `existing` store a new one is started under `config`. An explicit `time` inserts
/// at its sorted position, otherwise the transaction's time is used. The caller's handle is
/// never modified; on error it is still the latest valid state.
pub fn append(
    existing: Option<&HistoryStore>,
    value: Option<i64>,
    time: Option<Timestamp>,
    ctx: &TransactionContext,
    config: StoreConfig,
) -> Result<HistoryStore> {
    let mut store = match existing {
        Some(store) => store.clone(),
        None => HistoryStore::new(config),
    };
    match time {
        Some(time) => store.append_at(value, Some(time))?,
        None => store.append_now(ctx, value)?,
    }
    Ok(store)
}

impl<'a> IntoIterator for &'a HistoryStore {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Resumable iterator returned by [`HistoryStore::history`].
#[derive(Clone, Debug)]
pub struct History {
    entries: Arc<Vec<HistoryEntry>>,
    front: usize,
    back: usize,
}

impl Iterator for History {
    type Item = HistoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let entry = self.entries[self.front];
        self.front += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for History {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.entries[self.back])
    }
}

impl ExactSizeIterator for History {}

impl FusedIterator for History {}
