//! The logical "current time" of one host transaction.
use crate::timestamp::Timestamp;

/// Resolved once per transaction and handed to every implicit-time operation, so all
/// appends made under one context record the same timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionContext {
    now: Timestamp,
}

impl TransactionContext {
    /// Starts a transaction at the wall-clock time.
    pub fn begin() -> Self {
        Self::at(Timestamp::now())
    }

    pub fn at(now: Timestamp) -> Self {
        Self { now }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }
}
