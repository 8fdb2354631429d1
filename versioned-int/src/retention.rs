//! Retention policies that trim old history.
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    context::TransactionContext,
    error::{Result, VersionedIntError},
    history::HistoryStore,
};

/// Selector for [`RetentionPolicy::KeepLastN`].
pub const KEEP_LAST_N_SELECTOR: char = 'n';
/// Selector for [`RetentionPolicy::KeepSince`]; the magnitude is in seconds.
pub const KEEP_SINCE_SELECTOR: char = 's';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep only the `n` most recent entries.
    KeepLastN(u32),
    /// Keep only entries younger than the duration, measured from the transaction's time.
    KeepSince(#[serde(with = "serde_seconds")] Duration),
}

// Durations are written as whole seconds.
mod serde_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        Duration::try_seconds(seconds)
            .ok_or_else(|| serde::de::Error::custom(format!("duration of {seconds}s is out of range")))
    }
}

impl RetentionPolicy {
    /// Decodes the host's `(selector, magnitude)` pair.
    pub fn from_selector(selector: char, magnitude: u32) -> Result<Self> {
        match selector {
            KEEP_LAST_N_SELECTOR => Ok(Self::KeepLastN(magnitude)),
            KEEP_SINCE_SELECTOR => Ok(Self::KeepSince(Duration::seconds(magnitude.into()))),
            other => Err(VersionedIntError::UnknownRetentionPolicy(other)),
        }
    }

    pub fn apply(&self, store: &HistoryStore, ctx: &TransactionContext) -> HistoryStore {
        debug!(policy = ?self, count = store.len(), "Applying retention policy");
        match *self {
            Self::KeepLastN(n) => store.retain_last_n(n as usize),
            Self::KeepSince(max_age) => store.retain_since(ctx, max_age),
        }
    }
}

/// Host entrypoint: trims `store` according to `policy`.
pub fn apply_retention(
    store: &HistoryStore,
    policy: RetentionPolicy,
    ctx: &TransactionContext,
) -> HistoryStore {
    policy.apply(store, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::StoreConfig, timestamp::Timestamp};

    const SECOND: i64 = 1_000_000;

    fn sample() -> Result<HistoryStore> {
        let mut store = HistoryStore::new(StoreConfig::default());
        for i in 1..=5 {
            store.append_at(Some(i * 10), Some(Timestamp(i * 60 * SECOND)))?;
        }
        Ok(store)
    }

    #[test]
    fn decode_selectors() -> Result<()> {
        assert_eq!(
            RetentionPolicy::from_selector('n', 3)?,
            RetentionPolicy::KeepLastN(3)
        );
        assert_eq!(
            RetentionPolicy::from_selector('s', 90)?,
            RetentionPolicy::KeepSince(Duration::seconds(90))
        );
        assert!(matches!(
            RetentionPolicy::from_selector('x', 1),
            Err(VersionedIntError::UnknownRetentionPolicy('x'))
        ));
        Ok(())
    }

    #[test]
    fn keep_last_n() -> Result<()> {
        let store = sample()?;
        let ctx = TransactionContext::at(Timestamp(300 * SECOND));
        let trimmed = apply_retention(&store, RetentionPolicy::KeepLastN(2), &ctx);
        let values: Vec<i64> = trimmed.history().map(|e| e.value).collect();
        assert_eq!(values, vec![40, 50]);
        assert_eq!(trimmed.capacity(), 2);
        Ok(())
    }

    #[test]
    fn keep_since() -> Result<()> {
        let store = sample()?;
        // Entries at 1..=5 minutes; now is 5 minutes, keep the last 150 seconds.
        let ctx = TransactionContext::at(Timestamp(300 * SECOND));
        let policy = RetentionPolicy::from_selector('s', 150)?;
        let trimmed = apply_retention(&store, policy, &ctx);
        let values: Vec<i64> = trimmed.history().map(|e| e.value).collect();
        assert_eq!(values, vec![30, 40, 50]);

        let again = apply_retention(&trimmed, policy, &ctx);
        assert_eq!(again, trimmed);
        Ok(())
    }

    #[test]
    fn policy_serde() -> anyhow::Result<()> {
        let policy = RetentionPolicy::KeepLastN(7);
        let json = serde_json::to_string(&policy)?;
        assert_eq!(json, r#"{"keep_last_n":7}"#);
        assert_eq!(serde_json::from_str::<RetentionPolicy>(&json)?, policy);

        let policy = RetentionPolicy::KeepSince(Duration::hours(1));
        let json = serde_json::to_string(&policy)?;
        assert_eq!(json, r#"{"keep_since":3600}"#);
        assert_eq!(serde_json::from_str::<RetentionPolicy>(&json)?, policy);
        Ok(())
    }
}
