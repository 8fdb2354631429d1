//! Ordering of versioned integers by their current value.
//!
//! History never takes part in a comparison. An integer on either side is read as if it were
//! the current value of a store.
use std::cmp::Ordering;

use crate::{error::VersionedIntError, history::HistoryStore};

pub trait CurrentValue {
    /// # Panics
    ///
    /// If there is nothing to compare, i.e. an empty history.
    fn comparison_value(&self) -> i64;
}

impl CurrentValue for HistoryStore {
    fn comparison_value(&self) -> i64 {
        match self.current_value() {
            Some(value) => value,
            None => panic!("{}", VersionedIntError::EmptyHistoryComparison),
        }
    }
}

impl CurrentValue for i64 {
    fn comparison_value(&self) -> i64 {
        *self
    }
}

pub fn compare<A, B>(a: &A, b: &B) -> Ordering
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    a.comparison_value().cmp(&b.comparison_value())
}

/// [`compare`] as the host's `-1`, `0`, `1`.
pub fn cmp_code<A, B>(a: &A, b: &B) -> i32
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    match compare(a, b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

pub fn eq<A, B>(a: &A, b: &B) -> bool
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    compare(a, b).is_eq()
}

pub fn ne<A, B>(a: &A, b: &B) -> bool
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    compare(a, b).is_ne()
}

pub fn gt<A, B>(a: &A, b: &B) -> bool
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    compare(a, b).is_gt()
}

pub fn ge<A, B>(a: &A, b: &B) -> bool
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    compare(a, b).is_ge()
}

pub fn lt<A, B>(a: &A, b: &B) -> bool
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    compare(a, b).is_lt()
}

pub fn le<A, B>(a: &A, b: &B) -> bool
where
    A: CurrentValue + ?Sized,
    B: CurrentValue + ?Sized,
{
    compare(a, b).is_le()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::StoreConfig, context::TransactionContext, error::Result, timestamp::Timestamp};

    fn store(values: &[i64]) -> Result<HistoryStore> {
        let mut store = HistoryStore::new(StoreConfig::default());
        for (i, &value) in values.iter().enumerate() {
            store.append_now(&TransactionContext::at(Timestamp(i as i64)), Some(value))?;
        }
        Ok(store)
    }

    #[test]
    fn only_current_value_counts() -> Result<()> {
        // Very different histories, same current value.
        let a = store(&[100, -100, 3])?;
        let b = store(&[3])?;
        assert_eq!(compare(&a, &b), Ordering::Equal);
        assert!(eq(&a, &b));
        assert!(!ne(&a, &b));
        assert!(ge(&a, &b) && le(&a, &b));
        Ok(())
    }

    #[test]
    fn store_against_store() -> Result<()> {
        let small = store(&[9, 1])?;
        let large = store(&[2])?;
        assert_eq!(cmp_code(&small, &large), -1);
        assert_eq!(cmp_code(&large, &small), 1);
        assert_eq!(cmp_code(&small, &small), 0);
        assert!(lt(&small, &large));
        assert!(gt(&large, &small));
        assert!(!gt(&small, &large));
        Ok(())
    }

    #[test]
    fn store_against_integer() -> Result<()> {
        let s = store(&[5, 7])?;
        assert!(eq(&s, &7_i64));
        assert!(gt(&s, &6_i64));
        assert!(lt(&s, &8_i64));
        assert!(ge(&s, &7_i64) && le(&s, &7_i64));
        assert!(ne(&s, &5_i64));
        assert_eq!(cmp_code(&s, &7_i64), 0);
        assert_eq!(cmp_code(&6_i64, &s), -1);
        Ok(())
    }

    #[test]
    fn sorting_by_current_value() -> Result<()> {
        let mut stores = vec![store(&[1, 30])?, store(&[10])?, store(&[50, 20])?];
        stores.sort_by(|a, b| compare(a, b));
        let current: Vec<i64> = stores.iter().map(|s| s.comparison_value()).collect();
        assert_eq!(current, vec![10, 20, 30]);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "empty history")]
    fn empty_store_panics() {
        let empty = HistoryStore::new(StoreConfig::default());
        let _ = compare(&empty, &1_i64);
    }
}
