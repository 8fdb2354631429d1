//! Callbacks a generic host index invokes for versioned integers.
//!
//! The host drives these in the order compress, then union and penalty up the tree, then an
//! optional split. They hold no state between calls.
use tracing::trace;

use crate::{
    bbox::BoundingBox,
    error::{Result, VersionedIntError},
    history::HistoryStore,
    query::{Consistency, IndexQuery, QueryPoint},
    split::{quadratic_split, Split},
};

/// Leaf key for `store`.
pub fn compress(store: &HistoryStore) -> Result<BoundingBox> {
    BoundingBox::from_store(store).ok_or(VersionedIntError::EmptyHistory)
}

/// `None` when `boxes` is empty.
pub fn union(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    BoundingBox::union(boxes)
}

pub fn penalty(existing: &BoundingBox, candidate: &BoundingBox) -> f64 {
    existing.enlargement_cost(candidate)
}

pub fn same(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.same(b)
}

/// Tests a node key against a point query.
///
/// A leaf box bounds the whole history of its store, so a leaf hit always needs a recheck.
/// An internal box is the exact union of its children and a hit only says to descend.
pub fn consistent(bbox: &BoundingBox, is_leaf: bool, query: &QueryPoint) -> Result<Consistency> {
    let point = query.resolve()?;
    let result = if is_leaf {
        point.containing(bbox)
    } else if point.intersecting(bbox) {
        Consistency::CERTAIN
    } else {
        Consistency::NONE
    };
    trace!(?bbox, is_leaf, ?result, "Checked consistency");
    Ok(result)
}

/// Partitions an overflowing node's keys. See [`quadratic_split`].
pub fn split(boxes: &[BoundingBox]) -> Split {
    quadratic_split(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::StoreConfig, timestamp::Timestamp};
    use proptest::prelude::*;

    fn bbox(t: (i64, i64), v: (i64, i64)) -> BoundingBox {
        BoundingBox::new(Timestamp(t.0), Timestamp(t.1), v.0, v.1)
    }

    #[test]
    fn compress_empty_store() {
        let store = HistoryStore::new(StoreConfig::default());
        assert!(matches!(compress(&store), Err(VersionedIntError::EmptyHistory)));
    }

    #[test]
    fn compress_open_ended() -> Result<()> {
        let mut store = HistoryStore::new(StoreConfig::default());
        store.append_at(Some(4), Some(Timestamp(50)))?;
        store.append_at(Some(-4), Some(Timestamp(60)))?;
        let key = compress(&store)?;
        assert_eq!(key, BoundingBox::new(Timestamp(50), Timestamp::INFINITY, -4, 4));

        // Later appends inside the value range keep the key valid.
        store.append_at(Some(0), Some(Timestamp(70)))?;
        assert!(same(&compress(&store)?, &key));
        Ok(())
    }

    #[test]
    fn consistent_leaf_and_internal() -> Result<()> {
        let key = bbox((0, 10), (0, 5));
        let inside = QueryPoint::new(Timestamp(5), 3);
        assert_eq!(consistent(&key, true, &inside)?, Consistency::POSSIBLE);
        assert_eq!(consistent(&key, false, &inside)?, Consistency::CERTAIN);

        let outside = QueryPoint::new(Timestamp(5), 9);
        assert_eq!(consistent(&key, true, &outside)?, Consistency::NONE);
        assert_eq!(consistent(&key, false, &outside)?, Consistency::NONE);

        let partial = QueryPoint {
            time: Some(Timestamp(5)),
            value: None,
        };
        assert!(matches!(
            consistent(&key, true, &partial),
            Err(VersionedIntError::MissingQueryField("value"))
        ));
        Ok(())
    }

    #[test]
    fn penalty_is_non_negative() {
        let boxes = [
            bbox((0, 10), (0, 5)),
            bbox((20, 30), (10, 20)),
            bbox((2, 3), (1, 2)),
            bbox((-5, 40), (-5, 40)),
        ];
        for a in &boxes {
            for b in &boxes {
                let cost = penalty(a, b);
                if a.contains(b) {
                    assert_eq!(cost, 0.0);
                } else {
                    assert!(cost >= 0.0);
                }
            }
        }
    }

    /// Boxes as the index builds them: leaves reach the open upper time bound, subtrees
    /// may or may not.
    fn box_strategy() -> impl Strategy<Value = BoundingBox> {
        (
            -1_000_000i64..1_000_000,
            0i64..100_000,
            any::<bool>(),
            i64::MIN / 4..i64::MAX / 4,
            0i64..1_000_000,
        )
            .prop_map(|(t, w, open, v, h)| {
                let time_hi = if open { Timestamp::INFINITY } else { Timestamp(t + w) };
                BoundingBox::new(Timestamp(t), time_hi, v, v + h)
            })
    }

    /// A box together with one drawn inside it.
    fn nested_strategy() -> impl Strategy<Value = (BoundingBox, BoundingBox)> {
        (box_strategy(), 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0).prop_map(
            |(outer, a, b, c, d)| {
                // Open-ended spans overflow i64, so interpolate in i128.
                let shrink = |lo: i64, hi: i64, f: f64| {
                    let (lo, hi) = (i128::from(lo), i128::from(hi));
                    let offset = ((hi - lo) as f64 * f) as i128;
                    (lo + offset).clamp(lo, hi) as i64
                };
                let inner = BoundingBox::new(
                    Timestamp(shrink(outer.time_lo.0, outer.time_hi.0, a.min(b))),
                    Timestamp(shrink(outer.time_lo.0, outer.time_hi.0, a.max(b))),
                    shrink(outer.val_lo, outer.val_hi, c.min(d)),
                    shrink(outer.val_lo, outer.val_hi, c.max(d)),
                );
                (outer, inner)
            },
        )
    }

    proptest! {
        #[test]
        fn penalty_never_negative(a in box_strategy(), b in box_strategy()) {
            let cost = penalty(&a, &b);
            if a.contains(&b) {
                prop_assert_eq!(cost, 0.0);
            } else {
                prop_assert!(cost >= 0.0, "penalty {} for {:?} absorbing {:?}", cost, a, b);
            }
        }

        #[test]
        fn absorbing_a_contained_box_is_free((outer, inner) in nested_strategy()) {
            prop_assert!(outer.contains(&inner));
            prop_assert_eq!(penalty(&outer, &inner), 0.0);
            prop_assert!(penalty(&inner, &outer) >= 0.0);
        }
    }

    #[test]
    fn union_and_split_delegate() {
        let boxes = [bbox((0, 10), (0, 5)), bbox((20, 30), (10, 20))];
        assert_eq!(union(&boxes), Some(bbox((0, 30), (0, 20))));
        assert_eq!(union(&[]), None);

        let halves = split(&boxes);
        assert_eq!(halves.left, vec![0]);
        assert_eq!(halves.right, vec![1]);
    }
}
