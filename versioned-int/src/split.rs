//! Quadratic node splitting.
//!
//! Seeds are the pair of boxes that would waste the most area if kept together. Every other
//! box then joins whichever group it enlarges least, updating that group's box as it goes.
//! No minimum fill is enforced beyond both groups being non-empty.
use tracing::{debug, trace};

use crate::bbox::BoundingBox;

/// Which group an input box was assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Result of splitting an overflowing node. Groups hold indices into the input slice.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub left_box: BoundingBox,
    pub right_box: BoundingBox,
}

impl Split {
    /// Side of every input box, by input position.
    pub fn sides(&self) -> Vec<Side> {
        let mut sides = vec![Side::Left; self.left.len() + self.right.len()];
        for &i in &self.right {
            sides[i] = Side::Right;
        }
        sides
    }
}

/// Area that would be wasted by grouping `a` and `b`.
fn waste(a: &BoundingBox, b: &BoundingBox) -> f64 {
    a.extend(b).area() - a.area() - b.area()
}

fn pick_seeds(boxes: &[BoundingBox]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_waste = f64::NEG_INFINITY;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let w = waste(&boxes[i], &boxes[j]);
            if w > best_waste {
                best_waste = w;
                best = (i, j);
            }
        }
    }
    trace!(seeds = ?best, waste = best_waste, "Picked split seeds");
    best
}

/// Partitions `boxes` into two non-empty groups.
///
/// # Panics
///
/// If fewer than two boxes are given; a node only splits when it overflows.
pub fn quadratic_split(boxes: &[BoundingBox]) -> Split {
    assert!(
        boxes.len() >= 2,
        "quadratic split needs at least two boxes, got {}",
        boxes.len()
    );

    let (seed_left, seed_right) = pick_seeds(boxes);
    let mut left = vec![seed_left];
    let mut right = vec![seed_right];
    let mut left_box = boxes[seed_left];
    let mut right_box = boxes[seed_right];

    for (i, candidate) in boxes.iter().enumerate() {
        if i == seed_left || i == seed_right {
            continue;
        }
        let grow_left = left_box.enlargement_cost(candidate);
        let grow_right = right_box.enlargement_cost(candidate);
        let side = if grow_left < grow_right {
            Side::Left
        } else if grow_right < grow_left {
            Side::Right
        } else if right_box.area() < left_box.area() {
            Side::Right
        } else {
            Side::Left
        };
        trace!(index = i, grow_left, grow_right, ?side, "Assigned box");
        match side {
            Side::Left => {
                left.push(i);
                left_box = left_box.extend(candidate);
            }
            Side::Right => {
                right.push(i);
                right_box = right_box.extend(candidate);
            }
        }
    }

    debug!(
        total = boxes.len(),
        left = left.len(),
        right = right.len(),
        "Split node"
    );
    Split {
        left,
        right,
        left_box,
        right_box,
    }
}
