//! An R-tree over the (time, value) boxes of many history stores.
//!
//! Leaves hold a host key for a store together with the store's compressed box; the stores
//! themselves stay with the host. Every internal node's box is the exact union of its
//! children and all leaves sit at the same depth.
use tracing::{debug, trace};

use crate::{
    bbox::BoundingBox,
    config::IndexConfig,
    error::{Result, VersionedIntError},
    history::HistoryStore,
    query::IndexQuery,
    split::{quadratic_split, Side},
};

#[derive(Clone, Debug, PartialEq)]
pub enum IndexNode<K> {
    Leaf {
        key: K,
        bbox: BoundingBox,
    },
    Internal {
        children: Vec<IndexNode<K>>,
        bbox: BoundingBox,
    },
}

impl<K> IndexNode<K> {
    pub fn bbox(&self) -> &BoundingBox {
        match self {
            IndexNode::Leaf { bbox, .. } | IndexNode::Internal { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, IndexNode::Leaf { .. })
    }

    /// Internal levels from this node down to the leaves.
    pub fn height(&self) -> usize {
        match self {
            IndexNode::Leaf { .. } => 0,
            IndexNode::Internal { children, .. } => 1 + children.first().map_or(0, Self::height),
        }
    }
}

/// A search hit. When `recheck` is set the host has to confirm it against the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate<'a, K> {
    pub key: &'a K,
    pub recheck: bool,
}

#[derive(Clone, Debug)]
pub struct SpatialIndex<K> {
    config: IndexConfig,
    root: Option<IndexNode<K>>,
    len: usize,
}

impl<K> SpatialIndex<K> {
    /// Fails with [`VersionedIntError::InvalidConfig`] if the fan-out cannot be split.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            root: None,
            len: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, IndexNode::height)
    }

    pub fn root(&self) -> Option<&IndexNode<K>> {
        self.root.as_ref()
    }

    pub fn root_box(&self) -> Option<BoundingBox> {
        self.root.as_ref().map(|root| *root.bbox())
    }

    /// Indexes `store` under `key`. Fails with [`VersionedIntError::EmptyHistory`] if the
    /// store has no entries, leaving the index unchanged.
    pub fn insert(&mut self, key: K, store: &HistoryStore) -> Result<()> {
        let bbox = BoundingBox::from_store(store).ok_or(VersionedIntError::EmptyHistory)?;
        self.insert_box(key, bbox);
        Ok(())
    }

    fn insert_box(&mut self, key: K, bbox: BoundingBox) {
        let leaf = IndexNode::Leaf { key, bbox };
        self.root = Some(match self.root.take() {
            None => IndexNode::Internal {
                children: vec![leaf],
                bbox,
            },
            Some(mut root) => {
                let sibling = match &mut root {
                    IndexNode::Internal { children, bbox } => {
                        insert_into(children, bbox, leaf, self.config.max_fanout)
                    }
                    // The root is always internal.
                    IndexNode::Leaf { .. } => Some(leaf),
                };
                match sibling {
                    None => root,
                    Some(sibling) => {
                        let bbox = root.bbox().extend(sibling.bbox());
                        debug!(height = root.height() + 1, "Grew index root");
                        IndexNode::Internal {
                            children: vec![root, sibling],
                            bbox,
                        }
                    }
                }
            }
        });
        self.len += 1;
    }

    /// Keys whose boxes are consistent with `query`, in tree order.
    pub fn search<Q: IndexQuery + ?Sized>(&self, query: &Q) -> Vec<Candidate<'_, K>> {
        let mut hits = Vec::new();
        if let Some(root) = &self.root {
            search_node(root, query, &mut hits);
        }
        trace!(hits = hits.len(), "Searched index");
        hits
    }
}

impl<K: PartialEq> SpatialIndex<K> {
    /// Drops the leaf for `key`. Returns whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(mut root) = self.root.take() else {
            return false;
        };
        let removed = match &mut root {
            IndexNode::Internal { children, bbox } => remove_from(children, bbox, key),
            IndexNode::Leaf { .. } => false,
        };
        self.root = collapse(root);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Re-indexes `key` after its store changed. The old leaf is only dropped once the new
    /// box is known.
    pub fn update(&mut self, key: K, store: &HistoryStore) -> Result<()> {
        let bbox = BoundingBox::from_store(store).ok_or(VersionedIntError::EmptyHistory)?;
        self.remove(&key);
        self.insert_box(key, bbox);
        Ok(())
    }
}

/// Least enlargement first, then smallest box, then earliest child.
fn choose_child<K>(children: &[IndexNode<K>], candidate: &BoundingBox) -> usize {
    let mut best = 0;
    let mut best_cost = f64::INFINITY;
    let mut best_area = f64::INFINITY;
    for (i, child) in children.iter().enumerate() {
        let cost = child.bbox().enlargement_cost(candidate);
        let area = child.bbox().area();
        if cost < best_cost || (cost == best_cost && area < best_area) {
            best = i;
            best_cost = cost;
            best_area = area;
        }
    }
    trace!(child = best, penalty = best_cost, "Chose subtree");
    best
}

/// Adds `leaf` below the node owning `children`. Returns the new sibling if that node split.
fn insert_into<K>(
    children: &mut Vec<IndexNode<K>>,
    bbox: &mut BoundingBox,
    leaf: IndexNode<K>,
    max_fanout: usize,
) -> Option<IndexNode<K>> {
    *bbox = bbox.extend(leaf.bbox());

    let extra = if children.first().map_or(true, IndexNode::is_leaf) {
        Some(leaf)
    } else {
        let i = choose_child(children, leaf.bbox());
        match &mut children[i] {
            IndexNode::Internal {
                children: grandchildren,
                bbox: child_box,
            } => insert_into(grandchildren, child_box, leaf, max_fanout),
            IndexNode::Leaf { .. } => Some(leaf),
        }
    };
    if let Some(node) = extra {
        children.push(node);
    }

    if children.len() <= max_fanout {
        return None;
    }

    let boxes: Vec<BoundingBox> = children.iter().map(|child| *child.bbox()).collect();
    let split = quadratic_split(&boxes);
    let mut left = Vec::with_capacity(split.left.len());
    let mut right = Vec::with_capacity(split.right.len());
    for (child, side) in children.drain(..).zip(split.sides()) {
        match side {
            Side::Left => left.push(child),
            Side::Right => right.push(child),
        }
    }
    *children = left;
    *bbox = split.left_box;
    Some(IndexNode::Internal {
        children: right,
        bbox: split.right_box,
    })
}

fn search_node<'a, K, Q: IndexQuery + ?Sized>(
    node: &'a IndexNode<K>,
    query: &Q,
    hits: &mut Vec<Candidate<'a, K>>,
) {
    match node {
        IndexNode::Leaf { key, bbox } => {
            let consistency = query.containing(bbox);
            if consistency.matches {
                hits.push(Candidate {
                    key,
                    recheck: consistency.recheck,
                });
            }
        }
        IndexNode::Internal { children, bbox } => {
            if query.intersecting(bbox) {
                for child in children {
                    search_node(child, query, hits);
                }
            }
        }
    }
}

fn remove_from<K: PartialEq>(
    children: &mut Vec<IndexNode<K>>,
    bbox: &mut BoundingBox,
    key: &K,
) -> bool {
    let mut removed = false;
    for i in 0..children.len() {
        let found = match &mut children[i] {
            IndexNode::Leaf { key: k, .. } => *k == *key,
            IndexNode::Internal {
                children: grandchildren,
                bbox: child_box,
            } => {
                if remove_from(grandchildren, child_box, key) {
                    removed = true;
                    grandchildren.is_empty()
                } else {
                    false
                }
            }
        };
        if found {
            children.remove(i);
            removed = true;
        }
        if removed {
            break;
        }
    }
    if removed {
        if let Some(union) = BoundingBox::union(children.iter().map(IndexNode::bbox)) {
            *bbox = union;
        }
    }
    removed
}

/// Drops an empty root and shortens the tree while the root has a single internal child.
fn collapse<K>(mut root: IndexNode<K>) -> Option<IndexNode<K>> {
    loop {
        match root {
            IndexNode::Internal { mut children, bbox } => {
                if children.is_empty() {
                    return None;
                }
                if children.len() == 1 && !children[0].is_leaf() {
                    root = children.remove(0);
                    debug!(height = root.height(), "Shrank index root");
                    continue;
                }
                return Some(IndexNode::Internal { children, bbox });
            }
            leaf => return Some(leaf),
        }
    }
}
