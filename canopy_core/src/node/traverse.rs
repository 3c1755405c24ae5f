// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use core::slice;

use super::id::NodeId;
use super::store::NodeStore;

/// An iterator over the direct children of a node, in paint order.
///
/// Created by [`NodeStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a NodeStore,
    inner: slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, children: &'a [u32]) -> Self {
        Self {
            store,
            inner: children.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.inner.next().map(|&idx| self.store.id_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<NodeId> {
        self.inner.next_back().map(|&idx| self.store.id_at(idx))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Preorder walk of a subtree by raw slot index.
pub(crate) fn preorder(store: &NodeStore, root: u32) -> Vec<u32> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        out.push(idx);
        stack.extend(store.children[idx as usize].iter().rev());
    }
    out
}
