// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! AVL tree augmented with subtree node counts, giving O(log n) rank/offset
//! navigation alongside ordered insert/remove.
//!
//! Structurally this follows the original design's `avl.cpp` exactly: rotations,
//! the bottom-up `fix` walk, and `offset`'s up/down rank search are direct
//! translations. The one deliberate departure is `remove`: rather than splicing
//! the in-order successor into the removed node's slot by aliasing whole node
//! structs (`*victim = *node` in the original, relying on pointer identity), this
//! version swaps just the payload between the node and its successor and then
//! unlinks the successor, which by construction has at most one child. That
//! sidesteps the aliasing hazard a handle-based arena would otherwise have no
//! good way to express.

use crate::arena::{Arena, Idx};
use std::cmp::Ordering;

struct Node<T> {
    left: Option<Idx>,
    right: Option<Idx>,
    parent: Option<Idx>,
    height: u32,
    count: u32,
    value: T,
}

/// Order-statistics tree over caller-supplied comparisons.
///
/// `T` is never compared internally; callers pass a comparator closure to
/// [`insert`](Self::insert), mirroring [`crate::hash_index::HashIndex`]'s
/// injected-equality style.
pub struct OrderTree<T> {
    nodes: Arena<Node<T>>,
    root: Option<Idx>,
}

impl<T> OrderTree<T> {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<Idx> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.count(self.root) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn get(&self, idx: Idx) -> &T {
        &self.nodes.get(idx).value
    }

    pub fn get_mut(&mut self, idx: Idx) -> &mut T {
        &mut self.nodes.get_mut(idx).value
    }

    pub fn parent(&self, idx: Idx) -> Option<Idx> {
        self.nodes.get(idx).parent
    }

    pub fn left(&self, idx: Idx) -> Option<Idx> {
        self.nodes.get(idx).left
    }

    pub fn right(&self, idx: Idx) -> Option<Idx> {
        self.nodes.get(idx).right
    }

    /// Subtree size rooted at `idx`, or 0 for `None`.
    pub fn subtree_count(&self, idx: Option<Idx>) -> u32 {
        self.count(idx)
    }

    /// Subtree height rooted at `idx`, or 0 for `None`.
    pub fn subtree_height(&self, idx: Option<Idx>) -> u32 {
        self.height(idx)
    }

    fn height(&self, idx: Option<Idx>) -> u32 {
        idx.map_or(0, |i| self.nodes.get(i).height)
    }

    fn count(&self, idx: Option<Idx>) -> u32 {
        idx.map_or(0, |i| self.nodes.get(i).count)
    }

    fn recompute(&mut self, idx: Idx) {
        let l = self.nodes.get(idx).left;
        let r = self.nodes.get(idx).right;
        let height = 1 + self.height(l).max(self.height(r));
        let count = 1 + self.count(l) + self.count(r);
        let node = self.nodes.get_mut(idx);
        node.height = height;
        node.count = count;
    }

    /// Rotates `node` left, hoisting its right child. Returns the new subtree root.
    fn rot_left(&mut self, node: Idx) -> Idx {
        let new_root = self.nodes.get(node).right.unwrap();
        let moved = self.nodes.get(new_root).left;
        if let Some(m) = moved {
            self.nodes.get_mut(m).parent = Some(node);
        }
        self.nodes.get_mut(node).right = moved;
        self.nodes.get_mut(new_root).left = Some(node);
        let parent = self.nodes.get(node).parent;
        self.nodes.get_mut(new_root).parent = parent;
        self.nodes.get_mut(node).parent = Some(new_root);
        self.recompute(node);
        self.recompute(new_root);
        new_root
    }

    /// Rotates `node` right, hoisting its left child. Returns the new subtree root.
    fn rot_right(&mut self, node: Idx) -> Idx {
        let new_root = self.nodes.get(node).left.unwrap();
        let moved = self.nodes.get(new_root).right;
        if let Some(m) = moved {
            self.nodes.get_mut(m).parent = Some(node);
        }
        self.nodes.get_mut(node).left = moved;
        self.nodes.get_mut(new_root).right = Some(node);
        let parent = self.nodes.get(node).parent;
        self.nodes.get_mut(new_root).parent = parent;
        self.nodes.get_mut(node).parent = Some(new_root);
        self.recompute(node);
        self.recompute(new_root);
        new_root
    }

    /// `root`'s left subtree is two taller than its right. Rebalances and
    /// returns the new subtree root.
    fn fix_left(&mut self, root: Idx) -> Idx {
        let left = self.nodes.get(root).left.unwrap();
        let ll = self.nodes.get(left).left;
        let lr = self.nodes.get(left).right;
        if self.height(ll) < self.height(lr) {
            let new_left = self.rot_left(left);
            self.nodes.get_mut(root).left = Some(new_left);
        }
        self.rot_right(root)
    }

    /// Mirror of [`fix_left`](Self::fix_left) for a right-heavy subtree.
    fn fix_right(&mut self, root: Idx) -> Idx {
        let right = self.nodes.get(root).right.unwrap();
        let rr = self.nodes.get(right).right;
        let rl = self.nodes.get(right).left;
        if self.height(rr) < self.height(rl) {
            let new_right = self.rot_right(right);
            self.nodes.get_mut(root).right = Some(new_right);
        }
        self.rot_left(root)
    }

    /// Walks from `node` up to the tree root, recomputing height/count and
    /// rotating any node whose children differ in height by 2. Returns the new
    /// root of the whole tree and patches `self.root` to match.
    fn fix(&mut self, mut node: Idx) -> Idx {
        loop {
            self.recompute(node);
            let l = self.height(self.nodes.get(node).left);
            let r = self.height(self.nodes.get(node).right);
            let parent = self.nodes.get(node).parent;
            let is_left_child = parent.map(|p| self.nodes.get(p).left == Some(node));

            if l == r + 2 {
                node = self.fix_left(node);
            } else if l + 2 == r {
                node = self.fix_right(node);
            }

            match (parent, is_left_child) {
                (Some(p), Some(true)) => {
                    self.nodes.get_mut(p).left = Some(node);
                    node = p;
                }
                (Some(p), Some(false)) => {
                    self.nodes.get_mut(p).right = Some(node);
                    node = p;
                }
                _ => return node,
            }
        }
    }

    /// Inserts `value`, walking the tree with `cmp(existing)` giving the
    /// ordering of `existing` relative to the value being inserted. Ties route
    /// right, matching the original's `zless` walk. Returns the new node's handle.
    pub fn insert(&mut self, value: T, cmp: impl Fn(&T) -> Ordering) -> Idx {
        let new_idx = self.nodes.insert(Node {
            left: None,
            right: None,
            parent: None,
            height: 1,
            count: 1,
            value,
        });
        match self.root {
            None => self.root = Some(new_idx),
            Some(mut cur) => loop {
                let ord = cmp(&self.nodes.get(cur).value);
                let go_left = ord == Ordering::Greater;
                let next = if go_left {
                    self.nodes.get(cur).left
                } else {
                    self.nodes.get(cur).right
                };
                match next {
                    Some(n) => cur = n,
                    None => {
                        self.nodes.get_mut(new_idx).parent = Some(cur);
                        if go_left {
                            self.nodes.get_mut(cur).left = Some(new_idx);
                        } else {
                            self.nodes.get_mut(cur).right = Some(new_idx);
                        }
                        self.root = Some(self.fix(new_idx));
                        break;
                    }
                }
            },
        }
        new_idx
    }

    /// Unlinks `node`, which must have at most one child, splicing that child
    /// into `node`'s former slot and re-fixing from its former parent upward.
    fn unlink_single_child(&mut self, node: Idx, child: Option<Idx>) -> Option<Idx> {
        let parent = self.nodes.get(node).parent;
        if let Some(c) = child {
            self.nodes.get_mut(c).parent = parent;
        }
        match parent {
            Some(p) => {
                if self.nodes.get(p).left == Some(node) {
                    self.nodes.get_mut(p).left = child;
                } else {
                    self.nodes.get_mut(p).right = child;
                }
                Some(self.fix(p))
            }
            None => child,
        }
    }

    /// Removes the node at `idx`, returning its payload.
    pub fn remove(&mut self, idx: Idx) -> T {
        let target = match self.nodes.get(idx).right {
            Some(mut succ) => {
                while let Some(l) = self.nodes.get(succ).left {
                    succ = l;
                }
                let (node_slot, succ_slot) = self.nodes.get2_mut(idx, succ);
                std::mem::swap(&mut node_slot.value, &mut succ_slot.value);
                succ
            }
            None => idx,
        };
        let left = self.nodes.get(target).left;
        let right = self.nodes.get(target).right;
        debug_assert!(
            left.is_none() || right.is_none(),
            "removal target must have at most one child"
        );
        let child = left.or(right);
        self.root = self.unlink_single_child(target, child);
        self.nodes.remove(target).value
    }

    /// Finds the node `k` positions away from `node` in in-order rank: `k == 0`
    /// returns `node` itself, negative `k` walks toward smaller values.
    /// Returns `None` if `k` runs off either end of the tree.
    pub fn offset(&self, node: Idx, k: i64) -> Option<Idx> {
        let mut pos: i64 = 0;
        let mut cur = node;
        while pos != k {
            let left_count = self.count(self.nodes.get(cur).left) as i64;
            let right_count = self.count(self.nodes.get(cur).right) as i64;
            if pos < k && pos + right_count >= k {
                cur = self.nodes.get(cur).right?;
                pos += self.count(self.nodes.get(cur).left) as i64 + 1;
            } else if pos > k && pos - left_count <= k {
                cur = self.nodes.get(cur).left?;
                pos -= self.count(self.nodes.get(cur).right) as i64 + 1;
            } else {
                let parent = self.nodes.get(cur).parent?;
                if self.nodes.get(parent).right == Some(cur) {
                    pos -= self.count(self.nodes.get(cur).left) as i64 + 1;
                } else {
                    pos += self.count(self.nodes.get(cur).right) as i64 + 1;
                }
                cur = parent;
            }
        }
        Some(cur)
    }

    /// In-order traversal of every live handle, for diagnostics and tests.
    pub fn in_order(&self) -> Vec<Idx> {
        let mut out = Vec::with_capacity(self.len());
        self.in_order_from(self.root, &mut out);
        out
    }

    fn in_order_from(&self, node: Option<Idx>, out: &mut Vec<Idx>) {
        let Some(idx) = node else { return };
        self.in_order_from(self.nodes.get(idx).left, out);
        out.push(idx);
        self.in_order_from(self.nodes.get(idx).right, out);
    }
}

impl<T> Default for OrderTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod order_tree_test;
