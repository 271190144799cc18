// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Sorted set: a by-name hash index paired with a by-(score, name) order
//! tree, so membership tests and score lookups are O(1) while range queries
//! walk the tree in rank order.
//!
//! Ties on score break lexicographically on name. Rust's slice/`str` `Ord`
//! already implements memcmp-with-shorter-loses, so plain `str::cmp` gives
//! the same tie-break the original's byte-for-byte comparison does.

use crate::arena::Idx;
use crate::hash_index::HashIndex;
use crate::order_tree::OrderTree;
use crate::strhash::str_hash;
use std::cmp::Ordering;

struct MemberSlot {
    name: String,
    score: f64,
    order_idx: Idx,
}

fn member_order(existing_score: f64, existing_name: &str, score: f64, name: &str) -> Ordering {
    existing_score
        .partial_cmp(&score)
        .expect("sorted-set scores must not be NaN")
        .then_with(|| existing_name.cmp(name))
}

pub struct SortedSet {
    by_name: HashIndex<MemberSlot>,
    by_score: OrderTree<Idx>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self {
            by_name: HashIndex::new(),
            by_score: OrderTree::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.size()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Inserts or repositions `name` at `score`. Returns `true` if `name` was
    /// not previously a member.
    pub fn add(&mut self, name: &str, score: f64) -> bool {
        let hcode = str_hash(name.as_bytes());
        if let Some(existing) = self.by_name.find(hcode, |m| m.name == name) {
            let old_order_idx = self.by_name.get(existing).order_idx;
            self.by_score.remove(old_order_idx);
            let new_order_idx = self.by_score.insert(existing, |other: &Idx| {
                let m = self.by_name.get(*other);
                member_order(m.score, &m.name, score, name)
            });
            let slot = self.by_name.get_mut(existing);
            slot.score = score;
            slot.order_idx = new_order_idx;
            false
        } else {
            let handle = self.by_name.insert(
                MemberSlot {
                    name: name.to_string(),
                    score,
                    order_idx: 0,
                },
                hcode,
            );
            let order_idx = self.by_score.insert(handle, |other: &Idx| {
                let m = self.by_name.get(*other);
                member_order(m.score, &m.name, score, name)
            });
            self.by_name.get_mut(handle).order_idx = order_idx;
            true
        }
    }

    /// Removes `name`, returning its score if it was a member.
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        let hcode = str_hash(name.as_bytes());
        let existing = self.by_name.find(hcode, |m| m.name == name)?;
        let order_idx = self.by_name.get(existing).order_idx;
        self.by_score.remove(order_idx);
        let slot = self.by_name.remove_at(existing);
        Some(slot.score)
    }

    pub fn score(&mut self, name: &str) -> Option<f64> {
        let hcode = str_hash(name.as_bytes());
        let existing = self.by_name.find(hcode, |m| m.name == name)?;
        Some(self.by_name.get(existing).score)
    }

    /// Smallest tree node whose (score, name) is >= (`score`, `name`).
    fn lower_bound(&self, score: f64, name: &str) -> Option<Idx> {
        let mut cur = self.by_score.root();
        let mut found = None;
        while let Some(idx) = cur {
            let member_idx = *self.by_score.get(idx);
            let m = self.by_name.get(member_idx);
            if member_order(m.score, &m.name, score, name) == Ordering::Less {
                cur = self.by_score.right(idx);
            } else {
                found = Some(idx);
                cur = self.by_score.left(idx);
            }
        }
        found
    }

    /// Returns up to `limit` members starting `offset` positions past the
    /// first member whose (score, name) is >= (`score`, `name`). A negative
    /// `offset` walks backward from that point; a negative `limit` collects
    /// every remaining member instead of capping the count.
    pub fn query(&self, score: f64, name: &str, offset: i64, limit: i64) -> Vec<(String, f64)> {
        let mut cur = self.lower_bound(score, name).and_then(|idx| self.by_score.offset(idx, offset));
        let mut out = Vec::new();
        let mut remaining = limit;
        while let Some(idx) = cur {
            if limit >= 0 && remaining <= 0 {
                break;
            }
            let member_idx = *self.by_score.get(idx);
            let m = self.by_name.get(member_idx);
            out.push((m.name.clone(), m.score));
            remaining -= 1;
            cur = self.by_score.offset(idx, 1);
        }
        out
    }
}

impl Default for SortedSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod sorted_set_test;
