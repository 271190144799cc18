// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Key → Entry map, wiring per-entry TTLs into a shared expiration heap.
//!
//! Entries live in a [`HashIndex`] keyed by their string key. A single
//! [`IndexedHeap`] tracks every entry with a TTL, ordered by absolute
//! expiration time; each `Entry` remembers its own heap slot so it can be
//! canceled or rescheduled in O(log n), and the heap's `on_move` callback
//! keeps that slot current as other entries shift around it.

use crate::arena::Idx;
use crate::error::{EngineError, EngineResult};
use crate::hash_index::HashIndex;
use crate::indexed_heap::IndexedHeap;
use crate::sorted_set::SortedSet;
use crate::strhash::str_hash;

enum EntryValue {
    Str(String),
    ZSet(SortedSet),
}

struct Entry {
    key: String,
    value: EntryValue,
    heap_slot: Option<usize>,
}

pub struct Keyspace {
    entries: HashIndex<Entry>,
    ttl_heap: IndexedHeap<Idx>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self {
            entries: HashIndex::new(),
            ttl_heap: IndexedHeap::new(),
        }
    }

    /// Like [`new`](Self::new), but bounds the key index's incremental rehash
    /// to `rehash_batch` node moves per touch instead of the default.
    /// Mirrors [`crate::config::EngineConfig::rehash_batch`].
    pub fn with_rehash_batch(rehash_batch: usize) -> Self {
        Self {
            entries: HashIndex::with_rehash_batch(rehash_batch),
            ttl_heap: IndexedHeap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.size()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&mut self, key: &str) -> Option<Idx> {
        let hcode = str_hash(key.as_bytes());
        self.entries.find(hcode, |e| e.key == key)
    }

    /// Closure that keeps `Entry::heap_slot` current as the TTL heap moves
    /// payloads around during sift. A free function (not a method) so its
    /// borrow of `entries` is disjoint from whichever `self.ttl_heap` call
    /// it's passed into.
    fn on_move(entries: &mut HashIndex<Entry>) -> impl FnMut(&Idx, usize) + '_ {
        move |handle, pos| {
            entries.get_mut(*handle).heap_slot = Some(pos);
        }
    }

    fn detach_ttl(&mut self, handle: Idx) {
        if let Some(slot) = self.entries.get(handle).heap_slot {
            self.ttl_heap.remove(slot, &mut Self::on_move(&mut self.entries));
        }
    }

    /// All keys currently present, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn get(&mut self, key: &str) -> EngineResult<Option<String>> {
        match self.find(key) {
            None => Ok(None),
            Some(handle) => match &self.entries.get(handle).value {
                EntryValue::Str(s) => Ok(Some(s.clone())),
                EntryValue::ZSet(_) => Err(EngineError::WrongType {
                    expected: "string",
                    key: key.to_string(),
                }),
            },
        }
    }

    /// Overwrites or inserts `key`, replacing whatever was there (including
    /// its type and any TTL) with a fresh string entry.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(handle) = self.find(key) {
            self.detach_ttl(handle);
            self.entries.remove_at(handle);
        }
        let hcode = str_hash(key.as_bytes());
        self.entries.insert(
            Entry {
                key: key.to_string(),
                value: EntryValue::Str(value.to_string()),
                heap_slot: None,
            },
            hcode,
        );
    }

    pub fn del(&mut self, key: &str) -> bool {
        match self.find(key) {
            Some(handle) => {
                self.detach_ttl(handle);
                self.entries.remove_at(handle);
                true
            }
            None => false,
        }
    }

    pub fn zadd(&mut self, key: &str, score: f64, member: &str) -> EngineResult<bool> {
        let handle = match self.find(key) {
            Some(h) => h,
            None => {
                let hcode = str_hash(key.as_bytes());
                self.entries.insert(
                    Entry {
                        key: key.to_string(),
                        value: EntryValue::ZSet(SortedSet::new()),
                        heap_slot: None,
                    },
                    hcode,
                )
            }
        };
        match &mut self.entries.get_mut(handle).value {
            EntryValue::ZSet(zs) => Ok(zs.add(member, score)),
            EntryValue::Str(_) => Err(EngineError::WrongType {
                expected: "zset",
                key: key.to_string(),
            }),
        }
    }

    pub fn zrem(&mut self, key: &str, member: &str) -> EngineResult<bool> {
        let Some(handle) = self.find(key) else {
            return Ok(false);
        };
        match &mut self.entries.get_mut(handle).value {
            EntryValue::ZSet(zs) => Ok(zs.remove(member).is_some()),
            EntryValue::Str(_) => Err(EngineError::WrongType {
                expected: "zset",
                key: key.to_string(),
            }),
        }
    }

    pub fn zscore(&mut self, key: &str, member: &str) -> EngineResult<Option<f64>> {
        let Some(handle) = self.find(key) else {
            return Ok(None);
        };
        match &mut self.entries.get_mut(handle).value {
            EntryValue::ZSet(zs) => Ok(zs.score(member)),
            EntryValue::Str(_) => Err(EngineError::WrongType {
                expected: "zset",
                key: key.to_string(),
            }),
        }
    }

    pub fn zquery(
        &mut self,
        key: &str,
        score: f64,
        member: &str,
        offset: i64,
        limit: i64,
    ) -> EngineResult<Vec<(String, f64)>> {
        let Some(handle) = self.find(key) else {
            return Ok(Vec::new());
        };
        match &self.entries.get(handle).value {
            EntryValue::ZSet(zs) => {
                if limit <= 0 {
                    return Ok(Vec::new());
                }
                Ok(zs.query(score, member, offset, limit))
            }
            EntryValue::Str(_) => Err(EngineError::WrongType {
                expected: "zset",
                key: key.to_string(),
            }),
        }
    }

    /// Sets or clears `key`'s TTL. `ms < 0` clears it; otherwise the entry
    /// expires at `now_ms + ms`. Returns `false` if `key` doesn't exist.
    pub fn set_ttl(&mut self, key: &str, ms: i64, now_ms: i64) -> bool {
        let Some(handle) = self.find(key) else {
            return false;
        };
        if ms < 0 {
            if let Some(slot) = self.entries.get(handle).heap_slot {
                self.ttl_heap.remove(slot, &mut Self::on_move(&mut self.entries));
                self.entries.get_mut(handle).heap_slot = None;
            }
            return true;
        }
        let expire_at = (now_ms + ms).max(0) as u64;
        match self.entries.get(handle).heap_slot {
            Some(slot) => {
                self.ttl_heap
                    .set_key(slot, expire_at, &mut Self::on_move(&mut self.entries));
            }
            None => {
                let slot = self
                    .ttl_heap
                    .push(expire_at, handle, &mut Self::on_move(&mut self.entries));
                self.entries.get_mut(handle).heap_slot = Some(slot);
            }
        }
        true
    }

    /// Absolute expiration time of the entry expiring soonest, if any is
    /// scheduled. Used by the reactor to size its next `poll()` timeout.
    pub fn next_expiry_ms(&self) -> Option<i64> {
        self.ttl_heap.peek().map(|(priority, _)| priority as i64)
    }

    /// Pops every entry whose TTL has passed `now_ms`, up to `max` of them.
    /// Returns the number expired. Bounding `max` keeps one tick of the
    /// reactor from stalling under a burst of simultaneous expirations.
    pub fn expire_ready(&mut self, now_ms: i64, max: usize) -> usize {
        let mut expired = 0;
        while expired < max {
            if !matches!(self.ttl_heap.peek(), Some((priority, _)) if priority as i64 <= now_ms) {
                break;
            }
            let handle = self.ttl_heap.remove(0, &mut Self::on_move(&mut self.entries));
            self.entries.remove_at(handle);
            expired += 1;
        }
        expired
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod keyspace_test;
