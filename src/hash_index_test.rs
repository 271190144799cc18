// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::strhash::str_hash;

fn hcode(key: &str) -> u64 {
    str_hash(key.as_bytes())
}

#[test]
fn insert_lookup_pop_round_trip() {
    let mut idx: HashIndex<(String, i32)> = HashIndex::new();
    let h = idx.insert(("a".to_string(), 1), hcode("a"));
    assert_eq!(idx.get(h).1, 1);
    assert_eq!(idx.size(), 1);

    let found = idx.find(hcode("a"), |v| v.0 == "a");
    assert_eq!(found, Some(h));

    let popped = idx.remove(hcode("a"), |v| v.0 == "a");
    assert_eq!(popped, Some(("a".to_string(), 1)));
    assert_eq!(idx.size(), 0);
    assert!(idx.find(hcode("a"), |v| v.0 == "a").is_none());
}

#[test]
fn size_tracks_live_nodes_under_interleaving() {
    let mut idx: HashIndex<String> = HashIndex::new();
    let mut handles = Vec::new();
    for i in 0..500 {
        let key = format!("key-{i}");
        handles.push(idx.insert(key.clone(), hcode(&key)));
    }
    assert_eq!(idx.size(), 500);

    for i in (0..500).step_by(2) {
        let key = format!("key-{i}");
        assert_eq!(idx.remove(hcode(&key), |v| *v == key), Some(key));
    }
    assert_eq!(idx.size(), 250);

    for i in (0..500).step_by(2) {
        let key = format!("key-{i}");
        assert!(idx.find(hcode(&key), |v| *v == key).is_none());
    }
    for i in (1..500).step_by(2) {
        let key = format!("key-{i}");
        assert!(idx.find(hcode(&key), |v| *v == key).is_some());
    }
}

#[test]
fn every_live_node_discoverable_by_key() {
    let mut idx: HashIndex<String> = HashIndex::new();
    let keys: Vec<String> = (0..200).map(|i| format!("k{i}")).collect();
    for k in &keys {
        idx.insert(k.clone(), hcode(k));
    }
    for k in &keys {
        assert!(idx.find(hcode(k), |v| v == k).is_some(), "missing {k}");
    }
}

#[test]
fn rehash_drains_secondary_and_releases_it() {
    let mut idx: HashIndex<String> = HashIndex::new();
    // Initial capacity is 4 buckets; max load factor is 8, so the 33rd insert
    // (size/bucket_count == 8) triggers a grow.
    let keys: Vec<String> = (0..64).map(|i| format!("k{i}")).collect();
    for k in &keys {
        idx.insert(k.clone(), hcode(k));
    }

    // Per spec scenario 7: after at most ceil(size / REHASH_BATCH) further
    // operations, only `primary` should remain non-empty.
    let mut touches = 0;
    while idx.is_rehashing() {
        idx.find(hcode("nonexistent"), |_| false);
        touches += 1;
        assert!(touches <= 64 / REHASH_BATCH + 2, "rehash did not converge");
    }

    for k in &keys {
        assert!(idx.find(hcode(k), |v| v == k).is_some());
    }
}

#[test]
fn with_rehash_batch_bounds_moves_per_touch() {
    let mut idx: HashIndex<String> = HashIndex::with_rehash_batch(1);
    let keys: Vec<String> = (0..64).map(|i| format!("k{i}")).collect();
    for k in &keys {
        idx.insert(k.clone(), hcode(k));
    }
    assert!(idx.is_rehashing());

    let mut touches = 0;
    while idx.is_rehashing() {
        idx.find(hcode("nonexistent"), |_| false);
        touches += 1;
        assert!(touches <= 64 + 2, "rehash did not converge under a batch of 1");
    }
    for k in &keys {
        assert!(idx.find(hcode(k), |v| v == k).is_some());
    }
}

#[test]
fn remove_at_uses_handle_directly() {
    let mut idx: HashIndex<String> = HashIndex::new();
    let h = idx.insert("value".to_string(), hcode("value"));
    assert_eq!(idx.remove_at(h), "value".to_string());
    assert_eq!(idx.size(), 0);
}

#[test]
fn destroy_releases_everything() {
    let mut idx: HashIndex<i32> = HashIndex::new();
    for i in 0..40 {
        idx.insert(i, i as u64);
    }
    idx.destroy();
    assert_eq!(idx.size(), 0);
    assert!(idx.iter().next().is_none());
}
