// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

use super::*;

#[test]
fn add_score_remove_round_trip() {
    let mut zs = SortedSet::new();
    assert!(zs.add("alice", 1.0));
    assert!(!zs.add("alice", 2.0), "re-adding an existing member updates, not inserts");
    assert_eq!(zs.score("alice"), Some(2.0));
    assert_eq!(zs.len(), 1);

    assert_eq!(zs.remove("alice"), Some(2.0));
    assert_eq!(zs.score("alice"), None);
    assert!(zs.is_empty());
}

#[test]
fn query_walks_in_ascending_score_order() {
    let mut zs = SortedSet::new();
    let members = [("a", 5.0), ("b", 1.0), ("c", 3.0), ("d", 2.0), ("e", 4.0)];
    for (name, score) in members {
        zs.add(name, score);
    }
    let all = zs.query(f64::NEG_INFINITY, "", 0, -1);
    let names: Vec<&str> = all.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["b", "d", "c", "e", "a"]);
}

#[test]
fn ties_break_lexicographically_with_shorter_losing() {
    let mut zs = SortedSet::new();
    for name in ["abc", "ab", "abcd", "a"] {
        zs.add(name, 1.0);
    }
    let all = zs.query(f64::NEG_INFINITY, "", 0, -1);
    let names: Vec<&str> = all.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a", "ab", "abc", "abcd"]);
}

#[test]
fn query_offset_and_limit_slice_the_range() {
    let mut zs = SortedSet::new();
    for i in 0..20 {
        zs.add(&format!("m{i:02}"), i as f64);
    }
    let page = zs.query(0.0, "m00", 5, 3);
    let names: Vec<&str> = page.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["m05", "m06", "m07"]);
}

#[test]
fn query_from_nonexistent_anchor_starts_at_next_member() {
    let mut zs = SortedSet::new();
    zs.add("x", 1.0);
    zs.add("y", 3.0);
    zs.add("z", 5.0);
    // anchor (2.0, "") sits strictly between x and y; lower_bound finds y.
    let page = zs.query(2.0, "", 0, -1);
    let names: Vec<&str> = page.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["y", "z"]);
}

#[test]
fn repositioning_a_member_moves_it_in_query_order() {
    let mut zs = SortedSet::new();
    zs.add("low", 1.0);
    zs.add("mid", 2.0);
    zs.add("high", 3.0);
    zs.add("mid", 10.0); // now the highest

    let all = zs.query(f64::NEG_INFINITY, "", 0, -1);
    let names: Vec<&str> = all.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["low", "high", "mid"]);
}

#[test]
fn query_negative_offset_walks_backward_from_anchor() {
    let mut zs = SortedSet::new();
    for i in 0..10 {
        zs.add(&format!("m{i}"), i as f64);
    }
    let page = zs.query(7.0, "m7", -2, 2);
    let names: Vec<&str> = page.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["m5", "m6"]);
}
