// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide counters, exposed the same way as a single global collector.
//!
//! A single-threaded reactor never needs locking around these, but the
//! collector is still reached through a `global()` singleton so call sites
//! look the same as the rest of the counter-bumping code scattered through
//! command dispatch and the reactor loop. Unlike a durable metrics backend
//! this holds counts only for the life of the process — there is nothing to
//! persist (§1 non-goals exclude durability).

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

static COLLECTOR: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// In-memory counters for the life of one process.
pub struct MetricsCollector {
    connections_accepted: AtomicU64,
    connections_closed: AtomicU64,
    requests_processed: AtomicU64,
    commands_errored: AtomicU64,
    keys_expired: AtomicU64,
    rehash_nodes_migrated: AtomicU64,
}

/// Point-in-time read of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub connections_closed: u64,
    pub requests_processed: u64,
    pub commands_errored: u64,
    pub keys_expired: u64,
    pub rehash_nodes_migrated: u64,
}

impl MetricsCollector {
    fn new() -> Self {
        Self {
            connections_accepted: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            requests_processed: AtomicU64::new(0),
            commands_errored: AtomicU64::new(0),
            keys_expired: AtomicU64::new(0),
            rehash_nodes_migrated: AtomicU64::new(0),
        }
    }

    pub fn global() -> &'static MetricsCollector {
        &COLLECTOR
    }

    pub fn record_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_processed(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_errored(&self) {
        self.commands_errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_keys_expired(&self, count: u64) {
        self.keys_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_rehash_nodes_migrated(&self, count: u64) {
        self.rehash_nodes_migrated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            commands_errored: self.commands_errored.load(Ordering::Relaxed),
            keys_expired: self.keys_expired.load(Ordering::Relaxed),
            rehash_nodes_migrated: self.rehash_nodes_migrated.load(Ordering::Relaxed),
        }
    }

    /// Emits the current snapshot as a structured log line.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        tracing::info!(
            connections_accepted = s.connections_accepted,
            connections_closed = s.connections_closed,
            requests_processed = s.requests_processed,
            commands_errored = s.commands_errored,
            keys_expired = s.keys_expired,
            rehash_nodes_migrated = s.rehash_nodes_migrated,
            "metrics summary"
        );
    }
}

#[cfg(test)]
mod metrics_test {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counts() {
        let collector = MetricsCollector::new();
        collector.record_connection_accepted();
        collector.record_connection_accepted();
        collector.record_keys_expired(5);
        collector.record_command_errored();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.connections_accepted, 2);
        assert_eq!(snapshot.keys_expired, 5);
        assert_eq!(snapshot.commands_errored, 1);
        assert_eq!(snapshot.connections_closed, 0);
    }

    #[test]
    fn global_returns_the_same_instance() {
        let a = MetricsCollector::global() as *const _;
        let b = MetricsCollector::global() as *const _;
        assert_eq!(a, b);
    }
}
