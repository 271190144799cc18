// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Engine-wide tunables.
//!
//! The frame size limit is deliberately a runtime value rather than a
//! compile-time protocol constant (§9's open question on the shared 4096
//! limit): requests and responses share it for engineering convenience, not
//! because the wire format demands one fixed number.

/// Tunables for a single [`crate::reactor::Engine`] run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address the listener binds, e.g. `"0.0.0.0:1235"`.
    pub bind_addr: String,
    /// Maximum declared length of a request payload, and the response budget
    /// a single reply may occupy before it's replaced with a `TooBig` error.
    pub max_frame_bytes: usize,
    /// Maximum `argc` a request frame may declare.
    pub max_args: usize,
    /// A connection idle this long (no readiness event) is closed.
    pub idle_timeout_ms: i64,
    /// Upper bound on hash-table node migrations per keyspace touch while a
    /// grow is draining. Defaults to [`crate::hash_index::REHASH_BATCH`] and
    /// is threaded into the keyspace's [`crate::hash_index::HashIndex`] via
    /// [`crate::keyspace::Keyspace::with_rehash_batch`].
    pub rehash_batch: usize,
    /// Upper bound on TTL expirations processed in a single reactor tick.
    pub max_expirations_per_tick: usize,
}

impl EngineConfig {
    pub const DEFAULT_PORT: u16 = 1235;

    /// Returns a copy of `self` bound to `port` on all interfaces instead of
    /// the default port, for the CLI's `--port` flag.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr = format!("0.0.0.0:{port}");
        self
    }

    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: i64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", Self::DEFAULT_PORT),
            max_frame_bytes: 4096,
            max_args: 1024,
            idle_timeout_ms: 5_000,
            rehash_batch: crate::hash_index::REHASH_BATCH,
            max_expirations_per_tick: 2_000,
        }
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn defaults_match_the_documented_wire_protocol() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:1235");
        assert_eq!(cfg.max_frame_bytes, 4096);
        assert_eq!(cfg.max_args, 1024);
        assert_eq!(cfg.idle_timeout_ms, 5_000);
        assert_eq!(cfg.max_expirations_per_tick, 2_000);
    }

    #[test]
    fn with_port_overrides_only_the_bind_address() {
        let cfg = EngineConfig::default().with_port(7000);
        assert_eq!(cfg.bind_addr, "0.0.0.0:7000");
        assert_eq!(cfg.idle_timeout_ms, 5_000);
    }
}
