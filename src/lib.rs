// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! corekv - single-threaded, event-driven in-memory key-value server core.
//!
//! A `poll()`-based reactor serves string and sorted-set values over a
//! length-prefixed binary protocol, with per-key TTL expiry and idle
//! connection reaping, all inside one process with no background threads.
//!
//! ## Architecture
//!
//! - **arena**: slab allocator handing out stable `u32` handles
//! - **strhash** / **hash_index**: string hashing and an open-chained table
//!   with incremental rehashing
//! - **order_tree**: AVL tree augmented with subtree counts for rank queries
//! - **indexed_heap**: binary min-heap that reports slot moves to its caller
//! - **sorted_set**: `ZADD`/`ZSCORE`/`ZQUERY` built from a hash index plus an
//!   order tree
//! - **keyspace**: the key → value map, with TTL expiry wired through a
//!   shared heap
//! - **codec**: wire framing and tagged response encoding
//! - **command**: the static dispatch table
//! - **reactor**: the `poll()` event loop, connection state machine, and
//!   idle/TTL bookkeeping
//! - **config** / **metrics**: engine tunables and process-wide counters

pub mod arena;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod hash_index;
pub mod indexed_heap;
pub mod keyspace;
pub mod metrics;
pub mod order_tree;
pub mod reactor;
pub mod sorted_set;
mod strhash;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use keyspace::Keyspace;
pub use reactor::Engine;
