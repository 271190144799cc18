// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The single-threaded event loop (§4.8, §5): one [`Engine`] value owns the
//! listener, every connection, and the keyspace. Nothing here is global
//! except the metrics collector (§9's documented exception).

pub mod connection;
pub mod poller;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::keyspace::Keyspace;
use crate::metrics::MetricsCollector;
use connection::{drive, ConnState, Connection};
use poller::{PollReady, PollRequest, Poller, READABLE};
use std::net::TcpListener;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Instant;

/// Owns every piece of mutable state the reactor touches. The connection
/// table is indexed directly by fd (§9's "array indexed by fd, grow on
/// need"), and the idle FIFO is threaded through each `Connection`'s
/// `idle_prev`/`idle_next` fields rather than a separate list allocation.
pub struct Engine {
    listener: TcpListener,
    conns: Vec<Option<Connection>>,
    idle_head: Option<RawFd>,
    idle_tail: Option<RawFd>,
    keyspace: Keyspace,
    config: EngineConfig,
    clock_start: Instant,
}

impl Engine {
    pub fn bind(config: EngineConfig) -> EngineResult<Self> {
        let listener = TcpListener::bind(&config.bind_addr).map_err(|e| EngineError::Bind {
            addr: config.bind_addr.clone(),
            reason: e.to_string(),
        })?;
        listener.set_nonblocking(true).map_err(|e| EngineError::Bind {
            addr: config.bind_addr.clone(),
            reason: e.to_string(),
        })?;
        let keyspace = Keyspace::with_rehash_batch(config.rehash_batch);
        Ok(Self {
            listener,
            conns: Vec::new(),
            idle_head: None,
            idle_tail: None,
            keyspace,
            config,
            clock_start: Instant::now(),
        })
    }

    fn now_ms(&self) -> i64 {
        self.clock_start.elapsed().as_millis() as i64
    }

    fn slot_mut(&mut self, fd: RawFd) -> &mut Option<Connection> {
        let idx = fd as usize;
        if idx >= self.conns.len() {
            self.conns.resize_with(idx + 1, || None);
        }
        &mut self.conns[idx]
    }

    fn unlink_idle(&mut self, fd: RawFd) {
        let (prev, next) = match &self.conns[fd as usize] {
            Some(c) => (c.idle_prev, c.idle_next),
            None => return,
        };
        match prev {
            Some(p) => self.conns[p as usize].as_mut().unwrap().idle_next = next,
            None => self.idle_head = next,
        }
        match next {
            Some(n) => self.conns[n as usize].as_mut().unwrap().idle_prev = prev,
            None => self.idle_tail = prev,
        }
        let conn = self.conns[fd as usize].as_mut().unwrap();
        conn.idle_prev = None;
        conn.idle_next = None;
    }

    fn push_idle_tail(&mut self, fd: RawFd) {
        let old_tail = self.idle_tail;
        {
            let conn = self.conns[fd as usize].as_mut().unwrap();
            conn.idle_prev = old_tail;
            conn.idle_next = None;
        }
        match old_tail {
            Some(t) => self.conns[t as usize].as_mut().unwrap().idle_next = Some(fd),
            None => self.idle_head = Some(fd),
        }
        self.idle_tail = Some(fd);
    }

    /// Marks `fd` as just-active: moves it to the tail of the idle FIFO and
    /// bumps its last-activity timestamp.
    fn touch(&mut self, fd: RawFd, now_ms: i64) {
        self.unlink_idle(fd);
        self.conns[fd as usize].as_mut().unwrap().last_activity_ms = now_ms;
        self.push_idle_tail(fd);
    }

    fn close_connection(&mut self, fd: RawFd) {
        self.unlink_idle(fd);
        self.conns[fd as usize] = None;
        MetricsCollector::global().record_connection_closed();
    }

    fn accept_ready(&mut self, now_ms: i64) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let conn = match Connection::new(stream, now_ms) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "failed to prepare accepted connection");
                            continue;
                        }
                    };
                    let fd = conn.fd();
                    *self.slot_mut(fd) = Some(conn);
                    self.push_idle_tail(fd);
                    MetricsCollector::global().record_connection_accepted();
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::warn!(error = %e, "accept() failed");
                    return;
                }
            }
        }
    }

    /// Bound on how long `poll()` may block: the sooner of the next idle
    /// timeout and the next TTL expiration, or indefinite if neither is
    /// scheduled. Unlike the original (§9 redesign flags), this is an actual
    /// `min()` rather than a `==` typo that silently dropped one branch.
    fn next_timeout_ms(&self, now_ms: i64) -> i32 {
        let idle_deadline = self.idle_head.and_then(|fd| {
            self.conns[fd as usize]
                .as_ref()
                .map(|c| c.last_activity_ms + self.config.idle_timeout_ms)
        });
        let ttl_deadline = self.keyspace.next_expiry_ms();

        let deadline = match (idle_deadline, ttl_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        match deadline {
            None => -1,
            Some(d) => (d - now_ms).max(0).min(i32::MAX as i64) as i32,
        }
    }

    fn reap_idle(&mut self, now_ms: i64) {
        while let Some(fd) = self.idle_head {
            let last_activity = self.conns[fd as usize].as_ref().unwrap().last_activity_ms;
            if now_ms - last_activity < self.config.idle_timeout_ms {
                break;
            }
            self.close_connection(fd);
        }
    }

    /// Runs one iteration: a single `poll()` wait, followed by connection
    /// I/O, TTL expiry, and idle reaping. Exposed separately from [`run`]
    /// so tests can drive the loop deterministically.
    pub fn run_once(&mut self, poller: &mut impl Poller) -> EngineResult<()> {
        let now_ms = self.now_ms();
        let timeout_ms = self.next_timeout_ms(now_ms);

        let mut requests = vec![PollRequest { fd: self.listener.as_raw_fd(), events: READABLE }];
        let mut fds = Vec::new();
        for slot in &self.conns {
            if let Some(conn) = slot {
                if conn.state != ConnState::Closed {
                    requests.push(PollRequest { fd: conn.fd(), events: conn.poll_events() });
                    fds.push(conn.fd());
                }
            }
        }

        let ready = poller.wait(&requests, timeout_ms)?;
        let now_ms = self.now_ms();

        // Per-tick ordering mirrors the original: readiness, then timers, then accept.
        for (fd, r) in fds.iter().zip(ready[1..].iter()) {
            self.service_connection(*fd, r, now_ms);
        }

        let expired = self.keyspace.expire_ready(now_ms, self.config.max_expirations_per_tick);
        if expired > 0 {
            MetricsCollector::global().record_keys_expired(expired as u64);
        }
        self.reap_idle(now_ms);

        if ready[0].readable() {
            self.accept_ready(now_ms);
        }
        Ok(())
    }

    fn service_connection(&mut self, fd: RawFd, ready: &PollReady, now_ms: i64) {
        if self.conns[fd as usize].is_none() {
            return;
        }
        if ready.errored() {
            self.close_connection(fd);
            return;
        }
        if !ready.readable() && !ready.writable() {
            return;
        }

        self.touch(fd, now_ms);
        let conn = self.conns[fd as usize].as_mut().unwrap();
        drive(conn, &mut self.keyspace, &self.config, now_ms);

        if self.conns[fd as usize].as_ref().unwrap().state == ConnState::Closed {
            self.close_connection(fd);
        }
    }

    /// Runs forever, one `poll()` wait per iteration, until a fatal error.
    pub fn run(&mut self, poller: &mut impl Poller) -> EngineResult<()> {
        loop {
            self.run_once(poller)?;
        }
    }
}

#[cfg(test)]
mod engine_test;
