// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Thin abstraction over readiness polling (§9's "swap the polling mechanism
//! without touching connection logic"). The reactor loop drives a `Poller`
//! rather than calling `libc::poll` directly, so the connection-handling code
//! never depends on the specific syscall used to learn what's ready.

use crate::error::{EngineError, EngineResult};
use std::os::unix::io::RawFd;

pub const READABLE: i16 = libc::POLLIN;
pub const WRITABLE: i16 = libc::POLLOUT;

/// One fd and the events the reactor wants to know about for it.
#[derive(Debug, Clone, Copy)]
pub struct PollRequest {
    pub fd: RawFd,
    pub events: i16,
}

/// Readiness reported back for one `PollRequest`, at the same index.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollReady {
    revents: i16,
}

impl PollReady {
    pub fn readable(&self) -> bool {
        self.revents & READABLE != 0
    }

    pub fn writable(&self) -> bool {
        self.revents & WRITABLE != 0
    }

    pub fn errored(&self) -> bool {
        self.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0
    }
}

pub trait Poller {
    /// Blocks until at least one of `requests` is ready, `timeout_ms`
    /// elapses (-1 blocks indefinitely), or a signal interrupts the wait.
    /// Returns one [`PollReady`] per request, in the same order.
    fn wait(&mut self, requests: &[PollRequest], timeout_ms: i32) -> EngineResult<Vec<PollReady>>;
}

/// `Poller` backed directly by `poll(2)`.
pub struct LibcPoller;

impl Poller for LibcPoller {
    fn wait(&mut self, requests: &[PollRequest], timeout_ms: i32) -> EngineResult<Vec<PollReady>> {
        let mut raw: Vec<libc::pollfd> = requests
            .iter()
            .map(|r| libc::pollfd { fd: r.fd, events: r.events, revents: 0 })
            .collect();

        let n = unsafe { libc::poll(raw.as_mut_ptr(), raw.len() as libc::nfds_t, timeout_ms) };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(vec![PollReady::default(); requests.len()]);
            }
            return Err(EngineError::PollFailed { reason: err.to_string() });
        }

        Ok(raw.into_iter().map(|p| PollReady { revents: p.revents }).collect())
    }
}
