// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Per-connection state machine (§4.9).
//!
//! A `Connection` owns its socket and both buffers. Its destructor (via the
//! underlying `TcpStream`'s `Drop`) closes the fd, so there is no separate
//! teardown step beyond removing it from the reactor's tables.

use crate::codec::{decode_request, finish_response, ResponseWriter};
use crate::command::dispatch;
use crate::config::EngineConfig;
use crate::keyspace::Keyspace;
use crate::metrics::MetricsCollector;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::unix::io::{AsRawFd, RawFd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Reading,
    Writing,
    Closed,
}

pub struct Connection {
    pub stream: TcpStream,
    pub state: ConnState,
    pub read_buf: Vec<u8>,
    pub write_buf: Vec<u8>,
    pub sent: usize,
    pub last_activity_ms: i64,
    /// Doubly-linked idle FIFO, threaded through fds rather than a separate
    /// list node (§9's "neighbor-index pairs" redesign of the original's
    /// intrusive `DList`).
    pub idle_prev: Option<RawFd>,
    pub idle_next: Option<RawFd>,
}

impl Connection {
    pub fn new(stream: TcpStream, now_ms: i64) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            state: ConnState::Reading,
            read_buf: Vec::new(),
            write_buf: Vec::new(),
            sent: 0,
            last_activity_ms: now_ms,
            idle_prev: None,
            idle_next: None,
        })
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    /// Events `poll()` should watch for, given the connection's state.
    pub fn poll_events(&self) -> i16 {
        match self.state {
            ConnState::Reading => super::poller::READABLE,
            ConnState::Writing => super::poller::WRITABLE,
            ConnState::Closed => 0,
        }
    }
}

enum FillOutcome {
    /// No more data available right now; some bytes may have been appended.
    WouldBlock,
    /// Peer closed its write side.
    Eof,
}

fn fill_read_buf(conn: &mut Connection) -> io::Result<FillOutcome> {
    let mut chunk = [0u8; 4096];
    loop {
        match conn.stream.read(&mut chunk) {
            Ok(0) => return Ok(FillOutcome::Eof),
            Ok(n) => conn.read_buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(FillOutcome::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

enum FlushOutcome {
    Complete,
    WouldBlock,
}

fn flush_write_buf(conn: &mut Connection) -> io::Result<FlushOutcome> {
    loop {
        if conn.sent >= conn.write_buf.len() {
            return Ok(FlushOutcome::Complete);
        }
        match conn.stream.write(&conn.write_buf[conn.sent..]) {
            Ok(0) => return Ok(FlushOutcome::Complete),
            Ok(n) => conn.sent += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(FlushOutcome::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Advances `conn` as far as it can go without blocking: drains the socket,
/// answers every complete request currently buffered, and flushes responses,
/// looping between `Reading` and `Writing` without returning to `poll()` as
/// long as progress keeps being made (§4.9).
pub fn drive(conn: &mut Connection, keyspace: &mut Keyspace, config: &EngineConfig, now_ms: i64) {
    loop {
        match conn.state {
            ConnState::Reading => {
                let eof = match fill_read_buf(conn) {
                    Ok(FillOutcome::WouldBlock) => false,
                    Ok(FillOutcome::Eof) => true,
                    Err(_) => {
                        conn.state = ConnState::Closed;
                        return;
                    }
                };

                // Any request fully buffered before EOF is still answered
                // (§4.9): only close once no complete frame is left to parse.
                match decode_request(&conn.read_buf, config.max_frame_bytes, config.max_args) {
                    Ok(Some((argv, consumed))) => {
                        conn.read_buf.drain(0..consumed);
                        let mut w = ResponseWriter::new();
                        dispatch(keyspace, &argv, now_ms, &mut w);
                        MetricsCollector::global().record_request_processed();
                        conn.write_buf = finish_response(w, config.max_frame_bytes);
                        conn.sent = 0;
                        conn.state = ConnState::Writing;
                    }
                    Ok(None) => {
                        if eof {
                            conn.state = ConnState::Closed;
                        }
                        return;
                    }
                    Err(_) => {
                        conn.state = ConnState::Closed;
                        return;
                    }
                }
            }
            ConnState::Writing => match flush_write_buf(conn) {
                Ok(FlushOutcome::Complete) => {
                    conn.write_buf.clear();
                    conn.sent = 0;
                    conn.state = ConnState::Reading;
                }
                Ok(FlushOutcome::WouldBlock) => return,
                Err(_) => {
                    conn.state = ConnState::Closed;
                    return;
                }
            },
            ConnState::Closed => return,
        }
    }
}

#[cfg(test)]
mod connection_test;
