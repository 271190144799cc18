// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::codec::{decode_values, encode_request, Value};
use poller::LibcPoller;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread::sleep;
use std::time::Duration;

fn read_response(client: &mut TcpStream) -> Vec<Value> {
    let mut len_buf = [0u8; 4];
    client.read_exact(&mut len_buf).unwrap();
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    client.read_exact(&mut payload).unwrap();
    decode_values(&payload).unwrap()
}

#[test]
fn accepting_a_connection_tracks_it_in_the_idle_fifo() {
    let mut engine = Engine::bind(EngineConfig::default().with_port(0)).unwrap();
    let addr = engine.listener.local_addr().unwrap();
    let _client = TcpStream::connect(addr).unwrap();

    let mut poller = LibcPoller;
    engine.run_once(&mut poller).unwrap();

    assert!(engine.idle_head.is_some());
    let fd = engine.idle_head.unwrap();
    assert!(engine.conns[fd as usize].is_some());
}

#[test]
fn a_request_is_answered_within_a_couple_of_ticks() {
    let mut engine = Engine::bind(EngineConfig::default().with_port(0)).unwrap();
    let addr = engine.listener.local_addr().unwrap();
    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    client.write_all(&encode_request(&["SET", "k", "v"])).unwrap();

    let mut poller = LibcPoller;
    engine.run_once(&mut poller).unwrap(); // accept
    engine.run_once(&mut poller).unwrap(); // service

    assert_eq!(read_response(&mut client), vec![Value::Nil]);
}

#[test]
fn an_idle_connection_is_closed_after_its_timeout() {
    let config = EngineConfig::default().with_port(0).with_idle_timeout_ms(20);
    let mut engine = Engine::bind(config).unwrap();
    let addr = engine.listener.local_addr().unwrap();
    let _client = TcpStream::connect(addr).unwrap();

    let mut poller = LibcPoller;
    engine.run_once(&mut poller).unwrap(); // accept
    let fd = engine.idle_head.unwrap();
    assert!(engine.conns[fd as usize].is_some());

    sleep(Duration::from_millis(60));
    engine.run_once(&mut poller).unwrap(); // should reap the idle connection

    assert!(engine.conns[fd as usize].is_none());
    assert!(engine.idle_head.is_none());
}
