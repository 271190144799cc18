// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::codec::{decode_values, encode_request, Value};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

fn pair() -> (TcpStream, Connection) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    (client, Connection::new(server, 0).unwrap())
}

fn read_response(client: &mut TcpStream) -> Vec<Value> {
    let mut len_buf = [0u8; 4];
    client.read_exact(&mut len_buf).unwrap();
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    client.read_exact(&mut payload).unwrap();
    decode_values(&payload).unwrap()
}

#[test]
fn single_request_response_round_trip() {
    let (mut client, mut conn) = pair();
    let mut ks = Keyspace::new();
    let config = EngineConfig::default();

    client.write_all(&encode_request(&["SET", "k", "v"])).unwrap();
    drive(&mut conn, &mut ks, &config, 0);

    assert_eq!(conn.state, ConnState::Reading);
    assert_eq!(read_response(&mut client), vec![Value::Nil]);
}

#[test]
fn partial_frame_is_not_consumed_until_complete() {
    let (mut client, mut conn) = pair();
    let mut ks = Keyspace::new();
    let config = EngineConfig::default();

    let frame = encode_request(&["GET", "k"]);
    client.write_all(&frame[..frame.len() - 1]).unwrap();
    drive(&mut conn, &mut ks, &config, 0);
    assert_eq!(conn.state, ConnState::Reading);
    assert!(!conn.read_buf.is_empty());

    client.write_all(&frame[frame.len() - 1..]).unwrap();
    drive(&mut conn, &mut ks, &config, 0);
    assert_eq!(read_response(&mut client), vec![Value::Nil]);
}

#[test]
fn pipelined_requests_are_each_answered_in_one_tick() {
    let (mut client, mut conn) = pair();
    let mut ks = Keyspace::new();
    let config = EngineConfig::default();

    let mut buf = encode_request(&["SET", "k", "v"]);
    buf.extend_from_slice(&encode_request(&["GET", "k"]));
    client.write_all(&buf).unwrap();

    drive(&mut conn, &mut ks, &config, 0);
    assert_eq!(read_response(&mut client), vec![Value::Nil]);
    assert_eq!(read_response(&mut client), vec![Value::Str("v".to_string())]);
}

#[test]
fn peer_eof_closes_the_connection() {
    let (client, mut conn) = pair();
    let mut ks = Keyspace::new();
    let config = EngineConfig::default();

    drop(client);
    drive(&mut conn, &mut ks, &config, 0);
    assert_eq!(conn.state, ConnState::Closed);
}

#[test]
fn a_request_buffered_before_half_close_is_still_answered() {
    let (mut client, mut conn) = pair();
    let mut ks = Keyspace::new();
    let config = EngineConfig::default();

    client.write_all(&encode_request(&["SET", "k", "v"])).unwrap();
    client.shutdown(std::net::Shutdown::Write).unwrap();

    drive(&mut conn, &mut ks, &config, 0);

    assert_eq!(read_response(&mut client), vec![Value::Nil]);
    assert_eq!(conn.state, ConnState::Closed);
}

#[test]
fn malformed_frame_closes_the_connection() {
    let (mut client, mut conn) = pair();
    let mut ks = Keyspace::new();
    let config = EngineConfig::default();

    let mut buf = Vec::new();
    buf.extend_from_slice(&100_000u32.to_le_bytes());
    client.write_all(&buf).unwrap();
    drive(&mut conn, &mut ks, &config, 0);
    assert_eq!(conn.state, ConnState::Closed);
}
