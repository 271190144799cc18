// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Static command dispatch table.
//!
//! Keys and members travel the wire as raw bytes (§4.6) but are stored and
//! compared as UTF-8 `String`s here: a deliberate scope reduction from the
//! original's fully binary-safe byte strings, noted in DESIGN.md. Invalid
//! UTF-8 is lossily converted rather than rejected.

use crate::codec::ResponseWriter;
use crate::error::{EngineError, WireErrorKind};
use crate::keyspace::Keyspace;

type Handler = fn(&mut Keyspace, &[Vec<u8>], i64, &mut ResponseWriter);

struct Command {
    name: &'static str,
    arity: usize,
    handler: Handler,
}

/// `{name, arity, handler}` table (§9): the case-insensitive compare is an
/// engineering convenience, not a protocol requirement.
static COMMANDS: &[Command] = &[
    Command { name: "KEYS", arity: 1, handler: cmd_keys },
    Command { name: "GET", arity: 2, handler: cmd_get },
    Command { name: "SET", arity: 3, handler: cmd_set },
    Command { name: "DEL", arity: 2, handler: cmd_del },
    Command { name: "ZADD", arity: 4, handler: cmd_zadd },
    Command { name: "ZREM", arity: 3, handler: cmd_zrem },
    Command { name: "ZSCORE", arity: 3, handler: cmd_zscore },
    Command { name: "ZQUERY", arity: 6, handler: cmd_zquery },
    Command { name: "TTL", arity: 3, handler: cmd_ttl },
];

/// Parses and executes one request, writing its response into `w`.
/// `now_ms` is the reactor's current monotonic time, needed only by `TTL`.
pub fn dispatch(keyspace: &mut Keyspace, argv: &[Vec<u8>], now_ms: i64, w: &mut ResponseWriter) {
    let Some(first) = argv.first() else {
        w.write_err(WireErrorKind::Unknown, "empty command");
        return;
    };
    let name = String::from_utf8_lossy(first).to_ascii_uppercase();
    match COMMANDS.iter().find(|c| c.name == name) {
        Some(cmd) if cmd.arity == argv.len() => (cmd.handler)(keyspace, argv, now_ms, w),
        Some(_) => w.write_err(
            WireErrorKind::Unknown,
            &format!("wrong number of arguments for '{name}'"),
        ),
        None => w.write_err(WireErrorKind::Unknown, &format!("unknown command '{name}'")),
    }
}

fn arg_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_f64(bytes: &[u8]) -> Result<f64, ()> {
    std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok()).ok_or(())
}

fn parse_finite_f64(bytes: &[u8]) -> Result<f64, ()> {
    match parse_f64(bytes) {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(()),
    }
}

fn parse_i64(bytes: &[u8]) -> Result<i64, ()> {
    std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok()).ok_or(())
}

fn write_engine_error(w: &mut ResponseWriter, err: &EngineError) {
    let kind = err.wire_kind().unwrap_or(WireErrorKind::Unknown);
    w.write_err(kind, &err.to_string());
}

fn cmd_keys(ks: &mut Keyspace, _argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let keys = ks.keys();
    let cursor = w.begin_arr();
    for k in &keys {
        w.write_str(k);
    }
    w.end_arr(cursor, keys.len() as u32);
}

fn cmd_get(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    match ks.get(&key) {
        Ok(Some(v)) => w.write_str(&v),
        Ok(None) => w.write_nil(),
        Err(e) => write_engine_error(w, &e),
    }
}

fn cmd_set(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    let value = arg_str(&argv[2]);
    ks.set(&key, &value);
    w.write_nil();
}

fn cmd_del(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    w.write_int(if ks.del(&key) { 1 } else { 0 });
}

fn cmd_zadd(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    let score = match parse_finite_f64(&argv[2]) {
        Ok(v) => v,
        Err(()) => {
            w.write_err(WireErrorKind::Arg, "score must be a finite number");
            return;
        }
    };
    let member = arg_str(&argv[3]);
    match ks.zadd(&key, score, &member) {
        Ok(added) => w.write_int(if added { 1 } else { 0 }),
        Err(e) => write_engine_error(w, &e),
    }
}

fn cmd_zrem(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    let member = arg_str(&argv[2]);
    match ks.zrem(&key, &member) {
        Ok(removed) => w.write_int(if removed { 1 } else { 0 }),
        Err(e) => write_engine_error(w, &e),
    }
}

fn cmd_zscore(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    let member = arg_str(&argv[2]);
    match ks.zscore(&key, &member) {
        Ok(Some(score)) => w.write_dbl(score),
        Ok(None) => w.write_nil(),
        Err(e) => write_engine_error(w, &e),
    }
}

fn cmd_zquery(ks: &mut Keyspace, argv: &[Vec<u8>], _now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    let score = match parse_f64(&argv[2]) {
        Ok(v) => v,
        Err(()) => {
            w.write_err(WireErrorKind::Arg, "score must be a number");
            return;
        }
    };
    let member = arg_str(&argv[3]);
    let offset = match parse_i64(&argv[4]) {
        Ok(v) => v,
        Err(()) => {
            w.write_err(WireErrorKind::Arg, "offset must be an integer");
            return;
        }
    };
    let limit = match parse_i64(&argv[5]) {
        Ok(v) => v,
        Err(()) => {
            w.write_err(WireErrorKind::Arg, "limit must be an integer");
            return;
        }
    };
    match ks.zquery(&key, score, &member, offset, limit) {
        Ok(pairs) => {
            let cursor = w.begin_arr();
            for (name, score) in &pairs {
                w.write_str(name);
                w.write_dbl(*score);
            }
            w.end_arr(cursor, (pairs.len() * 2) as u32);
        }
        Err(e) => write_engine_error(w, &e),
    }
}

fn cmd_ttl(ks: &mut Keyspace, argv: &[Vec<u8>], now_ms: i64, w: &mut ResponseWriter) {
    let key = arg_str(&argv[1]);
    let ms = match parse_i64(&argv[2]) {
        Ok(v) => v,
        Err(()) => {
            w.write_err(WireErrorKind::Arg, "ttl must be an integer number of milliseconds");
            return;
        }
    };
    w.write_int(if ks.set_ttl(&key, ms, now_ms) { 1 } else { 0 });
}

#[cfg(test)]
mod command_test;
