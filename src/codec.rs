// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Request framing and tagged response serialization.
//!
//! Both directions share a 4-byte little-endian length prefix. A request's
//! payload is a 4-byte argc followed by that many `{4-byte len, bytes}`
//! arguments. A response's payload is a sequence of tagged values — see
//! [`WireErrorKind`]'s sibling tags below. The frame size limit is carried as
//! a configured value (see [`crate::config::EngineConfig`]), not a compile-time
//! protocol constant, since requests and responses share the same limit for
//! engineering convenience rather than because the wire format requires it.

use crate::error::{EngineError, EngineResult};
use crate::error::WireErrorKind;

const TAG_NIL: u8 = 0;
const TAG_ERR: u8 = 1;
const TAG_STR: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_DBL: u8 = 4;
const TAG_ARR: u8 = 5;

/// Attempts to pull one complete request out of the front of `buf`.
///
/// Returns `Ok(None)` if `buf` doesn't yet hold a full frame. Returns
/// `Err(FrameTooLong)` if the declared length exceeds `max_frame_bytes` —
/// callers must close the connection on this, per §7. Any other malformed
/// frame (bad argc, truncated argument, trailing bytes) also closes the
/// connection rather than producing a wire-level `Err` response.
pub fn decode_request(
    buf: &[u8],
    max_frame_bytes: usize,
    max_args: usize,
) -> EngineResult<Option<(Vec<Vec<u8>>, usize)>> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
    if len > max_frame_bytes {
        return Err(EngineError::FrameTooLong {
            len,
            limit: max_frame_bytes,
        });
    }
    if buf.len() < 4 + len {
        return Ok(None);
    }
    let payload = &buf[4..4 + len];

    if payload.len() < 4 {
        return Err(malformed("missing argc"));
    }
    let argc = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
    if argc > max_args {
        return Err(malformed(&format!("argc {argc} exceeds limit {max_args}")));
    }

    let mut pos = 4;
    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        if payload.len() < pos + 4 {
            return Err(malformed("truncated argument length"));
        }
        let alen = u32::from_le_bytes(payload[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if payload.len() < pos + alen {
            return Err(malformed("truncated argument bytes"));
        }
        args.push(payload[pos..pos + alen].to_vec());
        pos += alen;
    }
    if pos != payload.len() {
        return Err(malformed("trailing bytes in request frame"));
    }
    Ok(Some((args, 4 + len)))
}

fn malformed(reason: &str) -> EngineError {
    EngineError::MalformedRequest {
        reason: reason.to_string(),
    }
}

/// Encodes a full request frame (length prefix included). Used by tests and
/// by anything that speaks the protocol as a client.
pub fn encode_request<A: AsRef<[u8]>>(args: &[A]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(args.len() as u32).to_le_bytes());
    for a in args {
        let a = a.as_ref();
        payload.extend_from_slice(&(a.len() as u32).to_le_bytes());
        payload.extend_from_slice(a);
    }
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(&payload);
    framed
}

/// Appends tagged values directly to a response buffer.
///
/// Command handlers write straight into one of these rather than building an
/// intermediate tree, mirroring how dispatch surfaces an `Err` tag and
/// returns normally instead of propagating a `Result` to the wire (§7).
pub struct ResponseWriter {
    buf: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_nil(&mut self) {
        self.buf.push(TAG_NIL);
    }

    pub fn write_err(&mut self, kind: WireErrorKind, msg: &str) {
        self.buf.push(TAG_ERR);
        self.buf.extend_from_slice(&(kind as u32).to_le_bytes());
        self.buf.extend_from_slice(&(msg.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(msg.as_bytes());
    }

    pub fn write_str(&mut self, s: &str) {
        self.buf.push(TAG_STR);
        self.buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn write_int(&mut self, v: i64) {
        self.buf.push(TAG_INT);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_dbl(&mut self, v: f64) {
        self.buf.push(TAG_DBL);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Emits the `Arr` tag with a placeholder count and returns a cursor for
    /// [`end_arr`](Self::end_arr) to patch once the element count is known —
    /// the deferred-count pattern from §4.6, for callers that stream elements
    /// rather than building a `Vec` upfront.
    pub fn begin_arr(&mut self) -> usize {
        self.buf.push(TAG_ARR);
        let cursor = self.buf.len();
        self.buf.extend_from_slice(&0u32.to_le_bytes());
        cursor
    }

    pub fn end_arr(&mut self, cursor: usize, count: u32) {
        self.buf[cursor..cursor + 4].copy_from_slice(&count.to_le_bytes());
    }

    pub fn write_arr(&mut self, values: &[Value]) {
        let cursor = self.begin_arr();
        for v in values {
            v.encode_into(self);
        }
        self.end_arr(cursor, values.len() as u32);
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Finishes a response: frames `writer`'s body with its 4-byte length prefix,
/// substituting a single `Err(TooBig, ...)` body if the response would not
/// fit within `max_frame_bytes` (§4.6).
pub fn finish_response(writer: ResponseWriter, max_frame_bytes: usize) -> Vec<u8> {
    let mut body = writer.into_bytes();
    if body.len() > max_frame_bytes.saturating_sub(4) {
        let mut fallback = ResponseWriter::new();
        fallback.write_err(WireErrorKind::TooBig, "response is too big");
        body = fallback.into_bytes();
    }
    let mut framed = Vec::with_capacity(4 + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
    framed.extend_from_slice(&body);
    framed
}

/// Owned tree form of a tagged value sequence, used by tests (and anything
/// else decoding a response) rather than by the hot command-dispatch path.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Err(WireErrorKind, String),
    Str(String),
    Int(i64),
    Dbl(f64),
    Arr(Vec<Value>),
}

impl Value {
    fn encode_into(&self, w: &mut ResponseWriter) {
        match self {
            Value::Nil => w.write_nil(),
            Value::Err(kind, msg) => w.write_err(*kind, msg),
            Value::Str(s) => w.write_str(s),
            Value::Int(v) => w.write_int(*v),
            Value::Dbl(v) => w.write_dbl(*v),
            Value::Arr(items) => {
                let cursor = w.begin_arr();
                for item in items {
                    item.encode_into(w);
                }
                w.end_arr(cursor, items.len() as u32);
            }
        }
    }
}

pub fn encode_values(values: &[Value]) -> Vec<u8> {
    let mut w = ResponseWriter::new();
    for v in values {
        v.encode_into(&mut w);
    }
    w.into_bytes()
}

pub fn decode_values(bytes: &[u8]) -> EngineResult<Vec<Value>> {
    let mut pos = 0;
    let mut out = Vec::new();
    while pos < bytes.len() {
        let (value, consumed) = decode_one(&bytes[pos..])?;
        out.push(value);
        pos += consumed;
    }
    Ok(out)
}

fn decode_one(bytes: &[u8]) -> EngineResult<(Value, usize)> {
    if bytes.is_empty() {
        return Err(malformed("empty tagged value"));
    }
    let tag = bytes[0];
    let rest = &bytes[1..];
    match tag {
        TAG_NIL => Ok((Value::Nil, 1)),
        TAG_ERR => {
            if rest.len() < 8 {
                return Err(malformed("truncated err header"));
            }
            let code = u32::from_le_bytes(rest[0..4].try_into().unwrap());
            let len = u32::from_le_bytes(rest[4..8].try_into().unwrap()) as usize;
            if rest.len() < 8 + len {
                return Err(malformed("truncated err message"));
            }
            let msg = String::from_utf8_lossy(&rest[8..8 + len]).into_owned();
            let kind = match code {
                1 => WireErrorKind::Unknown,
                2 => WireErrorKind::TooBig,
                3 => WireErrorKind::Type,
                4 => WireErrorKind::Arg,
                _ => return Err(malformed("unknown error code")),
            };
            Ok((Value::Err(kind, msg), 1 + 8 + len))
        }
        TAG_STR => {
            if rest.len() < 4 {
                return Err(malformed("truncated str header"));
            }
            let len = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
            if rest.len() < 4 + len {
                return Err(malformed("truncated str bytes"));
            }
            let s = String::from_utf8_lossy(&rest[4..4 + len]).into_owned();
            Ok((Value::Str(s), 1 + 4 + len))
        }
        TAG_INT => {
            if rest.len() < 8 {
                return Err(malformed("truncated int"));
            }
            let v = i64::from_le_bytes(rest[0..8].try_into().unwrap());
            Ok((Value::Int(v), 1 + 8))
        }
        TAG_DBL => {
            if rest.len() < 8 {
                return Err(malformed("truncated dbl"));
            }
            let v = f64::from_le_bytes(rest[0..8].try_into().unwrap());
            Ok((Value::Dbl(v), 1 + 8))
        }
        TAG_ARR => {
            if rest.len() < 4 {
                return Err(malformed("truncated arr header"));
            }
            let count = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
            let mut pos = 4;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (item, consumed) = decode_one(&rest[pos..])?;
                items.push(item);
                pos += consumed;
            }
            Ok((Value::Arr(items), 1 + pos))
        }
        _ => Err(malformed("unknown tag")),
    }
}

#[cfg(test)]
mod codec_test;
