// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the engine.
//!
//! Provides structured error handling with detailed context for debugging, and the
//! mapping from in-process error conditions to the wire error kinds clients see.

use std::fmt;

/// Standard Result type for all engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Wire-visible error kind (spec §7). Only command-handler failures carry one of
/// these; protocol faults and fatal conditions close the connection or the process
/// instead of reaching the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorKind {
    Unknown = 1,
    TooBig = 2,
    Type = 3,
    Arg = 4,
}

/// Error types for engine operations.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Unrecognized command name or wrong arity.
    UnknownCommand { name: String },

    /// Response would exceed the configured frame limit.
    ResponseTooBig { size: usize, limit: usize },

    /// Command applied to a value of the wrong type.
    WrongType { expected: &'static str, key: String },

    /// Non-numeric argument where a number was required, or a NaN score.
    InvalidArgument { reason: String },

    /// Request frame exceeds the configured frame limit.
    FrameTooLong { len: usize, limit: usize },

    /// Request frame is malformed (bad argc, truncated argument, trailing bytes).
    MalformedRequest { reason: String },

    /// A read/write/accept system call failed for a reason other than
    /// `EAGAIN`/`EINTR`.
    Io { operation: String, reason: String },

    /// `poll()` itself failed; this is fatal to the whole reactor.
    PollFailed { reason: String },

    /// Binding or listening on the configured address failed at startup.
    Bind { addr: String, reason: String },
}

impl EngineError {
    /// Wire kind this error maps to, if it is one command handlers may emit.
    pub fn wire_kind(&self) -> Option<WireErrorKind> {
        match self {
            Self::UnknownCommand { .. } => Some(WireErrorKind::Unknown),
            Self::ResponseTooBig { .. } => Some(WireErrorKind::TooBig),
            Self::WrongType { .. } => Some(WireErrorKind::Type),
            Self::InvalidArgument { .. } => Some(WireErrorKind::Arg),
            Self::FrameTooLong { .. }
            | Self::MalformedRequest { .. }
            | Self::Io { .. }
            | Self::PollFailed { .. }
            | Self::Bind { .. } => None,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand { name } => write!(f, "unknown command: '{}'", name),
            Self::ResponseTooBig { size, limit } => {
                write!(f, "response is too big ({} > {})", size, limit)
            }
            Self::WrongType { expected, key } => {
                write!(f, "expect {} for key '{}'", expected, key)
            }
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {}", reason),
            Self::FrameTooLong { len, limit } => {
                write!(f, "frame too long ({} > {})", len, limit)
            }
            Self::MalformedRequest { reason } => write!(f, "malformed request: {}", reason),
            Self::Io { operation, reason } => {
                write!(f, "I/O error during '{}': {}", operation, reason)
            }
            Self::PollFailed { reason } => write!(f, "poll() failed: {}", reason),
            Self::Bind { addr, reason } => write!(f, "bind '{}' failed: {}", addr, reason),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}
